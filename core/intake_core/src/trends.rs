//! Multi-day patterns over a participant's history.
//!
//! Input slices are a single participant's records sorted ascending by date (what
//! [`select_range`] and the stores return). The analysis looks at a trailing window of at most
//! `window_days` records: it counts days crossing the intake, late-intake and short-sleep
//! thresholds, compares mean outcomes across intake-level bins, and optionally reports raw
//! Pearson coefficients between intake and outcomes.

use serde::Serialize;
use time::Date;

use crate::config::{EngineConfig, Thresholds};
use crate::metrics::{intake_level_with, round2, IntakeLevel};
use crate::model::DailyRecord;

/// Records whose date is inside `start..=end` (either bound optional), sorted by date.
pub fn select_range(records: &[DailyRecord], start: Option<Date>, end: Option<Date>) -> Vec<DailyRecord> {
    let mut out: Vec<DailyRecord> = records
        .iter()
        .filter(|r| start.map_or(true, |s| r.date >= s) && end.map_or(true, |e| r.date <= e))
        .cloned()
        .collect();
    out.sort_by_key(|r| r.date);
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    InsufficientData,
    HighIntakeDays,
    LateIntakeDays,
    ShortSleepDays,
    BinComparison,
    NoReliableTrend,
    Correlation,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub message: String,
}

impl Pattern {
    fn new(kind: PatternKind, message: String) -> Self {
        Self { kind, message }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BinStats {
    pub level: IntakeLevel,
    pub label: String,
    pub n: usize,
    pub mean_sleep_quality: Option<f64>,
    pub mean_sleep_hours: Option<f64>,
    pub mean_anxiety: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Correlations {
    pub intake_sleep_hours: Option<f64>,
    pub intake_sleep_quality: Option<f64>,
    pub intake_anxiety: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub window_len: usize,
    pub high_intake_days: usize,
    pub late_intake_days: usize,
    pub short_sleep_days: usize,
    pub bins: Vec<BinStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlations: Option<Correlations>,
    pub patterns: Vec<Pattern>,
}

impl TrendAnalysis {
    pub fn messages(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.message.clone()).collect()
    }
}

pub fn analyze(records: &[DailyRecord], cfg: &EngineConfig) -> TrendAnalysis {
    let t = &cfg.thresholds;
    let w = &cfg.trend;
    let window = trailing(records, w.window_days);

    if window.len() < w.min_records {
        return TrendAnalysis {
            window_len: window.len(),
            high_intake_days: 0,
            late_intake_days: 0,
            short_sleep_days: 0,
            bins: Vec::new(),
            correlations: None,
            patterns: vec![Pattern::new(
                PatternKind::InsufficientData,
                format!(
                    "Not enough data yet: at least {} days are needed to look for multi-day patterns.",
                    w.min_records
                ),
            )],
        };
    }

    let high_intake_days = window.iter().filter(|r| r.total() > t.high_total).count();
    let late_intake_days = window.iter().filter(|r| r.last_intake_hour >= t.late_hour).count();
    let short_sleep_days = window.iter().filter(|r| r.sleep_hours < t.short_sleep_hours).count();

    let mut patterns = Vec::new();
    if high_intake_days >= w.pattern_min_days {
        patterns.push(Pattern::new(
            PatternKind::HighIntakeDays,
            format!(
                "Trend (last {} days): {} days above {} mg. Simple goal: stay at or below {} mg most days.",
                window.len(),
                high_intake_days,
                t.high_total,
                t.high_total
            ),
        ));
    }
    if late_intake_days >= w.pattern_min_days {
        patterns.push(Pattern::new(
            PatternKind::LateIntakeDays,
            format!(
                "Trend: {} days with the last intake at or after {}h. Moving the last dose earlier is often the most effective change for sleep.",
                late_intake_days, t.late_hour
            ),
        ));
    }
    if short_sleep_days >= w.pattern_min_days {
        patterns.push(Pattern::new(
            PatternKind::ShortSleepDays,
            format!(
                "Trend: {} days with less than {}h of sleep. Short sleep feeds the craving for more intake; stabilise your bedtime first.",
                short_sleep_days, t.short_sleep_hours
            ),
        ));
    }

    let bins = bin_by_level(window, t);
    if window.len() >= w.bin_min_records {
        if let Some(p) = compare_bins(&bins) {
            patterns.push(p);
        }
    }

    // Defined coefficients count as insights, so they also suppress the fallback.
    let correlations = cfg.correlations.then(|| correlate(window));
    if let Some(c) = &correlations {
        for (name, coef) in [
            ("sleep quality", c.intake_sleep_quality),
            ("sleep duration", c.intake_sleep_hours),
            ("anxiety", c.intake_anxiety),
        ] {
            if let Some(coef) = coef {
                patterns.push(Pattern::new(
                    PatternKind::Correlation,
                    format!("Correlation (approx.) intake vs {name}: {coef:.2}."),
                ));
            }
        }
    }

    if patterns.is_empty() {
        patterns.push(Pattern::new(
            PatternKind::NoReliableTrend,
            "Not enough days (or too many missing values) to identify a reliable trend.".to_string(),
        ));
    }

    TrendAnalysis {
        window_len: window.len(),
        high_intake_days,
        late_intake_days,
        short_sleep_days,
        bins,
        correlations,
        patterns,
    }
}

fn trailing(records: &[DailyRecord], n: usize) -> &[DailyRecord] {
    &records[records.len().saturating_sub(n)..]
}

/// One entry per level in Low, Medium, High order; empty bins have no means.
pub fn bin_by_level(records: &[DailyRecord], t: &Thresholds) -> Vec<BinStats> {
    IntakeLevel::ALL
        .iter()
        .map(|&level| {
            let members: Vec<&DailyRecord> = records
                .iter()
                .filter(|r| intake_level_with(r.total(), t) == level)
                .collect();
            BinStats {
                level,
                label: level.bin_label(t),
                n: members.len(),
                mean_sleep_quality: mean(members.iter().map(|r| f64::from(r.sleep_quality))),
                mean_sleep_hours: mean(members.iter().map(|r| r.sleep_hours)),
                mean_anxiety: mean(members.iter().map(|r| f64::from(r.anxiety))),
            }
        })
        .collect()
}

/// Best and worst mean sleep quality across bins with a defined mean. Ties resolve to the
/// lower intake level.
fn compare_bins(bins: &[BinStats]) -> Option<Pattern> {
    let defined: Vec<(&BinStats, f64)> = bins
        .iter()
        .filter_map(|b| b.mean_sleep_quality.map(|m| (b, m)))
        .collect();
    if defined.len() < 2 {
        return None;
    }
    let mut best = defined[0];
    let mut worst = defined[0];
    for &(b, m) in &defined[1..] {
        if m > best.1 {
            best = (b, m);
        }
        if m < worst.1 {
            worst = (b, m);
        }
    }
    Some(Pattern::new(
        PatternKind::BinComparison,
        format!(
            "Comparison on your data: best sleep quality in {} (about {:.2}/5, n={}), lowest in {} (about {:.2}/5, n={}).",
            best.0.label, best.1, best.0.n, worst.0.label, worst.1, worst.0.n
        ),
    ))
}

fn correlate(records: &[DailyRecord]) -> Correlations {
    let intake: Vec<f64> = records.iter().map(|r| r.total()).collect();
    let sleep_hours: Vec<f64> = records.iter().map(|r| r.sleep_hours).collect();
    let sleep_quality: Vec<f64> = records.iter().map(|r| f64::from(r.sleep_quality)).collect();
    let anxiety: Vec<f64> = records.iter().map(|r| f64::from(r.anxiety)).collect();
    Correlations {
        intake_sleep_hours: pearson(&intake, &sleep_hours),
        intake_sleep_quality: pearson(&intake, &sleep_quality),
        intake_anxiety: pearson(&intake, &anxiety),
    }
}

/// Sample Pearson coefficient. `None` with fewer than two pairs or a constant series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mx = xs[..n].iter().sum::<f64>() / n as f64;
    let my = ys[..n].iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        let dy = ys[i] - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

const ALERT_LOOKBACK: usize = 3;
const ALERT_MIN_DAYS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    InsufficientData,
    Clear,
    Warning,
    Alert,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShortTermAlert {
    pub level: AlertLevel,
    pub message: String,
}

/// Cumulative warning signs over the last three records.
pub fn short_term_alert(records: &[DailyRecord], t: &Thresholds) -> ShortTermAlert {
    let last = trailing(records, ALERT_LOOKBACK);
    if last.len() < ALERT_LOOKBACK {
        return ShortTermAlert {
            level: AlertLevel::InsufficientData,
            message: format!("Add at least {ALERT_LOOKBACK} days of data for the multi-day alert."),
        };
    }
    let short_sleep = last.iter().filter(|r| r.sleep_hours < t.short_sleep_hours).count();
    let high_intake = last.iter().filter(|r| r.total() > t.high_total).count();
    let anxious = last.iter().filter(|r| r.anxiety >= t.amplify_score).count();

    let (level, message) = if short_sleep >= ALERT_MIN_DAYS && high_intake >= ALERT_MIN_DAYS {
        (
            AlertLevel::Alert,
            "Alert: high intake with short sleep over the last 3 days. Risk of fatigue and lower performance.",
        )
    } else if short_sleep >= ALERT_MIN_DAYS && anxious >= ALERT_MIN_DAYS {
        (
            AlertLevel::Warning,
            "Warning: short sleep with high anxiety over several days. Reduce intake and prioritise recovery.",
        )
    } else {
        (
            AlertLevel::Clear,
            "No strong alert over the last 3 days against the current thresholds.",
        )
    };
    ShortTermAlert {
        level,
        message: message.to_string(),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LevelCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// Headline figures for a period.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub entries: usize,
    pub mean_total_mg: Option<f64>,
    pub mean_sleep_hours: Option<f64>,
    pub mean_anxiety: Option<f64>,
    pub levels: LevelCounts,
}

pub fn period_summary(records: &[DailyRecord], t: &Thresholds) -> PeriodSummary {
    let mut levels = LevelCounts::default();
    for r in records {
        match intake_level_with(r.total(), t) {
            IntakeLevel::Low => levels.low += 1,
            IntakeLevel::Medium => levels.medium += 1,
            IntakeLevel::High => levels.high += 1,
        }
    }
    PeriodSummary {
        entries: records.len(),
        mean_total_mg: mean(records.iter().map(|r| r.total())).map(round2),
        mean_sleep_hours: mean(records.iter().map(|r| r.sleep_hours)).map(round2),
        mean_anxiety: mean(records.iter().map(|r| f64::from(r.anxiety))).map(round2),
        levels,
    }
}
