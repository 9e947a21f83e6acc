use serde::Serialize;
use time::Date;

use crate::config::EngineConfig;
use crate::metrics::{intake_level_with, IntakeLevel};
use crate::model::{DailyRecord, Participant, Sensitivity};
use crate::rules::{self, Advice};
use crate::trends::{self, TrendAnalysis};

/// What a presentation layer renders: three ordered message lists.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Report {
    pub summary: Vec<String>,
    pub today: Vec<String>,
    pub patterns: Vec<String>,
}

impl Report {
    pub fn no_data() -> Self {
        Self {
            summary: vec!["No data for this participant.".to_string()],
            today: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Pure aggregation of already computed outputs.
    pub fn assemble(
        latest: &DailyRecord,
        level: IntakeLevel,
        sensitivity: Option<Sensitivity>,
        advice: &[Advice],
        trend: &TrendAnalysis,
    ) -> Self {
        let mut summary = vec![
            format!("Latest date: {}", latest.date),
            format!("Total intake: {} mg (level: {level})", latest.total_mg),
            format!("Last intake: {}h", latest.last_intake_hour),
            format!(
                "Sleep: {:.1} h (quality {}/5)",
                latest.sleep_hours, latest.sleep_quality
            ),
            format!(
                "Anxiety: {}/10 · Stress: {}/10 · Focus: {}/10",
                latest.anxiety, latest.stress, latest.focus
            ),
        ];
        if let Some(s) = sensitivity {
            summary.push(format!("Stated sensitivity: {}", s.as_str()));
        }
        if !latest.intake_detail.trim().is_empty() {
            summary.push(format!("Sources: {}", latest.intake_detail));
        }

        Self {
            summary,
            today: advice.iter().map(|a| a.message.clone()).collect(),
            patterns: trend.messages(),
        }
    }
}

/// Runs the three engine stages for one participant over the records dated inside
/// `start..=end` (either bound optional). Summary, same-day advice and patterns all describe
/// that period; an empty period gives the no-data report.
pub fn build_report(
    participant: Option<&Participant>,
    history: &[DailyRecord],
    start: Option<Date>,
    end: Option<Date>,
    cfg: &EngineConfig,
) -> Report {
    let in_range = trends::select_range(history, start, end);
    let Some(latest) = in_range.last() else {
        return Report::no_data();
    };
    let sensitivity = participant.and_then(|p| p.sensitivity);
    let level = intake_level_with(latest.total(), &cfg.thresholds);
    let advice = rules::evaluate(latest, sensitivity, &cfg.thresholds);
    let trend = trends::analyze(&in_range, cfg);
    Report::assemble(latest, level, sensitivity, &advice, &trend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParticipantId;
    use crate::rules::tests::record;
    use crate::timefmt;

    fn participant(sensitivity: Option<Sensitivity>) -> Participant {
        Participant {
            participant_id: ParticipantId::parse("P001").unwrap(),
            age: 20,
            sex: None,
            sensitivity,
            screen_time_evening: None,
            sport: None,
            created_at: timefmt::parse_ts("2026-02-01T09:00:00Z").unwrap(),
        }
    }

    #[test]
    fn empty_history_reports_no_data() {
        let report = build_report(None, &[], None, None, &EngineConfig::default());
        assert_eq!(report.summary, vec!["No data for this participant.".to_string()]);
        assert!(report.today.is_empty());
        assert!(report.patterns.is_empty());
    }

    #[test]
    fn report_uses_latest_record_and_profile() {
        let mut latest = record("2026-02-03", 250, 18, 6.0);
        latest.intake_detail = "Espresso (30 ml) x2 (150 mg) | Filter coffee (250 ml) x1 (95 mg)".to_string();
        let history = vec![latest, record("2026-02-01", 80, 9, 8.0), record("2026-02-02", 120, 9, 7.5)];
        let p = participant(Some(Sensitivity::High));

        let report = build_report(Some(&p), &history, None, None, &EngineConfig::default());
        assert_eq!(report.summary[0], "Latest date: 2026-02-03");
        assert_eq!(report.summary[1], "Total intake: 250 mg (level: High)");
        assert_eq!(report.summary[3], "Sleep: 6.0 h (quality 3/5)");
        assert!(report.summary.contains(&"Stated sensitivity: high".to_string()));
        assert!(report.summary.last().unwrap().starts_with("Sources: Espresso"));

        assert!(report.today[0].starts_with("Brain & sleep"));
        assert!(report.today.iter().any(|m| m.starts_with("High sensitivity")));
        assert_eq!(
            report.patterns,
            vec!["Not enough days (or too many missing values) to identify a reliable trend.".to_string()]
        );
    }

    #[test]
    fn date_range_applies_to_every_section() {
        let history: Vec<_> = (1..=4)
            .map(|i| record(&format!("2026-02-0{i}"), 260, 10, 8.0))
            .collect();
        let cfg = EngineConfig::default();

        let end = timefmt::parse_day("2026-02-02");
        let report = build_report(None, &history, None, end, &cfg);
        assert_eq!(report.summary[0], "Latest date: 2026-02-02");
        assert!(!report.today.is_empty());
        assert_eq!(report.patterns.len(), 1);
        assert!(report.patterns[0].starts_with("Not enough data yet"));

        let start = timefmt::parse_day("2026-03-01");
        let report = build_report(None, &history, start, None, &cfg);
        assert_eq!(report, Report::no_data());
    }
}
