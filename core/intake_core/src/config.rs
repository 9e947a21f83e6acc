use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

/// Every threshold the engine compares against. App variants differ only in these values and
/// in their catalog.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Totals below this are Low.
    pub level_low_below: f64,
    /// Totals above this are High; the Medium band is inclusive on both ends.
    pub level_high_above: f64,
    pub late_hour: u8,
    pub late_min_total: f64,
    pub short_sleep_hours: f64,
    pub high_total: f64,
    pub alert_band_min: f64,
    pub alert_band_max: f64,
    pub amplify_score: u8,
    pub amplify_min_total: f64,
    pub high_sensitivity_ceiling: f64,
    pub low_sensitivity_ceiling: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            level_low_below: 100.0,
            level_high_above: 200.0,
            late_hour: 17,
            late_min_total: 100.0,
            short_sleep_hours: 7.0,
            high_total: 200.0,
            alert_band_min: 80.0,
            alert_band_max: 150.0,
            amplify_score: 7,
            amplify_min_total: 150.0,
            high_sensitivity_ceiling: 150.0,
            low_sensitivity_ceiling: 300.0,
        }
    }
}

/// Trailing-window sizes for multi-day pattern detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendWindow {
    pub window_days: usize,
    pub min_records: usize,
    pub pattern_min_days: usize,
    pub bin_min_records: usize,
}

impl Default for TrendWindow {
    fn default() -> Self {
        Self {
            window_days: 7,
            min_records: 3,
            pattern_min_days: 3,
            bin_min_records: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub catalog: Catalog,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub trend: TrendWindow,
    /// Adds intake/outcome correlation coefficients to the pattern section.
    #[serde(default)]
    pub correlations: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog: Catalog::standard(),
            thresholds: Thresholds::default(),
            trend: TrendWindow::default(),
            correlations: false,
        }
    }
}

pub const PRESETS: [&str; 3] = ["standard", "compact", "insights"];

impl EngineConfig {
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "standard" => Some(Self::default()),
            "compact" => Some(Self {
                catalog: Catalog::compact(),
                thresholds: Thresholds {
                    late_hour: 16,
                    ..Thresholds::default()
                },
                ..Self::default()
            }),
            "insights" => Some(Self {
                correlations: true,
                ..Self::default()
            }),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        let t = &self.thresholds;
        let w = &self.trend;
        if self.catalog.is_empty() {
            return Err("empty_catalog");
        }
        if !(t.level_low_below.is_finite() && t.level_high_above.is_finite())
            || t.level_low_below < 0.0
            || t.level_low_below > t.level_high_above
        {
            return Err("invalid_level_bounds");
        }
        if t.alert_band_min > t.alert_band_max {
            return Err("invalid_band");
        }
        if t.late_hour > 23 {
            return Err("invalid_late_hour");
        }
        if !(t.short_sleep_hours > 0.0 && t.short_sleep_hours <= 24.0) {
            return Err("invalid_sleep_hours");
        }
        if w.window_days == 0 || w.window_days > 7 {
            return Err("invalid_window_days");
        }
        if w.min_records == 0 || w.min_records > w.window_days {
            return Err("invalid_min_records");
        }
        if w.pattern_min_days == 0 || w.pattern_min_days > w.window_days {
            return Err("invalid_pattern_min_days");
        }
        if w.bin_min_records == 0 {
            return Err("invalid_bin_min_records");
        }
        Ok(())
    }
}
