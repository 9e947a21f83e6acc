use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use time::Time;

use crate::catalog::Catalog;
use crate::config::Thresholds;

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Hours slept between `bed` and `wake`. A wake time at or before the bed time is taken to be
/// on the next day, so `bed == wake` yields a full 24 hours.
pub fn sleep_duration(bed: Time, wake: Time) -> f64 {
    let bed_min = i32::from(bed.hour()) * 60 + i32::from(bed.minute());
    let mut wake_min = i32::from(wake.hour()) * 60 + i32::from(wake.minute());
    if wake_min <= bed_min {
        wake_min += MINUTES_PER_DAY;
    }
    round2(f64::from(wake_min - bed_min) / 60.0)
}

/// Same as [`sleep_duration`] for whole hours of day (0-23).
pub fn sleep_duration_hours(bed_hour: u8, wake_hour: u8) -> f64 {
    let bed = i32::from(bed_hour);
    let mut wake = i32::from(wake_hour);
    if wake <= bed {
        wake += 24;
    }
    round2(f64::from(wake - bed))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntakeTotal {
    pub total_mg: u32,
    /// `"<item> x<count> (<mg> mg)"` per item with a positive count, in catalog order,
    /// joined by `" | "`.
    pub detail: String,
}

/// Sums `count * mg_per_unit` over the catalog. Labels missing from the catalog and
/// non-positive counts contribute nothing.
pub fn total_intake(catalog: &Catalog, quantities: &HashMap<String, u32>) -> IntakeTotal {
    let mut total: u32 = 0;
    let mut parts = Vec::new();
    for item in catalog.iter() {
        let qty = quantities.get(&item.label).copied().unwrap_or(0);
        if qty == 0 {
            continue;
        }
        let mg = qty.saturating_mul(item.mg_per_unit);
        total = total.saturating_add(mg);
        parts.push(format!("{} x{} ({} mg)", item.label, qty, mg));
    }
    IntakeTotal {
        total_mg: total,
        detail: parts.join(" | "),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IntakeLevel {
    Low,
    Medium,
    High,
}

impl IntakeLevel {
    pub const ALL: [IntakeLevel; 3] = [IntakeLevel::Low, IntakeLevel::Medium, IntakeLevel::High];

    /// Bin name with its bounds, e.g. `Medium (100-200 mg)`.
    pub fn bin_label(self, t: &Thresholds) -> String {
        match self {
            Self::Low => format!("Low (<{} mg)", t.level_low_below),
            Self::Medium => format!("Medium ({}-{} mg)", t.level_low_below, t.level_high_above),
            Self::High => format!("High (>{} mg)", t.level_high_above),
        }
    }
}

impl fmt::Display for IntakeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        })
    }
}

/// `< 100` Low, `100..=200` Medium, `> 200` High.
pub fn intake_level(total: f64) -> IntakeLevel {
    intake_level_with(total, &Thresholds::default())
}

pub fn intake_level_with(total: f64, t: &Thresholds) -> IntakeLevel {
    if total < t.level_low_below {
        IntakeLevel::Low
    } else if total <= t.level_high_above {
        IntakeLevel::Medium
    } else {
        IntakeLevel::High
    }
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u8, m: u8) -> Time {
        Time::from_hms(h, m, 0).unwrap()
    }

    #[test]
    fn sleep_duration_wraps_past_midnight() {
        assert_eq!(sleep_duration_hours(23, 7), 8.0);
        assert_eq!(sleep_duration_hours(7, 23), 16.0);
        assert_eq!(sleep_duration(hm(23, 30), hm(7, 0)), 7.5);
        assert_eq!(sleep_duration(hm(0, 15), hm(6, 35)), 6.33);
    }

    #[test]
    fn equal_bed_and_wake_is_a_full_day() {
        assert_eq!(sleep_duration_hours(7, 7), 24.0);
        assert_eq!(sleep_duration(hm(22, 0), hm(22, 0)), 24.0);
    }

    #[test]
    fn intake_level_boundaries() {
        assert_eq!(intake_level(99.9), IntakeLevel::Low);
        assert_eq!(intake_level(100.0), IntakeLevel::Medium);
        assert_eq!(intake_level(200.0), IntakeLevel::Medium);
        assert_eq!(intake_level(200.01), IntakeLevel::High);
        assert_eq!(intake_level(0.0), IntakeLevel::Low);
    }

    #[test]
    fn total_intake_skips_zero_counts_and_keeps_catalog_order() {
        let catalog = Catalog::new([("A", 75), ("B", 95), ("C", 45)]);
        let mut q = HashMap::new();
        q.insert("C".to_string(), 1);
        q.insert("B".to_string(), 0);
        q.insert("A".to_string(), 2);

        let t = total_intake(&catalog, &q);
        assert_eq!(t.total_mg, 2 * 75 + 45);
        assert_eq!(t.detail, "A x2 (150 mg) | C x1 (45 mg)");
        assert!(!t.detail.contains('B'));
    }

    #[test]
    fn total_intake_ignores_unknown_items() {
        let catalog = Catalog::standard();
        let mut q = HashMap::new();
        q.insert("Mate (250 ml)".to_string(), 3);
        let t = total_intake(&catalog, &q);
        assert_eq!(t.total_mg, 0);
        assert_eq!(t.detail, "");
    }

    #[test]
    fn bin_labels_follow_thresholds() {
        let t = Thresholds::default();
        assert_eq!(IntakeLevel::Low.bin_label(&t), "Low (<100 mg)");
        assert_eq!(IntakeLevel::Medium.bin_label(&t), "Medium (100-200 mg)");
        assert_eq!(IntakeLevel::High.bin_label(&t), "High (>200 mg)");
    }
}
