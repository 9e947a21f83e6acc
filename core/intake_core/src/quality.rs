use serde::Serialize;

use crate::model::DailyRecord;

/// Daily totals above this are implausible enough to warrant a manual check.
pub const DEFAULT_OUTLIER_MG: u32 = 800;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Outlier {
    pub key: String,
    pub total_mg: u32,
    pub intake_detail: String,
}

/// Records whose total exceeds `threshold_mg`, in input order.
pub fn outliers(records: &[DailyRecord], threshold_mg: u32) -> Vec<Outlier> {
    records
        .iter()
        .filter(|r| r.total_mg > threshold_mg)
        .map(|r| Outlier {
            key: r.key(),
            total_mg: r.total_mg,
            intake_detail: r.intake_detail.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests::record;

    #[test]
    fn only_strictly_above_threshold() {
        let records = vec![
            record("2026-02-01", 800, 10, 8.0),
            record("2026-02-02", 801, 10, 8.0),
            record("2026-02-03", 95, 10, 8.0),
        ];
        let found = outliers(&records, DEFAULT_OUTLIER_MG);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "P001@2026-02-02");
        assert_eq!(found[0].total_mg, 801);
    }

    #[test]
    fn custom_threshold() {
        let records = vec![record("2026-02-01", 300, 10, 8.0)];
        assert!(outliers(&records, 400).is_empty());
        assert_eq!(outliers(&records, 250).len(), 1);
    }
}
