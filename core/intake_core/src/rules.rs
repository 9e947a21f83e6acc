//! Same-day advice. A flat, additive rule list evaluated against the latest record: every
//! rule whose predicate holds contributes its message, in table order. Rules never suppress
//! one another.

use serde::Serialize;

use crate::config::Thresholds;
use crate::model::{DailyRecord, Sensitivity};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    LateIntake,
    ShortSleep,
    HighDoseHeart,
    Palpitations,
    AlertnessBand,
    Overstimulation,
    AnxietyAmplification,
    StressAmplification,
    Headache,
    Irritability,
    Digestive,
    HighSensitivityCeiling,
    LowSensitivityCeiling,
    NoConcerns,
}

/// Evaluation order. `NoConcerns` is not listed: it is the fallback when nothing matches.
pub const RULE_TABLE: [Rule; 13] = [
    Rule::LateIntake,
    Rule::ShortSleep,
    Rule::HighDoseHeart,
    Rule::Palpitations,
    Rule::AlertnessBand,
    Rule::Overstimulation,
    Rule::AnxietyAmplification,
    Rule::StressAmplification,
    Rule::Headache,
    Rule::Irritability,
    Rule::Digestive,
    Rule::HighSensitivityCeiling,
    Rule::LowSensitivityCeiling,
];

impl Rule {
    pub fn code(self) -> &'static str {
        match self {
            Self::LateIntake => "late_intake",
            Self::ShortSleep => "short_sleep",
            Self::HighDoseHeart => "high_dose_heart",
            Self::Palpitations => "palpitations",
            Self::AlertnessBand => "alertness_band",
            Self::Overstimulation => "overstimulation",
            Self::AnxietyAmplification => "anxiety_amplification",
            Self::StressAmplification => "stress_amplification",
            Self::Headache => "headache",
            Self::Irritability => "irritability",
            Self::Digestive => "digestive",
            Self::HighSensitivityCeiling => "high_sensitivity_ceiling",
            Self::LowSensitivityCeiling => "low_sensitivity_ceiling",
            Self::NoConcerns => "no_concerns",
        }
    }

    /// Sensitivity rules do not match when no sensitivity is known.
    pub fn matches(self, r: &DailyRecord, sensitivity: Option<Sensitivity>, t: &Thresholds) -> bool {
        let total = r.total();
        match self {
            Self::LateIntake => r.last_intake_hour >= t.late_hour && total >= t.late_min_total,
            Self::ShortSleep => r.sleep_hours < t.short_sleep_hours,
            Self::HighDoseHeart | Self::Overstimulation => total > t.high_total,
            Self::Palpitations => r.symptoms.palpitations,
            Self::AlertnessBand => total >= t.alert_band_min && total <= t.alert_band_max,
            Self::AnxietyAmplification => r.anxiety >= t.amplify_score && total >= t.amplify_min_total,
            Self::StressAmplification => r.stress >= t.amplify_score && total >= t.amplify_min_total,
            Self::Headache => r.symptoms.headache,
            Self::Irritability => r.symptoms.irritability,
            Self::Digestive => r.symptoms.digestive,
            Self::HighSensitivityCeiling => {
                sensitivity == Some(Sensitivity::High) && total >= t.high_sensitivity_ceiling
            }
            Self::LowSensitivityCeiling => {
                sensitivity == Some(Sensitivity::Low) && total > t.low_sensitivity_ceiling
            }
            Self::NoConcerns => false,
        }
    }

    pub fn message(self, t: &Thresholds) -> String {
        match self {
            Self::LateIntake => format!(
                "Brain & sleep: your last intake was late (>= {}h). It can delay sleep onset and reduce sleep quality. Try to finish before {}-{}h.",
                t.late_hour,
                t.late_hour.saturating_sub(1),
                t.late_hour
            ),
            Self::ShortSleep => format!(
                "Sleep: you slept less than {}h. Prioritise recovery (bedtime routine, fewer screens, earlier intake). Short sleep raises fatigue and stress and lowers memory and focus.",
                t.short_sleep_hours
            ),
            Self::HighDoseHeart => format!(
                "Heart: high dose today (> {} mg). It can raise heart rate and cause nervousness or palpitations. Cut down gradually (25-50 mg per day) and avoid taking it all at once.",
                t.high_total
            ),
            Self::Palpitations => "Heart: palpitations reported today. Reduce intake, avoid energy drinks and stay hydrated. If it keeps happening or becomes uncomfortable, ask a doctor.".to_string(),
            Self::AlertnessBand => format!(
                "Focus: your dose is in a range often useful for alertness (about {}-{} mg). Small doses spread over the day keep it steady.",
                t.alert_band_min, t.alert_band_max
            ),
            Self::Overstimulation => format!(
                "Focus: above {} mg the effect often reverses (restlessness, trouble concentrating, crash). Lower the dose or swap a drink for decaf or light tea.",
                t.high_total
            ),
            Self::AnxietyAmplification => "Anxiety: high anxiety combined with a moderate or high dose. Reduce intake, especially energy drinks, and try water or herbal tea instead.".to_string(),
            Self::StressAmplification => "Stress: high stress combined with a high dose can amplify tension. Take a short breathing break, hydrate, and skip another late dose.".to_string(),
            Self::Headache => "Headache: sometimes linked to too much intake, dehydration or short sleep. Water, sleep, and a gradual reduction if your intake is high.".to_string(),
            Self::Irritability => "Irritability: tends to rise when the dose is too strong or sleep is short. Adjust the dose and avoid late intake.".to_string(),
            Self::Digestive => "Digestion: coffee can irritate the stomach for some people. Avoid it on an empty stomach and prefer a smaller dose.".to_string(),
            Self::HighSensitivityCeiling => format!(
                "High sensitivity: you may feel effects at lower doses. Try to stay at or below {} mg/day and watch the effect on sleep and anxiety.",
                t.high_sensitivity_ceiling
            ),
            Self::LowSensitivityCeiling => format!(
                "Even with low sensitivity, more than {} mg/day still raises the risk for sleep, anxiety and heart. Aim back towards 200-250 mg at most.",
                t.low_sensitivity_ceiling
            ),
            Self::NoConcerns => "Overall: nothing concerning detected today against the thresholds. Keep intake moderate and your last dose early enough.".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Advice {
    pub rule: Rule,
    pub message: String,
}

/// Runs the rule table against `latest`. Always returns at least one item: the `NoConcerns`
/// fallback when nothing matched.
pub fn evaluate(latest: &DailyRecord, sensitivity: Option<Sensitivity>, t: &Thresholds) -> Vec<Advice> {
    let mut out: Vec<Advice> = RULE_TABLE
        .iter()
        .filter(|rule| rule.matches(latest, sensitivity, t))
        .map(|&rule| Advice {
            rule,
            message: rule.message(t),
        })
        .collect();
    if out.is_empty() {
        out.push(Advice {
            rule: Rule::NoConcerns,
            message: Rule::NoConcerns.message(t),
        });
    }
    out
}
