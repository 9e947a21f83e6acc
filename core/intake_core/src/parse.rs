//! Parse-or-default over raw form values. Nothing here fails: a missing, empty or malformed
//! value resolves to the caller's default.

use serde_json::Value;
use time::Time;

use crate::timefmt;

pub fn float_or(v: Option<&Value>, default: f64) -> f64 {
    let parsed = match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match parsed {
        Some(x) if x.is_finite() => x,
        _ => default,
    }
}

/// Integers go through a float first, so `"7.9"` reads as 7.
pub fn int_or(v: Option<&Value>, default: i64) -> i64 {
    if let Some(Value::Number(n)) = v {
        if let Some(i) = n.as_i64() {
            return i;
        }
    }
    let x = float_or(v, f64::NAN);
    if x.is_nan() {
        return default;
    }
    x.trunc() as i64
}

pub fn flag_or(v: Option<&Value>, default: bool) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" => true,
            "false" | "no" | "off" => false,
            _ => int_or(v, i64::from(default)) != 0,
        },
        _ => int_or(v, i64::from(default)) != 0,
    }
}

/// Accepts `"HH:MM"` text or a bare hour (`23` or `"23"`).
pub fn clock_or(v: Option<&Value>, default: Time) -> Time {
    match v {
        Some(Value::String(s)) => timefmt::parse_clock(s).unwrap_or(default),
        Some(Value::Number(_)) => {
            let h = int_or(v, -1);
            u8::try_from(h)
                .ok()
                .and_then(|h| Time::from_hms(h, 0, 0).ok())
                .unwrap_or(default)
        }
        _ => default,
    }
}

/// `int_or` clamped into `lo..=hi`.
pub fn bounded_or(v: Option<&Value>, default: u8, lo: u8, hi: u8) -> u8 {
    int_or(v, i64::from(default)).clamp(i64::from(lo), i64::from(hi)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn float_or_handles_every_shape() {
        assert_eq!(float_or(Some(&json!(6.5)), 0.0), 6.5);
        assert_eq!(float_or(Some(&json!(" 7.25 ")), 0.0), 7.25);
        assert_eq!(float_or(Some(&json!("abc")), 1.5), 1.5);
        assert_eq!(float_or(Some(&json!(null)), 2.0), 2.0);
        assert_eq!(float_or(Some(&json!("NaN")), 3.0), 3.0);
        assert_eq!(float_or(None, 4.0), 4.0);
    }

    #[test]
    fn int_or_truncates_through_float() {
        assert_eq!(int_or(Some(&json!("7.9")), 0), 7);
        assert_eq!(int_or(Some(&json!(18)), 0), 18);
        assert_eq!(int_or(Some(&json!(true)), 0), 1);
        assert_eq!(int_or(Some(&json!("")), 5), 5);
        assert_eq!(int_or(Some(&json!([1, 2])), 9), 9);
    }

    #[test]
    fn flag_or_reads_numbers_and_words() {
        assert!(flag_or(Some(&json!(1)), false));
        assert!(flag_or(Some(&json!("yes")), false));
        assert!(!flag_or(Some(&json!("0")), true));
        assert!(flag_or(Some(&json!("??")), true));
        assert!(!flag_or(None, false));
    }

    #[test]
    fn clock_or_accepts_text_and_hours() {
        let fallback = Time::from_hms(7, 0, 0).unwrap();
        assert_eq!(clock_or(Some(&json!("23:30")), fallback), Time::from_hms(23, 30, 0).unwrap());
        assert_eq!(clock_or(Some(&json!(22)), fallback), Time::from_hms(22, 0, 0).unwrap());
        assert_eq!(clock_or(Some(&json!(31)), fallback), fallback);
        assert_eq!(clock_or(Some(&json!("late")), fallback), fallback);
    }

    #[test]
    fn bounded_or_clamps() {
        assert_eq!(bounded_or(Some(&json!(42)), 3, 1, 5), 5);
        assert_eq!(bounded_or(Some(&json!(-2)), 3, 1, 5), 1);
        assert_eq!(bounded_or(None, 3, 1, 5), 3);
    }
}
