use crate::model::DailyRecord;
use crate::timefmt;

const HEADER: &str = "participant_id,date,total_mg,intake_detail,last_intake_hour,bed_time,wake_time,sleep_hours,sleep_quality,stress,anxiety,focus,palpitations,headache,irritability,digestive,created_at\n";

pub fn records_csv(records: &[DailyRecord]) -> String {
    let mut out = String::new();
    out.push_str(HEADER);

    for r in records {
        let flag = |b: bool| if b { "1" } else { "0" }.to_string();
        let row: Vec<String> = vec![
            csv_escape(r.participant_id.as_str()),
            timefmt::fmt_day(r.date),
            r.total_mg.to_string(),
            csv_escape(&r.intake_detail),
            r.last_intake_hour.to_string(),
            timefmt::fmt_clock(r.bed_time),
            timefmt::fmt_clock(r.wake_time),
            r.sleep_hours.to_string(),
            r.sleep_quality.to_string(),
            r.stress.to_string(),
            r.anxiety.to_string(),
            r.focus.to_string(),
            flag(r.symptoms.palpitations),
            flag(r.symptoms.headache),
            flag(r.symptoms.irritability),
            flag(r.symptoms.digestive),
            csv_escape(&timefmt::fmt_ts(r.created_at)),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

fn csv_escape(s: &str) -> String {
    let needs_quote = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');
    if !needs_quote {
        return s.to_string();
    }
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests::record;

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn renders_header_and_rows() {
        let mut r = record("2026-02-15", 170, 15, 7.5);
        r.symptoms.headache = true;
        r.intake_detail = "Espresso (30 ml) x1 (75 mg) | Filter coffee (250 ml) x1 (95 mg)".to_string();
        let csv = records_csv(&[r]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("participant_id,date,total_mg,"));
        assert!(lines[1].starts_with("P001,2026-02-15,170,Espresso (30 ml) x1"));
        assert!(lines[1].contains(",15,23:00,07:00,7.5,3,3,3,6,0,1,0,0,"));
    }

    #[test]
    fn empty_input_is_header_only() {
        assert_eq!(records_csv(&[]), HEADER);
    }
}
