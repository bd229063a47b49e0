//! Date/time built-ins.

use chrono::{Datelike, Utc};

use crate::value::Value;

pub fn dispatch(name: &str, args: &[Value]) -> Option<Value> {
    Some(match name {
        "NOW" | "GETDATE" | "CURRENT_TIMESTAMP" | "GETUTCDATE" | "UTC_TIMESTAMP" => {
            Value::Timestamp(Utc::now())
        }
        "YEAR" => date_part(args, |d| i64::from(d.year()))?,
        "MONTH" => date_part(args, |d| i64::from(d.month()))?,
        "DAY" => date_part(args, |d| i64::from(d.day()))?,
        "DATEDIFF" => {
            let part = match args.first()? {
                Value::Text(s) => s.to_ascii_uppercase(),
                _ => return None,
            };
            let d1 = as_timestamp(args.get(1)?)?;
            let d2 = as_timestamp(args.get(2)?)?;
            let delta = d2 - d1;
            Value::Int(match part.as_str() {
                "YEAR" => i64::from(d2.year() - d1.year()),
                "MONTH" => {
                    i64::from(d2.year() - d1.year()) * 12 + i64::from(d2.month() as i32 - d1.month() as i32)
                }
                "DAY" => delta.num_days(),
                "HOUR" => delta.num_hours(),
                "MINUTE" => delta.num_minutes(),
                "SECOND" => delta.num_seconds(),
                _ => return None,
            })
        }
        _ => return None,
    })
}

fn date_part(args: &[Value], f: impl FnOnce(chrono::DateTime<Utc>) -> i64) -> Option<Value> {
    match args.first() {
        Some(v) if v.is_null() => Some(Value::Null),
        Some(v) => as_timestamp(v).map(f).map(Value::Int),
        None => None,
    }
}

fn as_timestamp(v: &Value) -> Option<chrono::DateTime<Utc>> {
    match v {
        Value::Timestamp(t) => Some(*t),
        Value::Text(s) => crate::value::parse_timestamp(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_month_day_from_text() {
        let d = Value::Text("2024-03-15".into());
        assert!(matches!(dispatch("YEAR", &[d.clone()]), Some(Value::Int(2024))));
        assert!(matches!(dispatch("MONTH", &[d.clone()]), Some(Value::Int(3))));
        assert!(matches!(dispatch("DAY", &[d]), Some(Value::Int(15))));
    }

    #[test]
    fn datediff_in_days() {
        let d1 = Value::Text("2024-01-01".into());
        let d2 = Value::Text("2024-01-11".into());
        let v = dispatch("DATEDIFF", &[Value::Text("DAY".into()), d1, d2]);
        assert!(matches!(v, Some(Value::Int(10))));
    }
}
