//! String built-ins.

use crate::value::Value;

pub fn dispatch(name: &str, args: &[Value]) -> Option<Value> {
    Some(match name {
        "UPPER" | "UCASE" => text1(args, |s| s.to_uppercase()),
        "LOWER" | "LCASE" => text1(args, |s| s.to_lowercase()),
        "LEN" | "LENGTH" => {
            let s = arg_text(args, 0)?;
            Value::Int(s.chars().count() as i64)
        }
        "TRIM" => text1(args, |s| s.trim().to_string()),
        "LTRIM" => text1(args, |s| s.trim_start().to_string()),
        "RTRIM" => text1(args, |s| s.trim_end().to_string()),
        "REVERSE" => text1(args, |s| s.chars().rev().collect()),
        "CONCAT" => {
            if args.iter().any(Value::is_null) {
                return Some(Value::Null);
            }
            Value::Text(args.iter().map(Value::to_display_string).collect())
        }
        "CONCAT_WS" => {
            let sep = arg_text(args, 0)?;
            let parts: Vec<String> = args[1..]
                .iter()
                .filter(|v| !v.is_null())
                .map(Value::to_display_string)
                .collect();
            Value::Text(parts.join(&sep))
        }
        "REPLACE" => {
            let s = arg_text(args, 0)?;
            let from = arg_text(args, 1)?;
            let to = arg_text(args, 2)?;
            Value::Text(s.replace(&from, &to))
        }
        "SUBSTRING" | "SUBSTR" | "MID" => {
            let s = arg_text(args, 0)?;
            let start = arg_i64(args, 1)?.max(1) as usize - 1;
            let chars: Vec<char> = s.chars().collect();
            let len = args
                .get(2)
                .and_then(Value::as_i64)
                .map_or(chars.len().saturating_sub(start), |l| l.max(0) as usize);
            let end = (start + len).min(chars.len());
            let start = start.min(chars.len());
            Value::Text(chars[start..end].iter().collect())
        }
        "LEFT" => {
            let s = arg_text(args, 0)?;
            let n = arg_i64(args, 1)?.max(0) as usize;
            Value::Text(s.chars().take(n).collect())
        }
        "RIGHT" => {
            let s = arg_text(args, 0)?;
            let n = arg_i64(args, 1)?.max(0) as usize;
            let chars: Vec<char> = s.chars().collect();
            let start = chars.len().saturating_sub(n);
            Value::Text(chars[start..].iter().collect())
        }
        "CHARINDEX" | "LOCATE" | "INSTR" => {
            let needle = arg_text(args, 0)?;
            let haystack = arg_text(args, 1)?;
            Value::Int(find_index(&haystack, &needle))
        }
        "PATINDEX" => {
            let pattern = arg_text(args, 0)?;
            let haystack = arg_text(args, 1)?;
            let regex = crate::eval::like_pattern_to_regex(&pattern);
            let inner = regex.trim_start_matches('^').trim_end_matches('$');
            match regex::Regex::new(&format!("(?i){inner}")) {
                Ok(re) => Value::Int(re.find(&haystack).map_or(0, |m| m.start() as i64 + 1)),
                Err(_) => Value::Int(0),
            }
        }
        "REPLICATE" | "REPEAT" => {
            let s = arg_text(args, 0)?;
            let n = arg_i64(args, 1)?.max(0) as usize;
            Value::Text(s.repeat(n))
        }
        "SPACE" => {
            let n = arg_i64(args, 0)?.max(0) as usize;
            Value::Text(" ".repeat(n))
        }
        "STR" | "TOSTRING" | "TO_CHAR" => {
            Value::Text(args.first().map(Value::to_display_string).unwrap_or_default())
        }
        "ASCII" => {
            let s = arg_text(args, 0)?;
            Value::Int(i64::from(s.chars().next().map_or(0, |c| c as u32)))
        }
        "CHAR" => {
            let code = arg_i64(args, 0)?;
            Value::Text(
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default(),
            )
        }
        _ => return None,
    })
}

fn text1(args: &[Value], f: impl FnOnce(&str) -> String) -> Value {
    match args.first() {
        Some(v) if !v.is_null() => Value::Text(f(&v.to_display_string())),
        _ => Value::Null,
    }
}

fn arg_text(args: &[Value], idx: usize) -> Option<String> {
    match args.get(idx) {
        Some(v) if !v.is_null() => Some(v.to_display_string()),
        _ => None,
    }
}

fn arg_i64(args: &[Value], idx: usize) -> Option<i64> {
    args.get(idx).and_then(Value::as_i64)
}

/// 1-based, case-insensitive; 0 if not found.
fn find_index(haystack: &str, needle: &str) -> i64 {
    if needle.is_empty() {
        return 1;
    }
    let haystack_lower = haystack.to_lowercase();
    let needle_lower = needle.to_lowercase();
    haystack_lower
        .find(&needle_lower)
        .map_or(0, |byte_idx| haystack[..byte_idx].chars().count() as i64 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_lower_roundtrip() {
        assert!(matches!(
            dispatch("UPPER", &[Value::Text("abc".into())]),
            Some(Value::Text(s)) if s == "ABC"
        ));
    }

    #[test]
    fn substring_is_one_based() {
        let v = dispatch(
            "SUBSTRING",
            &[Value::Text("hello".into()), Value::Int(2), Value::Int(3)],
        );
        assert!(matches!(v, Some(Value::Text(s)) if s == "ell"));
    }

    #[test]
    fn charindex_is_one_based_and_case_insensitive() {
        let v = dispatch(
            "CHARINDEX",
            &[Value::Text("LL".into()), Value::Text("hello".into())],
        );
        assert!(matches!(v, Some(Value::Int(3))));
    }

    #[test]
    fn charindex_not_found_is_zero() {
        let v = dispatch(
            "CHARINDEX",
            &[Value::Text("zz".into()), Value::Text("hello".into())],
        );
        assert!(matches!(v, Some(Value::Int(0))));
    }

    #[test]
    fn concat_ws_skips_nulls() {
        let v = dispatch(
            "CONCAT_WS",
            &[Value::Text(",".into()), Value::Text("a".into()), Value::Null, Value::Text("b".into())],
        );
        assert!(matches!(v, Some(Value::Text(s)) if s == "a,b"));
    }
}
