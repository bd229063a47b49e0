//! Null-handling built-ins.

use crate::value::Value;

pub fn dispatch(name: &str, args: &[Value]) -> Option<Value> {
    Some(match name {
        "COALESCE" | "NVL" | "IFNULL" | "ISNULL" => {
            args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null)
        }
        "NULLIF" => {
            let a = args.first()?;
            let b = args.get(1)?;
            if Value::values_equal(a, b) {
                Value::Null
            } else {
                a.clone()
            }
        }
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesce_returns_first_non_null() {
        let v = dispatch("COALESCE", &[Value::Null, Value::Null, Value::Int(7)]);
        assert!(matches!(v, Some(Value::Int(7))));
    }

    #[test]
    fn nullif_returns_null_when_equal() {
        let v = dispatch("NULLIF", &[Value::Int(1), Value::Int(1)]);
        assert!(matches!(v, Some(Value::Null)));
    }

    #[test]
    fn nullif_returns_first_when_different() {
        let v = dispatch("NULLIF", &[Value::Int(1), Value::Int(2)]);
        assert!(matches!(v, Some(Value::Int(1))));
    }
}
