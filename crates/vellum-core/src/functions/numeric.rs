//! Numeric built-ins.

use crate::value::Value;

pub fn dispatch(name: &str, args: &[Value]) -> Option<Value> {
    Some(match name {
        "ABS" => num1(args, f64::abs)?,
        "ROUND" => {
            let x = arg_f64(args, 0)?;
            let digits = args.get(1).and_then(Value::as_i64).unwrap_or(0);
            let factor = 10f64.powi(digits as i32);
            Value::Float(round_half_away_from_zero(x * factor) / factor)
        }
        "FLOOR" => num1(args, f64::floor)?,
        "CEILING" | "CEIL" => num1(args, f64::ceil)?,
        "POWER" | "POW" => {
            let base = arg_f64(args, 0)?;
            let exp = arg_f64(args, 1)?;
            Value::Float(base.powf(exp))
        }
        "SQRT" => num1(args, f64::sqrt)?,
        "EXP" => num1(args, f64::exp)?,
        "LOG" | "LN" => {
            if let Some(base) = args.get(1).and_then(Value::as_f64) {
                Value::Float(arg_f64(args, 0)?.log(base))
            } else {
                num1(args, f64::ln)?
            }
        }
        "LOG10" => num1(args, f64::log10)?,
        "SIGN" => {
            let x = arg_f64(args, 0)?;
            Value::Int(if x > 0.0 {
                1
            } else if x < 0.0 {
                -1
            } else {
                0
            })
        }
        "MOD" => {
            let a = arg_f64(args, 0)?;
            let b = arg_f64(args, 1)?;
            if b == 0.0 {
                return Some(Value::Null);
            }
            Value::Float(a % b)
        }
        "RAND" | "RANDOM" => Value::Float(0.5),
        "PI" => Value::Float(std::f64::consts::PI),
        _ => return None,
    })
}

fn num1(args: &[Value], f: impl FnOnce(f64) -> f64) -> Option<Value> {
    match args.first() {
        Some(v) if v.is_null() => Some(Value::Null),
        Some(v) => v.as_f64().map(|x| Value::Float(f(x))),
        None => None,
    }
}

fn arg_f64(args: &[Value], idx: usize) -> Option<f64> {
    args.get(idx).and_then(Value::as_f64)
}

fn round_half_away_from_zero(x: f64) -> f64 {
    if x >= 0.0 {
        (x + 0.5).floor()
    } else {
        (x - 0.5).ceil()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_half_away_from_zero_matches_sql() {
        assert!(matches!(
            dispatch("ROUND", &[Value::Float(2.5)]),
            Some(Value::Float(f)) if f == 3.0
        ));
        assert!(matches!(
            dispatch("ROUND", &[Value::Float(-2.5)]),
            Some(Value::Float(f)) if f == -3.0
        ));
    }

    #[test]
    fn mod_by_zero_is_null() {
        assert!(matches!(
            dispatch("MOD", &[Value::Int(5), Value::Int(0)]),
            Some(Value::Null)
        ));
    }

    #[test]
    fn sign_of_zero_is_zero() {
        assert!(matches!(dispatch("SIGN", &[Value::Int(0)]), Some(Value::Int(0))));
    }
}
