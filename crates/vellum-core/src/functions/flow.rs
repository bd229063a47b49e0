//! Flow-control and identifier built-ins.

use uuid::Uuid;

use crate::value::Value;

pub fn dispatch(name: &str, args: &[Value]) -> Option<Value> {
    Some(match name {
        "IIF" | "IF" => {
            let cond = args.first()?;
            if cond.is_truthy() {
                args.get(1)?.clone()
            } else {
                args.get(2)?.clone()
            }
        }
        "NEWID" | "UUID" | "NEWGUID" => Value::Uuid(Uuid::new_v4()),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iif_picks_branch_by_truthiness() {
        let v = dispatch("IIF", &[Value::Bool(true), Value::Int(1), Value::Int(2)]);
        assert!(matches!(v, Some(Value::Int(1))));
    }

    #[test]
    fn newid_produces_uuid_value() {
        assert!(matches!(dispatch("NEWID", &[]), Some(Value::Uuid(_))));
    }
}
