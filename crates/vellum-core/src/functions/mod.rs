//! Built-in SQL function library, resolved after user functions and
//! add-ins (see [`crate::eval`]'s dispatch order).

mod datefn;
mod flow;
mod nullfn;
mod numeric;
mod string;

use crate::value::Value;

/// Dispatches a built-in by upper-cased name. Returns `None` if `name`
/// is not a recognized built-in (the caller then falls back to `Null`,
/// per the "unknown function names are not an error" rule).
pub fn dispatch(name: &str, args: &[Value]) -> Option<Value> {
    let upper = name.to_ascii_uppercase();
    string::dispatch(&upper, args)
        .or_else(|| numeric::dispatch(&upper, args))
        .or_else(|| nullfn::dispatch(&upper, args))
        .or_else(|| datefn::dispatch(&upper, args))
        .or_else(|| flow::dispatch(&upper, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_function_name_dispatches_to_none() {
        assert!(dispatch("NOT_A_FUNCTION", &[]).is_none());
    }
}
