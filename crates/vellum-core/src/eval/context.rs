//! Per-evaluation row bindings and registry handles.

use std::collections::HashMap;

use crate::database::{AddIn, UserFunction};
use crate::value::Value;

/// A case-insensitive row binding: both bare column names and
/// `alias.column` qualified names map to the same cells.
#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: HashMap<String, Value>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.cells.insert(key.into().to_ascii_lowercase(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.cells.get(&key.to_ascii_lowercase())
    }

    #[must_use]
    pub fn get_qualified(&self, qualifier: Option<&str>, name: &str) -> Option<&Value> {
        if let Some(q) = qualifier {
            if let Some(v) = self.get(&format!("{q}.{name}")) {
                return Some(v);
            }
        }
        self.get(name)
    }

    pub fn merge_from(&mut self, other: &Self) {
        for (k, v) in &other.cells {
            self.cells.insert(k.clone(), v.clone());
        }
    }

    #[must_use]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}

/// The cancellation hook checked between row evaluations by the async
/// façade. The synchronous core always passes a no-op closure.
pub type CancelCheck<'a> = dyn Fn() -> bool + 'a;

/// Everything an expression needs to evaluate: the current row, the
/// function/add-in registries, and (when evaluating a grouped row) the
/// precomputed aggregate values keyed by their canonical form.
pub struct EvalContext<'a> {
    pub row: &'a Row,
    pub functions: &'a HashMap<String, UserFunction>,
    pub add_ins: &'a HashMap<String, AddIn>,
    pub aggregates: Option<&'a HashMap<String, Value>>,
}

impl<'a> EvalContext<'a> {
    #[must_use]
    pub const fn new(
        row: &'a Row,
        functions: &'a HashMap<String, UserFunction>,
        add_ins: &'a HashMap<String, AddIn>,
    ) -> Self {
        Self {
            row,
            functions,
            add_ins,
            aggregates: None,
        }
    }

    #[must_use]
    pub fn with_aggregates(mut self, aggregates: &'a HashMap<String, Value>) -> Self {
        self.aggregates = Some(aggregates);
        self
    }
}
