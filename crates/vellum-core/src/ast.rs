//! Abstract syntax tree produced by the parser and walked by the evaluator.

use crate::value::{DataType, Value};

/// A fully parsed top-level statement.
#[derive(Debug, Clone)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    CreateTable(CreateTableStatement),
    AlterTable(AlterTableStatement),
    DropTable { name: String, if_exists: bool },
    CreateFunction(CreateFunctionStatement),
    DropFunction { name: String },
    CreateTrigger(CreateTriggerStatement),
    DropTrigger { name: String, if_exists: bool },
}

#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub distinct: bool,
    pub top: Option<u64>,
    pub items: Vec<SelectItem>,
    pub from: Vec<TableRef>,
    pub joins: Vec<Join>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum SelectItem {
    Wildcard,
    QualifiedWildcard(String),
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: OrderDirection,
}

#[derive(Debug, Clone)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Option<Vec<String>>,
    pub rows: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone)]
pub struct UpdateAssignment {
    pub column: String,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<UpdateAssignment>,
    pub filter: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct DeleteStatement {
    pub table: String,
    pub filter: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone)]
pub struct CreateTableStatement {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone)]
pub enum AlterTableStatement {
    AddColumn { table: String, column: ColumnDef },
    DropColumn { table: String, column: String },
    /// An ALTER TABLE variant outside ADD/DROP COLUMN (e.g. MODIFY COLUMN,
    /// ALTER COLUMN), parsed and accepted but not applied.
    NoOp,
}

#[derive(Debug, Clone)]
pub struct FunctionParam {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone)]
pub struct CreateFunctionStatement {
    pub name: String,
    pub params: Vec<FunctionParam>,
    pub return_type: DataType,
    pub body: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
pub enum TriggerStmt {
    SetNewOld {
        is_new: bool,
        column: String,
        expr: Expr,
    },
    If {
        branches: Vec<(Expr, Vec<TriggerStmt>)>,
        else_body: Vec<TriggerStmt>,
    },
    Dml(Box<Statement>),
}

#[derive(Debug, Clone)]
pub struct CreateTriggerStatement {
    pub name: String,
    pub table: String,
    pub timing: TriggerTiming,
    pub event: TriggerEvent,
    pub body: Vec<TriggerStmt>,
    pub source_text: String,
}

/// A parsed literal, already typed.
#[derive(Debug, Clone)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Literal {
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Int(i) => Value::Int(i),
            Self::Float(f) => Value::Float(f),
            Self::Text(s) => Value::Text(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// An expression node. `Call` doubles as the representation for
/// aggregate invocations; aggregate-ness is determined syntactically by
/// name, not by a dedicated variant.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Column {
        qualifier: Option<String>,
        name: String,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<(Expr, Expr)>,
        else_branch: Option<Box<Expr>>,
    },
    Cast {
        expr: Box<Expr>,
        target: DataType,
    },
    Call {
        name: String,
        distinct: bool,
        args: Vec<Expr>,
        /// Verbatim source text of the call's argument list, used to build
        /// the canonical aggregate key `FUNC([DISTINCT ]argsText)`.
        args_text: String,
    },
}

impl Expr {
    /// True if this call is syntactically an aggregate: a top-level call
    /// whose name is one of the five aggregate names.
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Call { name, .. } if is_aggregate_name(name))
    }

    /// The canonical key `FUNC([DISTINCT ]argsText)` used to look up a
    /// precomputed aggregate value on a grouped row. Must match exactly
    /// between independently parsed occurrences of the same aggregate
    /// expression (select list, HAVING, ORDER BY).
    #[must_use]
    pub fn aggregate_key(&self) -> Option<String> {
        match self {
            Self::Call {
                name,
                distinct,
                args_text,
                ..
            } if is_aggregate_name(name) => Some(canonical_agg_key(name, *distinct, args_text)),
            _ => None,
        }
    }
}

#[must_use]
pub fn is_aggregate_name(name: &str) -> bool {
    matches!(
        name.to_ascii_uppercase().as_str(),
        "COUNT" | "SUM" | "AVG" | "MIN" | "MAX"
    )
}

/// Builds the canonical aggregate key: uppercased function name, optional
/// `DISTINCT ` prefix, and the argument text with surrounding whitespace
/// trimmed. `*` is preserved verbatim.
#[must_use]
pub fn canonical_agg_key(name: &str, distinct: bool, args_text: &str) -> String {
    let normalized_args: String = args_text.split_whitespace().collect::<Vec<_>>().join(" ");
    if distinct {
        format!("{}(DISTINCT {})", name.to_ascii_uppercase(), normalized_args)
    } else {
        format!("{}({})", name.to_ascii_uppercase(), normalized_args)
    }
}
