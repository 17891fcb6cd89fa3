//! Statement tree consumed by the analyzer.
//!
//! This is a closed set: every consumer matches exhaustively, so adding a
//! variant forces each stage to decide how to handle it.

use std::fmt;

use crate::types::{Datum, ScalarType};

/// A possibly schema-qualified object name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Schema (database) name, if given.
    pub schema: Option<String>,
    /// Object name.
    pub name: String,
}

impl ObjectRef {
    /// Creates an unqualified reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Creates a qualified reference.
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(s) => write!(f, "{}.{}", s, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A literal value in statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// NULL.
    Null,
    /// Integer literal.
    Int(i64),
    /// Quoted string literal.
    String(String),
}

impl Literal {
    /// Converts the literal to a runtime datum.
    pub fn to_datum(&self) -> Datum {
        match self {
            Literal::Null => Datum::Null,
            Literal::Int(v) => Datum::Int64(*v),
            Literal::String(s) => Datum::from(s.as_str()),
        }
    }
}

/// Binary operators that survive lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryOp {
    /// `=`
    Eq,
    /// Any other operator, kept by its SQL spelling so it can be reported.
    Other(String),
}

/// Expression as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Column reference, optionally qualified by table.
    Column {
        /// Table qualifier.
        table: Option<String>,
        /// Column name.
        name: String,
    },
    /// `@@name` system variable reference.
    SessionVar(String),
    /// Literal value.
    Literal(Literal),
    /// Binary comparison.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Any expression the engine cannot evaluate, kept as SQL text.
    Unsupported(String),
}

impl Expr {
    /// Creates an unqualified column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column {
            table: None,
            name: name.into(),
        }
    }

    /// Creates an equality comparison.
    pub fn eq(left: Expr, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op: BinaryOp::Eq,
            right: Box::new(right),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column { table: Some(t), name } => write!(f, "{}.{}", t, name),
            Expr::Column { table: None, name } => write!(f, "{}", name),
            Expr::SessionVar(name) => write!(f, "@@{}", name),
            Expr::Literal(Literal::Null) => write!(f, "NULL"),
            Expr::Literal(Literal::Int(v)) => write!(f, "{}", v),
            Expr::Literal(Literal::String(s)) => write!(f, "'{}'", s),
            Expr::Binary { left, op, right } => match op {
                BinaryOp::Eq => write!(f, "{} = {}", left, right),
                BinaryOp::Other(o) => write!(f, "{} {} {}", left, o, right),
            },
            Expr::Unsupported(sql) => write!(f, "{}", sql),
        }
    }
}

/// One item of a SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// An expression with optional alias.
    Expr {
        /// The expression.
        expr: Expr,
        /// `AS alias`.
        alias: Option<String>,
    },
}

/// SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    /// FROM table; at most one.
    pub from: Option<ObjectRef>,
    /// Target list.
    pub items: Vec<SelectItem>,
    /// WHERE condition.
    pub selection: Option<Expr>,
    /// LIMIT count.
    pub limit: Option<u64>,
}

/// INSERT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    /// Target table.
    pub table: ObjectRef,
    /// Explicit column list; empty means every column in declared order.
    pub columns: Vec<String>,
    /// VALUES rows.
    pub rows: Vec<Vec<Expr>>,
}

/// One `SET col = value` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Target identifier parts, e.g. `["t", "col"]`.
    pub target: Vec<String>,
    /// Assigned value.
    pub value: Expr,
}

/// UPDATE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatement {
    /// Target table.
    pub table: ObjectRef,
    /// SET clauses.
    pub assignments: Vec<Assignment>,
    /// WHERE condition.
    pub selection: Option<Expr>,
}

/// A column in CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub scalar_type: ScalarType,
    /// Whether NULL is accepted.
    pub nullable: bool,
    /// PRIMARY KEY.
    pub primary_key: bool,
    /// UNIQUE.
    pub unique: bool,
}

/// CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableStatement {
    /// Table name.
    pub table: ObjectRef,
    /// Columns in declaration order.
    pub columns: Vec<ColumnSpec>,
    /// IF NOT EXISTS.
    pub if_not_exists: bool,
}

/// CREATE INDEX statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexStatement {
    /// Index name.
    pub name: ObjectRef,
    /// Indexed table.
    pub table: ObjectRef,
    /// Indexed column names, in key order.
    pub columns: Vec<String>,
    /// UNIQUE.
    pub unique: bool,
    /// IF NOT EXISTS.
    pub if_not_exists: bool,
}

/// What a SHOW statement lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowKind {
    /// Every database.
    Databases,
    /// Tables of the current database.
    Tables,
}

impl fmt::Display for ShowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShowKind::Databases => write!(f, "DATABASES"),
            ShowKind::Tables => write!(f, "TABLES"),
        }
    }
}

/// A parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// CREATE DATABASE.
    CreateDatabase {
        /// Database name.
        name: String,
        /// IF NOT EXISTS.
        if_not_exists: bool,
    },
    /// DROP DATABASE.
    DropDatabase {
        /// Database name.
        name: String,
        /// IF EXISTS.
        if_exists: bool,
    },
    /// CREATE TABLE.
    CreateTable(CreateTableStatement),
    /// DROP TABLE.
    DropTable {
        /// Table name.
        table: ObjectRef,
        /// IF EXISTS.
        if_exists: bool,
    },
    /// CREATE INDEX.
    CreateIndex(CreateIndexStatement),
    /// USE database.
    Use {
        /// Database name.
        database: String,
    },
    /// SHOW DATABASES / SHOW TABLES.
    Show(ShowKind),
    /// SELECT.
    Select(SelectStatement),
    /// INSERT.
    Insert(InsertStatement),
    /// UPDATE.
    Update(UpdateStatement),
}

impl Statement {
    /// Returns true for statements executed directly against the catalog,
    /// without analysis or planning.
    pub fn is_ddl(&self) -> bool {
        match self {
            Statement::CreateDatabase { .. }
            | Statement::DropDatabase { .. }
            | Statement::CreateTable(_)
            | Statement::DropTable { .. }
            | Statement::Use { .. } => true,
            Statement::CreateIndex(_)
            | Statement::Show(_)
            | Statement::Select(_)
            | Statement::Insert(_)
            | Statement::Update(_) => false,
        }
    }

    /// Short statement tag for logs.
    pub fn tag(&self) -> &'static str {
        match self {
            Statement::CreateDatabase { .. } => "CREATE DATABASE",
            Statement::DropDatabase { .. } => "DROP DATABASE",
            Statement::CreateTable(_) => "CREATE TABLE",
            Statement::DropTable { .. } => "DROP TABLE",
            Statement::CreateIndex(_) => "CREATE INDEX",
            Statement::Use { .. } => "USE",
            Statement::Show(_) => "SHOW",
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
        }
    }
}
