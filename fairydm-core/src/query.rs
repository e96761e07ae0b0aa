//! Native store queries.
//!
//! A [`Query`] is what a store backend executes: a collection name, a list of
//! conjunctive `where` conditions and an optional limit. Application code
//! normally produces one through [`crate::filter::translate`], but it can be
//! composed directly:
//!
//! ```ignore
//! use fairydm::query::{Query, WhereOp, FieldPath};
//!
//! let query = Query::collection("users")
//!     .and_where("age", WhereOp::Gte, 30)
//!     .and_where("address.city", WhereOp::Eq, "Anytown")
//!     .limit(1);
//! ```
//!
//! Backends consume queries through the [`QueryVisitor`] trait.

use bson::Bson;
use std::fmt;

use crate::error::DocumentStoreError;

/// Comparison operators understood by store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhereOp {
    /// `==`
    ///
    /// The in-memory store requires the whole value to be equal. MongoDB also
    /// matches an array field that contains a scalar operand, so `tags == "a"`
    /// matches `tags: ["a", "b"]` there; use [`WhereOp::ArrayContains`] for
    /// membership that behaves the same on every backend.
    Eq,
    /// `!=`. Never matches a document that lacks the field.
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `in`: the field equals one of the values in an array.
    In,
    /// `not-in`: the field exists and equals none of the values in an array.
    NotIn,
    /// `array-contains`: the array field contains the value.
    ArrayContains,
    /// `array-contains-any`: the array field contains at least one of the values.
    ArrayContainsAny,
}

impl WhereOp {
    /// The store's spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            WhereOp::Eq => "==",
            WhereOp::Ne => "!=",
            WhereOp::Gt => ">",
            WhereOp::Gte => ">=",
            WhereOp::Lt => "<",
            WhereOp::Lte => "<=",
            WhereOp::In => "in",
            WhereOp::NotIn => "not-in",
            WhereOp::ArrayContains => "array-contains",
            WhereOp::ArrayContainsAny => "array-contains-any",
        }
    }
}

impl fmt::Display for WhereOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a condition is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldPath {
    /// A document field, with `.` separating nested sub-document keys.
    Field(String),
    /// The store-assigned document identifier.
    DocumentId,
}

impl FieldPath {
    /// Splits a field path into its segments. Empty for [`FieldPath::DocumentId`].
    pub fn segments(&self) -> Vec<&str> {
        match self {
            FieldPath::Field(path) => path.split('.').collect(),
            FieldPath::DocumentId => Vec::new(),
        }
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::Field(path.to_string())
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        FieldPath::Field(path)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Field(path) => f.write_str(path),
            FieldPath::DocumentId => f.write_str("__name__"),
        }
    }
}

/// A single `where(path, op, value)` constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub path: FieldPath,
    pub op: WhereOp,
    pub value: Bson,
}

/// A query against one collection. All conditions must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// The collection to read from.
    pub collection: String,
    /// Conjunctive constraints, in the order they were added.
    pub conditions: Vec<Condition>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl Query {
    /// Starts an unconstrained query over `name`.
    pub fn collection(name: impl Into<String>) -> Self {
        Query {
            collection: name.into(),
            conditions: Vec::new(),
            limit: None,
        }
    }

    /// Adds a constraint.
    pub fn and_where(mut self, path: impl Into<FieldPath>, op: WhereOp, value: impl Into<Bson>) -> Self {
        self.conditions.push(Condition {
            path: path.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Caps the number of documents returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection)?;
        for condition in &self.conditions {
            write!(f, ".where({}, {}, {})", condition.path, condition.op, condition.value)?;
        }
        if let Some(limit) = self.limit {
            write!(f, ".limit({limit})")?;
        }
        Ok(())
    }
}

/// Walks the conditions of a [`Query`], one call per condition.
///
/// Store backends implement this to turn a query into their own
/// representation (a predicate, a wire filter, ...).
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_condition(
        &mut self,
        path: &FieldPath,
        op: WhereOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_conditions(&mut self, query: &Query) -> Result<Vec<Self::Output>, Self::Error> {
        query
            .conditions
            .iter()
            .map(|condition| self.visit_condition(&condition.path, condition.op, &condition.value))
            .collect()
    }
}
