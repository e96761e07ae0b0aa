//! Filter expressions and their translation into native store queries.
//!
//! A [`Filter`] is a tree over field paths. Each node is either a literal
//! equality, an operator map applied to one path, or a nested object whose
//! keys extend the parent path with `.`. Everything combines with AND.
//!
//! Filters are usually written in the familiar document-database style and
//! converted from a `bson::Document`:
//!
//! ```ignore
//! use bson::doc;
//! use fairydm::filter::Filter;
//!
//! let filter = Filter::from(doc! {
//!     "age": { "$gte": 30, "$lt": 40 },
//!     "address": { "city": "Anytown" },
//! });
//! ```
//!
//! or built directly:
//!
//! ```ignore
//! let filter = Filter::new()
//!     .op("age", Operator::Gte, 30)
//!     .nested("address", Filter::new().eq("city", "Anytown"));
//! ```
//!
//! # Operator maps versus nested objects
//!
//! A mapping value is an operator map as soon as one of its keys is a
//! recognised operator; otherwise it is a nested path object. A sub-document
//! whose field names collide with operator names (a field literally called
//! `$gt`, say) therefore cannot be addressed through a nested object. Spell
//! the dotted path with [`Filter::eq`] instead.

use bson::{Bson, Uuid};
use std::{fmt, str::FromStr};

use crate::query::{FieldPath, Query, WhereOp};

/// The reserved path addressing the store-assigned identifier.
pub const ID_PATH: &str = "_id";

/// Filter operators, spelled `$eq`, `$gt`, ... in document form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Ne,
    In,
    Nin,
    ArrayContains,
    ArrayContainsAny,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Eq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Ne,
        Operator::In,
        Operator::Nin,
        Operator::ArrayContains,
        Operator::ArrayContainsAny,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::Ne => "$ne",
            Operator::In => "$in",
            Operator::Nin => "$nin",
            Operator::ArrayContains => "$array_contains",
            Operator::ArrayContainsAny => "$array_contains_any",
        }
    }

    /// The native comparison this operator maps to.
    pub fn where_op(&self) -> WhereOp {
        match self {
            Operator::Eq => WhereOp::Eq,
            Operator::Gt => WhereOp::Gt,
            Operator::Gte => WhereOp::Gte,
            Operator::Lt => WhereOp::Lt,
            Operator::Lte => WhereOp::Lte,
            Operator::Ne => WhereOp::Ne,
            Operator::In => WhereOp::In,
            Operator::Nin => WhereOp::NotIn,
            Operator::ArrayContains => WhereOp::ArrayContains,
            Operator::ArrayContainsAny => WhereOp::ArrayContainsAny,
        }
    }
}

impl FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of a filter tree. `key` is relative to the enclosing node.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// `key == value`
    Equals { key: String, value: Bson },
    /// Every `(operator, value)` pair applied to `key`.
    Operators { key: String, ops: Vec<(Operator, Bson)> },
    /// Sub-filters whose keys are appended to `key`.
    Nested { key: String, filter: Filter },
}

/// A conjunctive filter expression. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    nodes: Vec<FilterNode>,
}

impl Filter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Alias of [`Filter::new`] that reads better at call sites.
    pub fn all() -> Self {
        Self::new()
    }

    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a literal equality on `key`.
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.nodes.push(FilterNode::Equals { key: key.into(), value: value.into() });
        self
    }

    /// Adds an operator constraint on `key`. Repeated calls for the same key
    /// merge into one operator map.
    pub fn op(mut self, key: impl Into<String>, op: Operator, value: impl Into<Bson>) -> Self {
        let key = key.into();
        let value = value.into();

        match self.nodes.last_mut() {
            Some(FilterNode::Operators { key: last, ops }) if *last == key => ops.push((op, value)),
            _ => self.nodes.push(FilterNode::Operators { key, ops: vec![(op, value)] }),
        }
        self
    }

    /// Adds a nested object under `key`.
    pub fn nested(mut self, key: impl Into<String>, filter: Filter) -> Self {
        self.nodes.push(FilterNode::Nested { key: key.into(), filter });
        self
    }

    /// Matches the document with identifier `id`.
    pub fn id(self, id: Uuid) -> Self {
        self.eq(ID_PATH, id)
    }
}

impl From<bson::Document> for Filter {
    fn from(document: bson::Document) -> Self {
        let mut filter = Filter::new();

        for (key, value) in document {
            let node = match value {
                Bson::Document(map) if map.keys().any(|k| k.parse::<Operator>().is_ok()) => {
                    let mut ops = Vec::with_capacity(map.len());
                    for (op, operand) in map {
                        match op.parse::<Operator>() {
                            Ok(op) => ops.push((op, operand)),
                            Err(()) => log::warn!("ignoring unrecognised operator {op} on {key}"),
                        }
                    }
                    FilterNode::Operators { key, ops }
                }
                Bson::Document(map) => FilterNode::Nested { key, filter: Filter::from(map) },
                value => FilterNode::Equals { key, value },
            };
            filter.nodes.push(node);
        }

        filter
    }
}

/// Walks a [`Filter`] tree with fully resolved paths.
pub trait FilterVisitor {
    fn visit_equals(&mut self, path: &str, value: &Bson);

    fn visit_operator(&mut self, path: &str, op: Operator, value: &Bson);

    fn visit_filter(&mut self, filter: &Filter, parent: &str) {
        for node in filter.nodes() {
            match node {
                FilterNode::Equals { key, value } => self.visit_equals(&join_path(parent, key), value),
                FilterNode::Operators { key, ops } => {
                    let path = join_path(parent, key);
                    for (op, value) in ops {
                        self.visit_operator(&path, *op, value);
                    }
                }
                FilterNode::Nested { key, filter } => self.visit_filter(filter, &join_path(parent, key)),
            }
        }
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Builds a native [`Query`] by composing one `where` per constraint.
struct QueryTranslator {
    query: Query,
}

impl QueryTranslator {
    fn target(path: &str) -> FieldPath {
        if path == ID_PATH {
            FieldPath::DocumentId
        } else {
            FieldPath::Field(path.to_string())
        }
    }

    fn push(&mut self, path: &str, op: WhereOp, value: &Bson) {
        let target = Self::target(path);
        let value = match target {
            FieldPath::DocumentId => id_value(value),
            FieldPath::Field(_) => value.clone(),
        };
        let query = std::mem::replace(&mut self.query, Query::collection(""));
        self.query = query.and_where(target, op, value);
    }
}

impl FilterVisitor for QueryTranslator {
    fn visit_equals(&mut self, path: &str, value: &Bson) {
        self.push(path, WhereOp::Eq, value);
    }

    fn visit_operator(&mut self, path: &str, op: Operator, value: &Bson) {
        self.push(path, op.where_op(), value);
    }
}

// Identifiers may be given as strings; normalize anything that parses.
fn id_value(value: &Bson) -> Bson {
    match value {
        Bson::String(s) => Uuid::parse_str(s).map(Bson::from).unwrap_or_else(|_| value.clone()),
        Bson::Array(items) => Bson::Array(items.iter().map(id_value).collect()),
        _ => value.clone(),
    }
}

/// Translates `filter` into a query over `collection`.
pub fn translate(collection: &str, filter: &Filter) -> Query {
    let mut translator = QueryTranslator { query: Query::collection(collection) };
    translator.visit_filter(filter, "");

    log::debug!("translated filter into {}", translator.query);
    translator.query
}
