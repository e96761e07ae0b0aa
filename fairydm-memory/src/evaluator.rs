//! Query condition evaluation for in-memory document filtering.
//!
//! This module decides whether a stored document satisfies every condition of
//! a [`Query`], following the store's comparison rules: values of different
//! types never order against each other, integers and doubles compare
//! numerically, and a condition on a missing field never matches.

use bson::{Bson, Uuid, datetime::DateTime};
use std::{cmp::Ordering, collections::HashMap};

use fairydm_core::{
    document::DocumentSnapshot,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{FieldPath, Query, QueryVisitor, WhereOp},
};

/// Type-erased, comparable representation of BSON values.
///
/// Integers compare exactly as `i64`; an integer and a double compare as
/// `f64`. Binary values (including UUIDs) compare by their bytes. Types
/// without an ordering fall back to BSON equality.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    DateTime(DateTime),
    String(&'a str),
    Bytes(&'a [u8]),
    ObjectId([u8; 12]),
    Timestamp(u32, u32),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Double(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Binary(binary) => Comparable::Bytes(&binary.bytes),
            Bson::ObjectId(oid) => Comparable::ObjectId(oid.bytes()),
            Bson::Timestamp(ts) => Comparable::Timestamp(ts.time, ts.increment),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            other => Comparable::Other(other),
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Double(a), Comparable::Double(b)) => a == b,
            (Comparable::Int(a), Comparable::Double(b)) | (Comparable::Double(b), Comparable::Int(a)) => {
                *a as f64 == *b
            }
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Timestamp(at, ai), Comparable::Timestamp(bt, bi)) => (at, ai) == (bt, bi),
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => a.partial_cmp(b),
            (Comparable::Double(a), Comparable::Double(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Double(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Double(a), Comparable::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::Timestamp(at, ai), Comparable::Timestamp(bt, bi)) => (at, ai).partial_cmp(&(bt, bi)),
            _ => None,
        }
    }
}

fn array_operand<'v>(op: WhereOp, value: &'v Bson) -> DocumentStoreResult<&'v [Bson]> {
    match value {
        Bson::Array(values) => Ok(values),
        other => Err(DocumentStoreError::Backend(format!(
            "'{op}' requires an array value, got {other}"
        ))),
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    id: Uuid,
    document: &'a bson::Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(id: Uuid, document: &'a bson::Document) -> Self {
        Self { id, document }
    }

    pub fn evaluate(&mut self, query: &Query) -> DocumentStoreResult<bool> {
        Ok(self.visit_conditions(query)?.into_iter().all(|matched| matched))
    }

    /// Returns the matching documents, in iteration order, up to the query's limit.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = (&'a Uuid, &'a bson::Document)>,
        query: &Query,
    ) -> DocumentStoreResult<Vec<DocumentSnapshot>> {
        let limit = query.limit.unwrap_or(usize::MAX);
        let mut matched = Vec::new();

        for (id, document) in documents {
            if matched.len() >= limit {
                break;
            }
            if DocumentEvaluator::new(*id, document).evaluate(query)? {
                matched.push(DocumentSnapshot::new(*id, document.clone()));
            }
        }

        Ok(matched)
    }

    fn resolve(&self, path: &FieldPath) -> Option<&'a Bson> {
        let mut segments = path.segments().into_iter();
        let mut current = self.document.get(segments.next()?)?;

        for segment in segments {
            current = current.as_document()?.get(segment)?;
        }

        Some(current)
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_condition(&mut self, path: &FieldPath, op: WhereOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let id_value;
        let field_value = match path {
            FieldPath::DocumentId => {
                id_value = Bson::from(self.id);
                &id_value
            }
            FieldPath::Field(_) => match self.resolve(path) {
                Some(field_value) => field_value,
                None => return Ok(false),
            },
        };

        let left = Comparable::from(field_value);

        match op {
            WhereOp::Eq => Ok(left == Comparable::from(value)),
            WhereOp::Ne => Ok(left != Comparable::from(value)),
            WhereOp::Gt | WhereOp::Gte | WhereOp::Lt | WhereOp::Lte => {
                Ok(match left.partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => match op {
                        WhereOp::Gt => ordering == Ordering::Greater,
                        WhereOp::Gte => ordering != Ordering::Less,
                        WhereOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                })
            }
            WhereOp::In => Ok(array_operand(op, value)?
                .iter()
                .any(|candidate| left == Comparable::from(candidate))),
            WhereOp::NotIn => Ok(!array_operand(op, value)?
                .iter()
                .any(|candidate| left == Comparable::from(candidate))),
            WhereOp::ArrayContains => match left {
                Comparable::Array(items) => {
                    let needle = Comparable::from(value);
                    Ok(items.iter().any(|item| item == &needle))
                }
                _ => Ok(false),
            },
            WhereOp::ArrayContainsAny => {
                let candidates = array_operand(op, value)?;
                match left {
                    Comparable::Array(items) => Ok(candidates.iter().any(|candidate| {
                        let needle = Comparable::from(candidate);
                        items.iter().any(|item| item == &needle)
                    })),
                    _ => Ok(false),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Decimal128, Timestamp, doc, oid::ObjectId};

    fn matches(document: &bson::Document, query: Query) -> bool {
        DocumentEvaluator::new(Uuid::new(), document).evaluate(&query).unwrap()
    }

    #[test]
    fn numbers_compare_across_widths() {
        let document = doc! { "age": 30_i64 };

        assert!(matches(&document, Query::collection("c").and_where("age", WhereOp::Eq, 30.0)));
        assert!(matches(&document, Query::collection("c").and_where("age", WhereOp::Gte, 30)));
        assert!(!matches(&document, Query::collection("c").and_where("age", WhereOp::Gt, 30)));
    }

    #[test]
    fn large_integers_compare_exactly() {
        let document = doc! { "n": 9_007_199_254_740_993_i64 };

        assert!(!matches(&document, Query::collection("c").and_where("n", WhereOp::Eq, 9_007_199_254_740_992_i64)));
        assert!(matches(&document, Query::collection("c").and_where("n", WhereOp::Gt, 9_007_199_254_740_992_i64)));
        assert!(matches(&document, Query::collection("c").and_where("n", WhereOp::Eq, 9_007_199_254_740_993_i64)));
    }

    #[test]
    fn object_ids_compare_by_value() {
        let owner = ObjectId::new();
        let document = doc! { "owner": owner };

        assert!(matches(&document, Query::collection("c").and_where("owner", WhereOp::Eq, owner)));
        assert!(!matches(&document, Query::collection("c").and_where("owner", WhereOp::Eq, ObjectId::new())));
        assert!(!matches(&document, Query::collection("c").and_where("owner", WhereOp::Eq, Bson::Null)));
    }

    #[test]
    fn unordered_types_fall_back_to_equality() {
        let price = Decimal128::from_bytes([1; 16]);
        let document = doc! { "price": price, "stamp": Timestamp { time: 10, increment: 1 } };

        assert!(matches(&document, Query::collection("c").and_where("price", WhereOp::Eq, price)));
        assert!(!matches(&document, Query::collection("c").and_where("price", WhereOp::Eq, Decimal128::from_bytes([2; 16]))));
        assert!(!matches(&document, Query::collection("c").and_where("price", WhereOp::Eq, Bson::Null)));
        assert!(!matches(&document, Query::collection("c").and_where("price", WhereOp::Gt, price)));
        assert!(matches(
            &document,
            Query::collection("c").and_where("stamp", WhereOp::Lt, Timestamp { time: 10, increment: 2 })
        ));
    }

    #[test]
    fn mixed_types_never_order() {
        let document = doc! { "age": "30" };

        assert!(!matches(&document, Query::collection("c").and_where("age", WhereOp::Lt, 100)));
        assert!(!matches(&document, Query::collection("c").and_where("age", WhereOp::Gt, 0)));
    }

    #[test]
    fn missing_fields_match_nothing() {
        let document = doc! { "name": "Alice" };

        assert!(!matches(&document, Query::collection("c").and_where("age", WhereOp::Ne, 30)));
        assert!(!matches(&document, Query::collection("c").and_where("age", WhereOp::NotIn, vec![30])));
    }

    #[test]
    fn dotted_paths_reach_nested_fields() {
        let document = doc! { "address": { "city": "Anytown", "geo": { "zip": "12345" } } };

        assert!(matches(&document, Query::collection("c").and_where("address.city", WhereOp::Eq, "Anytown")));
        assert!(matches(&document, Query::collection("c").and_where("address.geo.zip", WhereOp::Eq, "12345")));
        assert!(!matches(&document, Query::collection("c").and_where("address.city.name", WhereOp::Eq, "Anytown")));
    }

    #[test]
    fn array_membership() {
        let document = doc! { "tags": ["a", "b"] };

        assert!(matches(&document, Query::collection("c").and_where("tags", WhereOp::ArrayContains, "b")));
        assert!(matches(&document, Query::collection("c").and_where("tags", WhereOp::ArrayContainsAny, vec!["x", "a"])));
        assert!(!matches(&document, Query::collection("c").and_where("tags", WhereOp::ArrayContainsAny, vec!["x"])));
    }

    #[test]
    fn document_id_conditions_use_the_identifier() {
        let id = Uuid::new();
        let document = doc! {};
        let query = Query::collection("c").and_where(FieldPath::DocumentId, WhereOp::Eq, id);

        assert!(DocumentEvaluator::new(id, &document).evaluate(&query).unwrap());
        assert!(!DocumentEvaluator::new(Uuid::new(), &document).evaluate(&query).unwrap());
    }

    #[test]
    fn in_requires_an_array() {
        let document = doc! { "age": 30 };
        let query = Query::collection("c").and_where("age", WhereOp::In, 30);

        assert!(DocumentEvaluator::new(Uuid::new(), &document).evaluate(&query).is_err());
    }
}
