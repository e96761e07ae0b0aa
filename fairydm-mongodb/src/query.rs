//! Query translation from native store queries to MongoDB filter syntax.
//!
//! Conditions become one filter document each and are joined with `$and`.
//! `!=` and `not-in` also require the field to exist, so a document lacking
//! the field never matches, as on the other backends.

use bson::{Bson, Document, doc};

use fairydm_core::{
    error::DocumentStoreError,
    query::{FieldPath, Query, QueryVisitor, WhereOp},
};

fn field_name(path: &FieldPath) -> String {
    match path {
        FieldPath::Field(path) => path.clone(),
        FieldPath::DocumentId => "_id".to_string(),
    }
}

fn array_operand(op: WhereOp, value: &Bson) -> Result<Vec<Bson>, DocumentStoreError> {
    match value {
        Bson::Array(values) => Ok(values.clone()),
        other => Err(DocumentStoreError::Backend(format!(
            "'{op}' requires an array value, got {other}"
        ))),
    }
}

/// Translates queries into MongoDB filter documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    pub fn translate(&mut self, query: &Query) -> Result<Document, DocumentStoreError> {
        let mut clauses = self.visit_conditions(query)?;

        Ok(match clauses.len() {
            0 => doc! {},
            1 => clauses.remove(0),
            _ => doc! { "$and": clauses },
        })
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_condition(&mut self, path: &FieldPath, op: WhereOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field_name(path): match op {
                // `$eq` on a scalar also matches arrays holding it.
                WhereOp::Eq => doc! { "$eq": value.clone() },
                WhereOp::Ne => doc! { "$exists": true, "$ne": value.clone() },
                WhereOp::Gt => doc! { "$gt": value.clone() },
                WhereOp::Gte => doc! { "$gte": value.clone() },
                WhereOp::Lt => doc! { "$lt": value.clone() },
                WhereOp::Lte => doc! { "$lte": value.clone() },
                WhereOp::In => doc! { "$in": array_operand(op, value)? },
                WhereOp::NotIn => doc! { "$exists": true, "$nin": array_operand(op, value)? },
                WhereOp::ArrayContains => doc! { "$elemMatch": { "$eq": value.clone() } },
                WhereOp::ArrayContainsAny => doc! { "$elemMatch": { "$in": array_operand(op, value)? } },
            }
        })
    }
}
