//! Structured outcomes of delete and update operations.
//!
//! Batch writes never return commit failures as errors. They report them
//! through `acknowledged = false` in these values instead.

use serde::{Deserialize, Serialize};

/// Outcome of `find_by_id_and_delete` and `delete_many`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// `false` when the store rejected the write.
    pub acknowledged: bool,
    /// Number of documents removed.
    pub deleted_count: usize,
}

impl DeleteResult {
    pub fn acknowledged(deleted_count: usize) -> Self {
        Self { acknowledged: true, deleted_count }
    }

    pub fn failed() -> Self {
        Self { acknowledged: false, deleted_count: 0 }
    }
}

/// Outcome of `update_one` and `update_many`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    /// `false` when the store rejected the batch.
    pub acknowledged: bool,
    /// Number of documents written. Zero when not acknowledged.
    pub modified_count: usize,
    /// Number of documents the filter selected.
    pub matched_count: usize,
}

impl UpdateResult {
    pub fn acknowledged(matched_count: usize) -> Self {
        Self { acknowledged: true, modified_count: matched_count, matched_count }
    }

    pub fn failed(matched_count: usize) -> Self {
        Self { acknowledged: false, modified_count: 0, matched_count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_serialize_in_camel_case() {
        let value = serde_json::to_value(UpdateResult::failed(3)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "acknowledged": false, "modifiedCount": 0, "matchedCount": 3 })
        );
        assert_eq!(DeleteResult::acknowledged(2).deleted_count, 2);
    }
}
