use ledgerping::BatchResult;
use serde::{Deserialize, Serialize};

/// A batch result as stored in `ping_results`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResult {
    pub id: i64,
    /// Unix seconds the row was written
    pub created_at: i64,
    pub result: BatchResult,
}
