use crate::domain::errors::LedgerClientError;
use crate::domain::models::{SubmitResult, TransactionRecord};
use serde_json::Value;

/// A trait representing the ledger RPC surface the queue depends on.
/// Connection lifecycle and transport live behind this seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LedgerClient {
    /// Cheap liveness check against the endpoint.
    async fn ensure_connected(&self) -> Result<(), LedgerClientError>;

    /// Index of the latest validated ledger.
    async fn validated_ledger_index(&self) -> Result<u32, LedgerClientError>;

    /// Account balance in drops, from the validated ledger.
    async fn account_balance(&self, account: &str) -> Result<u64, LedgerClientError>;

    /// Number of escrow objects currently owned by the account.
    async fn escrow_count(&self, account: &str) -> Result<usize, LedgerClientError>;

    /// Fills sequence and fee on a transaction that lacks them.
    async fn autofill(
        &self,
        record: TransactionRecord,
    ) -> Result<TransactionRecord, LedgerClientError>;

    /// Submits a signed blob and returns the structured engine result.
    async fn submit(&self, blob: &str) -> Result<SubmitResult, LedgerClientError>;

    /// Most recent transactions touching the account.
    async fn recent_transactions(
        &self,
        account: &str,
        limit: usize,
    ) -> Result<Vec<Value>, LedgerClientError>;
}
