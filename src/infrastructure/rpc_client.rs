use super::ledger_client::LedgerClient;
use crate::domain::errors::LedgerClientError;
use crate::domain::models::{SubmitResult, TransactionRecord};
use serde_json::{json, Value};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};

/// JSON-RPC client for an XRP Ledger HTTP endpoint.
#[derive(Clone)]
pub struct RpcLedgerClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RpcLedgerClient {
    /// Creates a new `RpcLedgerClient` for the given JSON-RPC URL.
    pub fn from_url(endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.to_owned(),
        }
    }

    fn retry_strategy() -> impl Iterator<Item = std::time::Duration> {
        ExponentialBackoff::from_millis(500).map(jitter).take(3)
    }

    /// One JSON-RPC command round trip, no retries.
    async fn call_once(&self, method: &str, params: Value) -> Result<Value, String> {
        let body = json!({ "method": method, "params": [params] });
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;
        let payload: Value = response.json().await.map_err(|e| e.to_string())?;
        Self::unwrap_result(payload)
    }

    /// Issues a read command, retrying transient failures with backoff.
    async fn call(&self, method: &str, params: Value) -> Result<Value, String> {
        Retry::spawn(Self::retry_strategy(), || {
            self.call_once(method, params.clone())
        })
        .await
    }

    fn unwrap_result(payload: Value) -> Result<Value, String> {
        let result = payload.get("result").cloned().unwrap_or(payload);
        if result.get("status").and_then(Value::as_str) == Some("error") {
            let reason = result
                .get("error_message")
                .and_then(Value::as_str)
                .or_else(|| result.get("error").and_then(Value::as_str))
                .unwrap_or("unknown ledger error");
            return Err(reason.to_owned());
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn ensure_connected(&self) -> Result<(), LedgerClientError> {
        self.call("ping", json!({}))
            .await
            .map(|_| ())
            .map_err(LedgerClientError::FailedToConnect)
    }

    async fn validated_ledger_index(&self) -> Result<u32, LedgerClientError> {
        let result = self
            .call("ledger", json!({ "ledger_index": "validated" }))
            .await
            .map_err(LedgerClientError::FailedToGetLedgerIndex)?;
        result
            .get("ledger_index")
            .and_then(Value::as_u64)
            .map(|index| index as u32)
            .ok_or_else(|| {
                LedgerClientError::FailedToGetLedgerIndex("missing ledger_index".to_owned())
            })
    }

    async fn account_balance(&self, account: &str) -> Result<u64, LedgerClientError> {
        let result = self
            .call(
                "account_info",
                json!({ "account": account, "ledger_index": "validated" }),
            )
            .await
            .map_err(LedgerClientError::BalanceUnavailable)?;
        result
            .pointer("/account_data/Balance")
            .and_then(Value::as_str)
            .and_then(|balance| balance.parse().ok())
            .ok_or_else(|| LedgerClientError::BalanceUnavailable("missing balance".to_owned()))
    }

    async fn escrow_count(&self, account: &str) -> Result<usize, LedgerClientError> {
        let result = self
            .call(
                "account_objects",
                json!({ "account": account, "type": "escrow", "ledger_index": "validated" }),
            )
            .await
            .map_err(LedgerClientError::FailedToGetEscrows)?;
        Ok(result
            .get("account_objects")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0))
    }

    async fn autofill(
        &self,
        mut record: TransactionRecord,
    ) -> Result<TransactionRecord, LedgerClientError> {
        if record.sequence.is_none() {
            let result = self
                .call(
                    "account_info",
                    json!({ "account": record.account, "ledger_index": "current" }),
                )
                .await
                .map_err(LedgerClientError::FailedToAutofill)?;
            let sequence = result
                .pointer("/account_data/Sequence")
                .and_then(Value::as_u64)
                .ok_or_else(|| {
                    LedgerClientError::FailedToAutofill("missing account sequence".to_owned())
                })?;
            record.sequence = Some(sequence as u32);
        }
        if record.fee.is_none() {
            let result = self
                .call("fee", json!({}))
                .await
                .map_err(LedgerClientError::FailedToAutofill)?;
            let fee = result
                .pointer("/drops/open_ledger_fee")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    LedgerClientError::FailedToAutofill("missing open ledger fee".to_owned())
                })?;
            record.fee = Some(fee.to_owned());
        }
        Ok(record)
    }

    async fn submit(&self, blob: &str) -> Result<SubmitResult, LedgerClientError> {
        // Submission is never retried here; the drain loop treats every
        // outcome as terminal for its entry.
        let result = self
            .call_once("submit", json!({ "tx_blob": blob }))
            .await
            .map_err(LedgerClientError::FailedToSubmit)?;
        Ok(SubmitResult {
            engine_result: result
                .get("engine_result")
                .and_then(Value::as_str)
                .map(str::to_owned),
            engine_result_message: result
                .get("engine_result_message")
                .and_then(Value::as_str)
                .map(str::to_owned),
            tx_hash: result
                .pointer("/tx_json/hash")
                .and_then(Value::as_str)
                .map(str::to_owned),
        })
    }

    async fn recent_transactions(
        &self,
        account: &str,
        limit: usize,
    ) -> Result<Vec<Value>, LedgerClientError> {
        let result = self
            .call(
                "account_tx",
                json!({
                    "account": account,
                    "limit": limit,
                    "ledger_index_min": -1,
                    "ledger_index_max": -1,
                }),
            )
            .await
            .map_err(LedgerClientError::FailedToGetTransactions)?;
        Ok(result
            .get("transactions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}
