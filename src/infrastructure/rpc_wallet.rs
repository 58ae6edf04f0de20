use super::wallet::WalletProvider;
use crate::domain::errors::WalletError;
use crate::domain::models::TransactionRecord;
use serde_json::{json, Value};

/// Wallet backed by a node's `wallet_propose`/`sign` RPC methods, so no
/// key material is handled in-process beyond the seed itself.
#[derive(Clone)]
pub struct RpcWallet {
    http: reqwest::Client,
    endpoint: String,
    seed: String,
    address: String,
}

impl RpcWallet {
    /// Derives the wallet for `seed` and remembers its classic address.
    pub async fn derive(endpoint: &str, seed: &str) -> Result<Self, WalletError> {
        let http = reqwest::Client::new();
        let result = Self::request(
            &http,
            endpoint,
            json!({ "method": "wallet_propose", "params": [{ "seed": seed }] }),
        )
        .await
        .map_err(WalletError::FailedToDerive)?;
        let address = result
            .get("account_id")
            .and_then(Value::as_str)
            .ok_or_else(|| WalletError::FailedToDerive("missing account_id".to_owned()))?
            .to_owned();
        Ok(Self {
            http,
            endpoint: endpoint.to_owned(),
            seed: seed.to_owned(),
            address,
        })
    }

    async fn request(
        http: &reqwest::Client,
        endpoint: &str,
        body: Value,
    ) -> Result<Value, String> {
        let payload: Value = http
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;
        let result = payload.get("result").cloned().unwrap_or(payload);
        if result.get("status").and_then(Value::as_str) == Some("error") {
            let reason = result
                .get("error_message")
                .and_then(Value::as_str)
                .or_else(|| result.get("error").and_then(Value::as_str))
                .unwrap_or("unknown wallet error");
            return Err(reason.to_owned());
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl WalletProvider for RpcWallet {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, record: &TransactionRecord) -> Result<String, WalletError> {
        let body = json!({
            "method": "sign",
            "params": [{ "tx_json": record, "secret": self.seed }],
        });
        let result = Self::request(&self.http, &self.endpoint, body)
            .await
            .map_err(WalletError::FailedToSign)?;
        result
            .get("tx_blob")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| WalletError::FailedToSign("missing tx_blob".to_owned()))
    }
}
