use crate::domain::errors::WalletError;
use crate::domain::models::TransactionRecord;

/// Key-management seam. Derivation and signing stay outside the queue
/// core; implementations delegate to a wallet library or a signing
/// endpoint.
#[async_trait::async_trait]
pub trait WalletProvider {
    /// Classic address derived for this wallet.
    fn address(&self) -> &str;

    /// Signs a prepared transaction, returning the hex blob.
    async fn sign(&self, record: &TransactionRecord) -> Result<String, WalletError>;

    /// Structural validity check for a classic address. Checksum
    /// verification is left to the ledger itself.
    fn is_valid_address(&self, address: &str) -> bool {
        let mut chars = address.chars();
        chars.next() == Some('r')
            && (25..=35).contains(&address.len())
            && chars.all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'))
    }
}
