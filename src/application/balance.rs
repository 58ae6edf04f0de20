use crate::domain::errors::LedgerClientError;
use crate::infrastructure::ledger_client::LedgerClient;

/// Account reserve parameters, in drops.
#[derive(Clone, Copy, Debug)]
pub struct ReserveConfig {
    /// Minimum balance every funded account must keep.
    pub base_drops: u64,
    /// Additional reserve each owned ledger object consumes.
    pub owner_drops: u64,
}

impl Default for ReserveConfig {
    fn default() -> Self {
        Self {
            base_drops: 1_000_000,
            owner_drops: 200_000,
        }
    }
}

/// Computes how much of an account's balance is actually spendable.
#[derive(Clone)]
pub struct BalanceEstimator<C> {
    client: C,
    reserves: ReserveConfig,
}

impl<C> BalanceEstimator<C>
where
    C: LedgerClient + Send + Sync,
{
    pub fn new(client: C, reserves: ReserveConfig) -> Self {
        Self { client, reserves }
    }

    /// Spendable balance net of the base reserve, the owner reserve for
    /// every escrow the account already holds, and `pending_debit_drops`
    /// for entries queued but not yet submitted. Reserving for queued
    /// entries keeps back-to-back enqueues from overdrawing the account.
    pub async fn estimate_available(
        &self,
        account: &str,
        pending_debit_drops: u64,
    ) -> Result<u64, LedgerClientError> {
        let balance = self.client.account_balance(account).await?;
        let escrows = self.client.escrow_count(account).await? as u64;

        let reserved = self
            .reserves
            .base_drops
            .saturating_add(self.reserves.owner_drops.saturating_mul(escrows))
            .saturating_add(pending_debit_drops);

        Ok(balance.saturating_sub(reserved))
    }
}
