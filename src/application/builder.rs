use crate::domain::errors::EnqueueError;
use crate::domain::models::{TransactionRecord, TransactionType, RIPPLE_EPOCH_OFFSET};

/// Minimum escrow lock duration accepted from callers, in seconds.
pub const MIN_LOCK_SECONDS: u64 = 30;

/// Converts a Unix timestamp to seconds since the ledger epoch.
pub fn ripple_time(unix_secs: i64) -> u32 {
    (unix_secs - RIPPLE_EPOCH_OFFSET).max(0) as u32
}

/// Builds ledger-native escrow transactions from validated intents.
///
/// Validation is synchronous and runs before any network round trip, so
/// callers can surface errors immediately and nothing half-validated
/// ever reaches the queue.
#[derive(Clone, Copy, Debug)]
pub struct TransactionBuilder {
    fee_drops: u64,
    owner_reserve_drops: u64,
}

impl TransactionBuilder {
    pub fn new(fee_drops: u64, owner_reserve_drops: u64) -> Self {
        Self {
            fee_drops,
            owner_reserve_drops,
        }
    }

    pub fn fee_drops(&self) -> u64 {
        self.fee_drops
    }

    /// Builds a self-escrow create: funds lock until `lock_seconds` from
    /// `now_unix`, with the cancel window opening one second after the
    /// finish window.
    ///
    /// `available_drops` is the spendable balance already net of
    /// reserves and pending queued debits; the new escrow must leave
    /// room for its own owner reserve on top of amount and fee.
    pub fn escrow_create(
        &self,
        account: &str,
        amount_drops: u64,
        lock_seconds: u64,
        now_unix: i64,
        available_drops: u64,
    ) -> Result<TransactionRecord, EnqueueError> {
        if amount_drops == 0 {
            return Err(EnqueueError::InvalidAmount("0".to_owned()));
        }
        if lock_seconds < MIN_LOCK_SECONDS {
            return Err(EnqueueError::InvalidDuration(lock_seconds));
        }
        let required = amount_drops.saturating_add(self.fee_drops);
        let spendable = available_drops.saturating_sub(self.owner_reserve_drops);
        if required > spendable {
            return Err(EnqueueError::InsufficientFunds {
                required,
                available: spendable,
            });
        }

        let lock_seconds_u32 = u32::try_from(lock_seconds).unwrap_or(u32::MAX);
        let cancel_after = ripple_time(now_unix).saturating_add(lock_seconds_u32);
        let finish_after = cancel_after - 1;

        Ok(TransactionRecord {
            transaction_type: TransactionType::EscrowCreate,
            account: account.to_owned(),
            amount: Some(amount_drops.to_string()),
            destination: Some(account.to_owned()),
            finish_after: Some(finish_after),
            cancel_after: Some(cancel_after),
            ..Default::default()
        })
    }

    /// Builds a cancel for an escrow this account created earlier,
    /// identified by the sequence number of its create transaction.
    pub fn escrow_cancel(
        &self,
        account: &str,
        offer_sequence: u32,
        available_drops: u64,
    ) -> Result<TransactionRecord, EnqueueError> {
        if offer_sequence == 0 {
            return Err(EnqueueError::InvalidSequence);
        }
        if self.fee_drops > available_drops {
            return Err(EnqueueError::InsufficientFunds {
                required: self.fee_drops,
                available: available_drops,
            });
        }

        Ok(TransactionRecord {
            transaction_type: TransactionType::EscrowCancel,
            account: account.to_owned(),
            owner: Some(account.to_owned()),
            offer_sequence: Some(offer_sequence),
            ..Default::default()
        })
    }
}
