use std::sync::Arc;
use std::time::Duration;

use super::balance::{BalanceEstimator, ReserveConfig};
use super::builder::TransactionBuilder;
use super::queue::SubmissionQueue;
use crate::domain::errors::{EnqueueError, LedgerClientError, OutcomeStoreError};
use crate::domain::models::{
    drops_to_xrp, xrp_to_drops, CancelEscrow, CreateEscrow, EntryKind, EntrySummary, OutcomeStore,
    QueueEntry, RecordedOutcome, Reporter,
};
use crate::infrastructure::ledger_client::LedgerClient;
use crate::infrastructure::shutdown::ShutdownChannel;
use crate::infrastructure::wallet::WalletProvider;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast;

/// Runtime parameters for one queue session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Classic address the queue submits for.
    pub account: String,
    /// Fixed network fee assumed per transaction, in drops.
    pub fee_drops: u64,
    pub reserves: ReserveConfig,
    /// Default pause between consecutive submissions.
    pub submit_delay: Duration,
}

#[async_trait::async_trait]
pub trait Application {
    async fn queue_escrow_create(&self, intent: CreateEscrow) -> Result<u64, EnqueueError>;
    async fn queue_escrow_cancel(&self, intent: CancelEscrow) -> Result<u64, EnqueueError>;
    async fn queue_snapshot(&self) -> Vec<EntrySummary>;
    async fn remove_entry(&self, id: u64) -> bool;
    async fn outcomes(&self, day: Option<String>)
        -> Result<Vec<RecordedOutcome>, OutcomeStoreError>;
    async fn outcome(&self, entry_id: u64) -> Result<RecordedOutcome, OutcomeStoreError>;
    async fn recent_transactions(&self, limit: usize) -> Result<Vec<Value>, LedgerClientError>;
}

/// Owns the queue, the drain-in-progress discipline behind it, and the
/// collaborator handles for a single account session. All operations go
/// through here; there is no ambient shared state.
#[derive(Clone)]
pub struct App<C, W, R, O> {
    config: SessionConfig,
    client: C,
    wallet: W,
    outcomes: Arc<O>,
    estimator: BalanceEstimator<C>,
    builder: TransactionBuilder,
    queue: SubmissionQueue<C, W, R, ShutdownChannel>,
}

impl<C, W, R, O> App<C, W, R, O>
where
    C: LedgerClient + Clone + Send + Sync + 'static,
    W: WalletProvider + Clone + Send + Sync + 'static,
    R: Reporter + Clone + Send + Sync + 'static,
    O: OutcomeStore + Send + Sync,
{
    pub fn new(
        config: SessionConfig,
        client: C,
        wallet: W,
        reporter: R,
        outcomes: Arc<O>,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        let queue = SubmissionQueue::builder()
            .client(client.clone())
            .wallet(wallet.clone())
            .reporter(reporter)
            .shutdown(ShutdownChannel::new(shutdown))
            .build();
        let estimator = BalanceEstimator::new(client.clone(), config.reserves);
        let builder = TransactionBuilder::new(config.fee_drops, config.reserves.owner_drops);
        Self {
            config,
            client,
            wallet,
            outcomes,
            estimator,
            builder,
            queue,
        }
    }

    /// Spendable drops right now, with every queued entry's debit
    /// already reserved.
    async fn available_drops(&self) -> Result<u64, EnqueueError> {
        let pending = self
            .queue
            .pending_debit_drops(self.config.fee_drops, self.config.reserves.owner_drops);
        Ok(self
            .estimator
            .estimate_available(&self.config.account, pending)
            .await?)
    }

    /// The wallet must belong to the configured account; a mismatch
    /// aborts before anything reaches the queue.
    fn check_wallet(&self) -> Result<(), EnqueueError> {
        let derived = self.wallet.address();
        if derived != self.config.account {
            return Err(EnqueueError::WalletMismatch {
                derived: derived.to_owned(),
                expected: self.config.account.clone(),
            });
        }
        Ok(())
    }

    fn entry_delay(&self, delay_ms: Option<u64>) -> Duration {
        delay_ms
            .map(Duration::from_millis)
            .unwrap_or(self.config.submit_delay)
    }
}

#[async_trait::async_trait]
impl<C, W, R, O> Application for App<C, W, R, O>
where
    C: LedgerClient + Clone + Send + Sync + 'static,
    W: WalletProvider + Clone + Send + Sync + 'static,
    R: Reporter + Clone + Send + Sync + 'static,
    O: OutcomeStore + Send + Sync,
{
    async fn queue_escrow_create(&self, intent: CreateEscrow) -> Result<u64, EnqueueError> {
        tracing::info!(
            "Queueing escrow create of {} XRP for {}",
            intent.amount_xrp,
            self.config.account
        );
        self.client.ensure_connected().await?;
        self.check_wallet()?;

        let amount_drops = xrp_to_drops(&intent.amount_xrp)?;
        let available = self.available_drops().await?;
        let record = self.builder.escrow_create(
            &self.config.account,
            amount_drops,
            intent.lock_seconds,
            Utc::now().timestamp(),
            available,
        )?;

        let description = format!(
            "escrow create of {} XRP locked for {}s",
            drops_to_xrp(amount_drops),
            intent.lock_seconds
        );
        let entry = QueueEntry::new(
            EntryKind::EscrowCreate,
            record,
            description,
            "escrow-create",
            self.entry_delay(intent.delay_ms),
        );
        Ok(self.queue.enqueue(entry))
    }

    async fn queue_escrow_cancel(&self, intent: CancelEscrow) -> Result<u64, EnqueueError> {
        tracing::info!(
            "Queueing escrow cancel for sequence {} on {}",
            intent.offer_sequence,
            self.config.account
        );
        self.client.ensure_connected().await?;
        self.check_wallet()?;

        let available = self.available_drops().await?;
        let record =
            self.builder
                .escrow_cancel(&self.config.account, intent.offer_sequence, available)?;

        let description = format!("escrow cancel for sequence {}", intent.offer_sequence);
        let entry = QueueEntry::new(
            EntryKind::EscrowCancel,
            record,
            description,
            "escrow-cancel",
            self.entry_delay(intent.delay_ms),
        );
        Ok(self.queue.enqueue(entry))
    }

    async fn queue_snapshot(&self) -> Vec<EntrySummary> {
        self.queue.snapshot()
    }

    async fn remove_entry(&self, id: u64) -> bool {
        self.queue.remove(id)
    }

    async fn outcomes(
        &self,
        day: Option<String>,
    ) -> Result<Vec<RecordedOutcome>, OutcomeStoreError> {
        match day {
            Some(day) => self.outcomes.get_outcomes_by_day(day).await,
            None => self.outcomes.get_outcomes().await,
        }
    }

    async fn outcome(&self, entry_id: u64) -> Result<RecordedOutcome, OutcomeStoreError> {
        self.outcomes.get_outcome(entry_id).await
    }

    async fn recent_transactions(&self, limit: usize) -> Result<Vec<Value>, LedgerClientError> {
        self.client
            .recent_transactions(&self.config.account, limit)
            .await
    }
}
