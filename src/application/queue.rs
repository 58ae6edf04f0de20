use crate::application::report;
use crate::domain::errors::SubmissionError;
use crate::domain::models::{
    EntryKind, EntryStatus, EntrySummary, Outcome, QueueEntry, RecordedOutcome, Reporter,
    SubmitResult,
};
use crate::infrastructure::{
    ledger_client::LedgerClient, shutdown::Shutdown, wallet::WalletProvider,
};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use typed_builder::TypedBuilder;

/// Ledger-index headroom added to the validated index when stamping an
/// entry's expiry bound.
const DEFAULT_LEDGER_HORIZON: u32 = 100;

#[derive(Clone)]
struct Tracked {
    kind: EntryKind,
    description: String,
    target: String,
    status: EntryStatus,
}

#[derive(Default)]
struct QueueState {
    entries: Mutex<VecDeque<QueueEntry>>,
    draining: AtomicBool,
    next_id: AtomicU64,
    tracked: DashMap<u64, Tracked>,
}

/// Ordered, single-consumer submission queue for one account.
///
/// Entries are drained strictly FIFO by at most one worker task at a
/// time, so the account's transaction sequence numbers are issued in
/// order and never skipped. A rejected or expired entry is reported and
/// dropped; it never blocks the entries behind it.
#[derive(Clone, TypedBuilder)]
pub struct SubmissionQueue<C, W, R, S> {
    client: C,
    wallet: W,
    reporter: R,
    shutdown: S,
    #[builder(default = DEFAULT_LEDGER_HORIZON)]
    ledger_horizon: u32,
    #[builder(default, setter(skip))]
    state: Arc<QueueState>,
}

impl<C, W, R, S> SubmissionQueue<C, W, R, S>
where
    C: LedgerClient + Clone + Send + Sync + 'static,
    W: WalletProvider + Clone + Send + Sync + 'static,
    R: Reporter + Clone + Send + Sync + 'static,
    S: Shutdown + Clone + Send + Sync + 'static,
{
    /// Appends an entry and makes sure a drain worker is running.
    /// Never blocks; returns the assigned entry id.
    pub fn enqueue(&self, mut entry: QueueEntry) -> u64 {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        entry.id = id;
        self.state.tracked.insert(
            id,
            Tracked {
                kind: entry.kind,
                description: entry.description.clone(),
                target: entry.target.clone(),
                status: EntryStatus::Pending,
            },
        );
        self.state.entries.lock().unwrap().push_back(entry);
        self.ensure_drain();
        id
    }

    /// Removes a still-queued entry. Entries already picked up by the
    /// drain worker are past the point of cancellation and unaffected.
    pub fn remove(&self, id: u64) -> bool {
        let removed = {
            let mut entries = self.state.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            entries.len() != before
        };
        if removed {
            self.state.tracked.remove(&id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.state.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live entries (queued and in flight), oldest first.
    pub fn snapshot(&self) -> Vec<EntrySummary> {
        let mut live: Vec<EntrySummary> = self
            .state
            .tracked
            .iter()
            .filter(|tracked| !tracked.value().status.is_terminal())
            .map(|tracked| EntrySummary {
                id: *tracked.key(),
                kind: tracked.value().kind,
                description: tracked.value().description.clone(),
                target: tracked.value().target.clone(),
                status: tracked.value().status,
            })
            .collect();
        live.sort_by_key(|summary| summary.id);
        live
    }

    /// Total drops the queued entries will take out of the account:
    /// amount plus fee plus the owner reserve each new escrow consumes.
    pub fn pending_debit_drops(&self, fee_drops: u64, owner_reserve_drops: u64) -> u64 {
        self.state
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|entry| match entry.kind {
                EntryKind::EscrowCreate => entry
                    .amount_drops()
                    .saturating_add(fee_drops)
                    .saturating_add(owner_reserve_drops),
                EntryKind::EscrowCancel => fee_drops,
            })
            .sum()
    }

    fn ensure_drain(&self) {
        if self
            .state
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let queue = self.clone();
            tokio::spawn(async move { queue.drain().await });
        }
    }

    /// The single drain worker. Runs until the queue is empty, then
    /// clears the in-progress flag; the compare-exchange in
    /// `ensure_drain` guarantees at most one worker is ever live.
    async fn drain(&self) {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            let entry = self.state.entries.lock().unwrap().pop_front();
            let Some(entry) = entry else {
                self.state.draining.store(false, Ordering::Release);
                // An enqueue may have appended between the empty pop and
                // the flag clear; re-arm instead of stranding that entry.
                let refill = !self.state.entries.lock().unwrap().is_empty()
                    && self
                        .state
                        .draining
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok();
                if refill {
                    continue;
                }
                break;
            };

            let delay = entry.delay;
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Received shutdown signal, stopping queue drain");
                    self.state.draining.store(false, Ordering::Release);
                    break;
                }
                _ = self.process_entry(entry) => {}
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn process_entry(&self, entry: QueueEntry) {
        let id = entry.id;
        let target = entry.target.clone();
        let description = entry.description.clone();
        self.set_status(id, EntryStatus::Signing);

        let (status, outcome) = match self.submit_entry(entry).await {
            Ok(result) => report::classify(&result, &description),
            Err(e) => {
                tracing::error!("entry {} failed before submission completed: {}", id, e);
                (
                    EntryStatus::Rejected,
                    Outcome::Failure {
                        reason: e.to_string(),
                    },
                )
            }
        };
        self.set_status(id, status);

        let recorded = RecordedOutcome {
            entry_id: id,
            target,
            description,
            outcome,
            recorded_at: Utc::now(),
        };
        if let Err(e) = self.reporter.report(recorded).await {
            tracing::error!("Failed to report outcome for entry {}: {:?}", id, e);
        }
    }

    /// Signs (unless pre-signed) and submits one entry. The expiry bound
    /// must be stamped before signing, so pre-signed blobs are submitted
    /// exactly as attached.
    async fn submit_entry(&self, mut entry: QueueEntry) -> Result<SubmitResult, SubmissionError> {
        let id = entry.id;
        let blob = match entry.signed_blob.take() {
            Some(blob) => blob,
            None => {
                let needs_bound = entry.needs_ledger_bound();
                let mut record = self.client.autofill(entry.record).await?;
                if needs_bound && record.last_ledger_sequence.is_none() {
                    let index = self.client.validated_ledger_index().await?;
                    record.last_ledger_sequence = Some(index + self.ledger_horizon);
                }
                self.wallet.sign(&record).await?
            }
        };

        self.set_status(id, EntryStatus::Submitted);
        Ok(self.client.submit(&blob).await?)
    }

    fn set_status(&self, id: u64, status: EntryStatus) {
        if let Some(mut tracked) = self.state.tracked.get_mut(&id) {
            tracked.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{LedgerClientError, ReporterError, WalletError};
    use crate::domain::models::{TransactionRecord, TransactionType};
    use crate::infrastructure::shutdown::ShutdownChannel;
    use serde_json::Value;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::broadcast;

    const ACCOUNT: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

    #[derive(Clone)]
    struct FakeLedger {
        engine_result: &'static str,
        fail_bound: bool,
        submit_sleep: Duration,
        submitted: Arc<Mutex<Vec<String>>>,
        inflight: Arc<AtomicUsize>,
        max_inflight: Arc<AtomicUsize>,
    }

    impl FakeLedger {
        fn new(engine_result: &'static str) -> Self {
            Self {
                engine_result,
                fail_bound: false,
                submit_sleep: Duration::from_millis(10),
                submitted: Arc::default(),
                inflight: Arc::default(),
                max_inflight: Arc::default(),
            }
        }

        fn submitted(&self) -> Vec<String> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl LedgerClient for FakeLedger {
        async fn ensure_connected(&self) -> Result<(), LedgerClientError> {
            Ok(())
        }

        async fn validated_ledger_index(&self) -> Result<u32, LedgerClientError> {
            if self.fail_bound {
                return Err(LedgerClientError::FailedToGetLedgerIndex(
                    "node unreachable".to_owned(),
                ));
            }
            Ok(1_000)
        }

        async fn account_balance(&self, _account: &str) -> Result<u64, LedgerClientError> {
            Ok(100_000_000)
        }

        async fn escrow_count(&self, _account: &str) -> Result<usize, LedgerClientError> {
            Ok(0)
        }

        async fn autofill(
            &self,
            mut record: TransactionRecord,
        ) -> Result<TransactionRecord, LedgerClientError> {
            record.sequence = Some(7);
            record.fee = Some("12".to_owned());
            Ok(record)
        }

        async fn submit(&self, blob: &str) -> Result<SubmitResult, LedgerClientError> {
            let live = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_inflight.fetch_max(live, Ordering::SeqCst);
            tokio::time::sleep(self.submit_sleep).await;
            self.inflight.fetch_sub(1, Ordering::SeqCst);
            self.submitted.lock().unwrap().push(blob.to_owned());
            Ok(SubmitResult {
                engine_result: Some(self.engine_result.to_owned()),
                engine_result_message: None,
                tx_hash: None,
            })
        }

        async fn recent_transactions(
            &self,
            _account: &str,
            _limit: usize,
        ) -> Result<Vec<Value>, LedgerClientError> {
            Ok(vec![])
        }
    }

    #[derive(Clone, Default)]
    struct FakeWallet {
        sign_calls: Arc<AtomicUsize>,
        signed: Arc<Mutex<Vec<TransactionRecord>>>,
    }

    #[async_trait::async_trait]
    impl WalletProvider for FakeWallet {
        fn address(&self) -> &str {
            ACCOUNT
        }

        async fn sign(&self, record: &TransactionRecord) -> Result<String, WalletError> {
            self.sign_calls.fetch_add(1, Ordering::SeqCst);
            self.signed.lock().unwrap().push(record.clone());
            Ok(format!(
                "blob-{}",
                record.amount.clone().unwrap_or_else(|| "cancel".to_owned())
            ))
        }
    }

    #[derive(Clone, Default)]
    struct FakeReporter {
        outcomes: Arc<Mutex<Vec<RecordedOutcome>>>,
    }

    impl FakeReporter {
        fn outcomes(&self) -> Vec<RecordedOutcome> {
            self.outcomes.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Reporter for FakeReporter {
        async fn report(&self, outcome: RecordedOutcome) -> Result<(), ReporterError> {
            self.outcomes.lock().unwrap().push(outcome);
            Ok(())
        }
    }

    fn queue(
        client: FakeLedger,
        wallet: FakeWallet,
        reporter: FakeReporter,
    ) -> SubmissionQueue<FakeLedger, FakeWallet, FakeReporter, ShutdownChannel> {
        let (shutdown, _) = broadcast::channel(1);
        SubmissionQueue::builder()
            .client(client)
            .wallet(wallet)
            .reporter(reporter)
            .shutdown(ShutdownChannel::new(shutdown))
            .build()
    }

    fn create_record(amount_drops: u64) -> TransactionRecord {
        TransactionRecord {
            transaction_type: TransactionType::EscrowCreate,
            account: ACCOUNT.to_owned(),
            amount: Some(amount_drops.to_string()),
            destination: Some(ACCOUNT.to_owned()),
            ..Default::default()
        }
    }

    fn entry(amount_drops: u64) -> QueueEntry {
        QueueEntry::new(
            EntryKind::EscrowCreate,
            create_record(amount_drops),
            format!("escrow create of {amount_drops} drops"),
            "escrow-create",
            Duration::ZERO,
        )
    }

    async fn wait_for_outcomes(reporter: &FakeReporter, count: usize) {
        for _ in 0..200 {
            if reporter.outcomes().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {count} outcomes");
    }

    #[tokio::test]
    async fn submits_in_enqueue_order() {
        let client = FakeLedger::new("tesSUCCESS");
        let reporter = FakeReporter::default();
        let queue = queue(client.clone(), FakeWallet::default(), reporter.clone());

        for blob in ["first", "second", "third"] {
            queue.enqueue(entry(1_000_000).with_signed_blob(blob));
        }
        wait_for_outcomes(&reporter, 3).await;

        assert_eq!(client.submitted(), vec!["first", "second", "third"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn drain_is_single_consumer() {
        let client = FakeLedger::new("tesSUCCESS");
        let reporter = FakeReporter::default();
        let queue = queue(client.clone(), FakeWallet::default(), reporter.clone());

        let mut ids = Vec::new();
        for i in 0..10 {
            ids.push(queue.enqueue(entry(1_000_000 + i).with_signed_blob(format!("blob-{i}"))));
        }
        wait_for_outcomes(&reporter, 10).await;

        assert_eq!(client.max_inflight.load(Ordering::SeqCst), 1);
        // ids are handed out in order and outcomes arrive in that order
        assert_eq!(ids, (1..=10).collect::<Vec<u64>>());
        let reported: Vec<u64> = reporter.outcomes().iter().map(|o| o.entry_id).collect();
        assert_eq!(reported, ids);
    }

    #[tokio::test]
    async fn enqueue_during_drain_reuses_the_worker() {
        let client = FakeLedger::new("tesSUCCESS");
        let reporter = FakeReporter::default();
        let queue = queue(client.clone(), FakeWallet::default(), reporter.clone());

        queue.enqueue(entry(1_000_000).with_signed_blob("first"));
        tokio::time::sleep(Duration::from_millis(2)).await;
        queue.enqueue(entry(2_000_000).with_signed_blob("second"));
        wait_for_outcomes(&reporter, 2).await;

        assert_eq!(client.submitted(), vec!["first", "second"]);
        assert_eq!(client.max_inflight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_bound_acquisition_terminates_only_that_entry() {
        let mut client = FakeLedger::new("tesSUCCESS");
        client.fail_bound = true;
        let reporter = FakeReporter::default();
        let queue = queue(client.clone(), FakeWallet::default(), reporter.clone());

        // first entry needs a fresh bound and fails to get one; the
        // second is pre-signed and must still go through
        queue.enqueue(entry(1_000_000));
        queue.enqueue(entry(2_000_000).with_signed_blob("presigned"));
        wait_for_outcomes(&reporter, 2).await;

        let outcomes = reporter.outcomes();
        assert!(matches!(outcomes[0].outcome, Outcome::Failure { .. }));
        assert!(matches!(outcomes[1].outcome, Outcome::Success { .. }));
        assert_eq!(client.submitted(), vec!["presigned"]);
    }

    #[tokio::test]
    async fn presigned_entries_skip_signing() {
        let client = FakeLedger::new("tesSUCCESS");
        let wallet = FakeWallet::default();
        let reporter = FakeReporter::default();
        let queue = queue(client.clone(), wallet.clone(), reporter.clone());

        queue.enqueue(entry(1_000_000).with_signed_blob("already-signed"));
        wait_for_outcomes(&reporter, 1).await;

        assert_eq!(wallet.sign_calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.submitted(), vec!["already-signed"]);
    }

    #[tokio::test]
    async fn unsigned_entries_are_autofilled_bounded_and_signed() {
        let client = FakeLedger::new("tesSUCCESS");
        let wallet = FakeWallet::default();
        let reporter = FakeReporter::default();
        let queue = queue(client.clone(), wallet.clone(), reporter.clone());

        queue.enqueue(entry(1_000_000));
        wait_for_outcomes(&reporter, 1).await;

        assert_eq!(wallet.sign_calls.load(Ordering::SeqCst), 1);
        let signed = wallet.signed.lock().unwrap().clone();
        assert_eq!(signed[0].sequence, Some(7));
        assert_eq!(signed[0].fee.as_deref(), Some("12"));
        // validated index 1000 plus the default horizon
        assert_eq!(signed[0].last_ledger_sequence, Some(1_100));
        assert_eq!(client.submitted(), vec!["blob-1000000"]);
    }

    #[tokio::test]
    async fn rejections_are_classified_not_retried() {
        let client = FakeLedger::new("tecNO_PERMISSION");
        let reporter = FakeReporter::default();
        let queue = queue(client.clone(), FakeWallet::default(), reporter.clone());

        queue.enqueue(entry(1_000_000).with_signed_blob("blob"));
        wait_for_outcomes(&reporter, 1).await;

        assert_eq!(reporter.outcomes()[0].outcome, Outcome::NotYetEligible);
        // exactly one submission: no automatic retry
        assert_eq!(client.submitted(), vec!["blob"]);
    }

    #[tokio::test]
    async fn queued_entries_can_be_removed_before_the_drain_reaches_them() {
        let client = FakeLedger::new("tesSUCCESS");
        let reporter = FakeReporter::default();
        let queue = queue(client.clone(), FakeWallet::default(), reporter.clone());

        // the drain task cannot run until this test yields
        let first = queue.enqueue(entry(1_000_000).with_signed_blob("first"));
        let _second = queue.enqueue(entry(2_000_000).with_signed_blob("second"));
        let third = queue.enqueue(entry(3_000_000).with_signed_blob("third"));

        assert!(queue.remove(third));
        assert!(!queue.remove(99));

        wait_for_outcomes(&reporter, 2).await;
        assert_eq!(client.submitted(), vec!["first", "second"]);
        assert!(!queue.remove(first));
        assert!(queue.snapshot().is_empty());
    }

    #[tokio::test]
    async fn pending_debits_cover_every_queued_entry() {
        let client = FakeLedger::new("tesSUCCESS");
        let reporter = FakeReporter::default();
        let queue = queue(client, FakeWallet::default(), reporter);

        queue.enqueue(entry(1_000_000).with_signed_blob("a"));
        queue.enqueue(entry(1_000_000).with_signed_blob("b"));
        let cancel = QueueEntry::new(
            EntryKind::EscrowCancel,
            TransactionRecord {
                transaction_type: TransactionType::EscrowCancel,
                account: ACCOUNT.to_owned(),
                owner: Some(ACCOUNT.to_owned()),
                offer_sequence: Some(5),
                ..Default::default()
            },
            "escrow cancel for sequence 5",
            "escrow-cancel",
            Duration::ZERO,
        );
        queue.enqueue(cancel);

        // still synchronous: the drain task has not had a chance to run
        let pending = queue.pending_debit_drops(12, 200_000);
        assert_eq!(pending, 2 * (1_000_000 + 12 + 200_000) + 12);
    }

    #[tokio::test]
    async fn statuses_progress_to_terminal() {
        let client = FakeLedger::new("tesSUCCESS");
        let reporter = FakeReporter::default();
        let queue = queue(client, FakeWallet::default(), reporter.clone());

        let id = queue.enqueue(entry(1_000_000).with_signed_blob("blob"));
        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(snapshot[0].status, EntryStatus::Pending);

        wait_for_outcomes(&reporter, 1).await;
        // terminal entries leave the live snapshot
        assert!(queue.snapshot().is_empty());
    }
}
