use super::errors::{EnqueueError, OutcomeStoreError, ReporterError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Seconds between the Unix epoch and the ledger's native epoch
/// (2000-01-01T00:00:00Z).
pub const RIPPLE_EPOCH_OFFSET: i64 = 946_684_800;

/// Drops per XRP.
pub const DROPS_PER_XRP: u64 = 1_000_000;

/// Converts a decimal XRP amount into drops.
///
/// Rejects empty, signed, non-numeric, zero, and over-precise input
/// (more than six decimal places cannot be represented in drops).
pub fn xrp_to_drops(amount: &str) -> Result<u64, EnqueueError> {
    let invalid = || EnqueueError::InvalidAmount(amount.to_owned());
    let trimmed = amount.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') || trimmed.starts_with('+') {
        return Err(invalid());
    }
    let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if frac.len() > 6
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac_drops: u64 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<6}").parse().map_err(|_| invalid())?
    };
    let drops = whole
        .checked_mul(DROPS_PER_XRP)
        .and_then(|d| d.checked_add(frac_drops))
        .ok_or_else(invalid)?;
    if drops == 0 {
        return Err(invalid());
    }
    Ok(drops)
}

/// Formats drops as a decimal XRP amount for display.
pub fn drops_to_xrp(drops: u64) -> String {
    let whole = drops / DROPS_PER_XRP;
    let frac = drops % DROPS_PER_XRP;
    if frac == 0 {
        whole.to_string()
    } else {
        let frac = format!("{frac:06}");
        format!("{whole}.{}", frac.trim_end_matches('0'))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    #[default]
    EscrowCreate,
    EscrowCancel,
}

/// A ledger-native transaction payload. Immutable once built; owned
/// exclusively by its queue entry until submission completes.
///
/// Field names follow the ledger's transaction JSON format. Optional
/// fields absent from a given transaction type are skipped entirely.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "TransactionType")]
    pub transaction_type: TransactionType,
    #[serde(rename = "Account")]
    pub account: String,
    /// Escrowed amount in drops, as the ledger's string encoding.
    #[serde(rename = "Amount", skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(rename = "Destination", skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Ledger-epoch second after which the escrow may be finished.
    #[serde(rename = "FinishAfter", skip_serializing_if = "Option::is_none")]
    pub finish_after: Option<u32>,
    /// Ledger-epoch second after which the escrow may be cancelled.
    #[serde(rename = "CancelAfter", skip_serializing_if = "Option::is_none")]
    pub cancel_after: Option<u32>,
    #[serde(rename = "Owner", skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Sequence number of the transaction that created the escrow.
    #[serde(rename = "OfferSequence", skip_serializing_if = "Option::is_none")]
    pub offer_sequence: Option<u32>,
    #[serde(rename = "Sequence", skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    #[serde(rename = "Fee", skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    /// Validated-ledger index after which this transaction expires.
    #[serde(rename = "LastLedgerSequence", skip_serializing_if = "Option::is_none")]
    pub last_ledger_sequence: Option<u32>,
}

/// User intent to lock funds in a self-escrow.
#[derive(Clone, Debug, Deserialize)]
pub struct CreateEscrow {
    pub amount_xrp: String,
    pub lock_seconds: u64,
    /// Overrides the session's default inter-submission delay.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

/// User intent to cancel a previously created escrow.
#[derive(Clone, Debug, Deserialize)]
pub struct CancelEscrow {
    pub offer_sequence: u32,
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    EscrowCreate,
    EscrowCancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Signing,
    Submitted,
    Confirmed,
    Rejected,
    Expired,
}

impl EntryStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected | Self::Expired)
    }
}

/// One unit of queued work: a built transaction plus everything the
/// drain worker needs to sign, submit, and report it exactly once.
#[derive(Clone, Debug)]
pub struct QueueEntry {
    /// Assigned by the queue at enqueue time.
    pub id: u64,
    pub kind: EntryKind,
    pub record: TransactionRecord,
    pub description: String,
    /// Display identifier the presentation sink routes this entry under.
    pub target: String,
    /// Pause after this entry's submission before the next is processed.
    pub delay: Duration,
    /// Signing is skipped when a pre-signed blob is attached.
    pub signed_blob: Option<String>,
}

impl QueueEntry {
    pub fn new(
        kind: EntryKind,
        record: TransactionRecord,
        description: impl Into<String>,
        target: impl Into<String>,
        delay: Duration,
    ) -> Self {
        Self {
            id: 0,
            kind,
            record,
            description: description.into(),
            target: target.into(),
            delay,
            signed_blob: None,
        }
    }

    pub fn with_signed_blob(mut self, blob: impl Into<String>) -> Self {
        self.signed_blob = Some(blob.into());
        self
    }

    /// Whether this entry must carry an expiry bound when signed here.
    pub fn needs_ledger_bound(&self) -> bool {
        matches!(self.kind, EntryKind::EscrowCreate | EntryKind::EscrowCancel)
    }

    /// Drops this entry moves out of the account, excluding fees.
    pub fn amount_drops(&self) -> u64 {
        self.record
            .amount
            .as_deref()
            .and_then(|a| a.parse().ok())
            .unwrap_or(0)
    }
}

/// Queue view of an entry, rendered by the presentation sink.
#[derive(Clone, Debug, Serialize)]
pub struct EntrySummary {
    pub id: u64,
    pub kind: EntryKind,
    pub description: String,
    pub target: String,
    pub status: EntryStatus,
}

/// Structured response of a submission call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SubmitResult {
    #[serde(default)]
    pub engine_result: Option<String>,
    #[serde(default)]
    pub engine_result_message: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

/// Terminal outcome surfaced for one entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Success { description: String },
    /// The escrow exists but its unlock time has not passed yet.
    NotYetEligible,
    /// The escrow was already consumed or never existed.
    NotFound,
    Failure { reason: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordedOutcome {
    pub entry_id: u64,
    pub target: String,
    pub description: String,
    pub outcome: Outcome,
    pub recorded_at: DateTime<Utc>,
}

/// Sink for terminal submission outcomes.
#[async_trait::async_trait]
pub trait Reporter {
    async fn report(&self, outcome: RecordedOutcome) -> Result<(), ReporterError>;
}

/// Trait for outcome persistence and lookup.
#[async_trait::async_trait]
pub trait OutcomeStore {
    /// Records a terminal outcome. Recording the same entry twice is a no-op.
    async fn record_outcome(&self, outcome: RecordedOutcome) -> Result<(), OutcomeStoreError>;

    /// All recorded outcomes, oldest entry first.
    async fn get_outcomes(&self) -> Result<Vec<RecordedOutcome>, OutcomeStoreError>;

    /// The outcome recorded for a specific entry.
    async fn get_outcome(&self, entry_id: u64) -> Result<RecordedOutcome, OutcomeStoreError>;

    /// Outcomes recorded on a `%Y-%m-%d` day.
    async fn get_outcomes_by_day(&self, day: String)
        -> Result<Vec<RecordedOutcome>, OutcomeStoreError>;
}
