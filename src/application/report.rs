use crate::domain::models::{EntryStatus, Outcome, SubmitResult};

/// Engine result classes the queue distinguishes. Anything else is
/// carried through verbatim as `Other`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineResult {
    Success,
    NoPermission,
    NoEntry,
    NoTarget,
    MaxLedgerPassed,
    Other(String),
}

impl EngineResult {
    const KNOWN_CODES: [&'static str; 5] = [
        "tesSUCCESS",
        "tecNO_PERMISSION",
        "tecNO_ENTRY",
        "tecNO_TARGET",
        "tefMAX_LEDGER",
    ];

    /// Parses the canonical result-code name reported by the ledger.
    pub fn from_code(code: &str) -> Self {
        match code {
            "tesSUCCESS" => Self::Success,
            "tecNO_PERMISSION" => Self::NoPermission,
            "tecNO_ENTRY" => Self::NoEntry,
            "tecNO_TARGET" => Self::NoTarget,
            "tefMAX_LEDGER" => Self::MaxLedgerPassed,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Compatibility shim for servers that omit the structured code
    /// field: scans the human-readable message for a known code name.
    fn from_message(message: &str) -> Option<Self> {
        Self::KNOWN_CODES
            .into_iter()
            .find(|code| message.contains(code))
            .map(Self::from_code)
    }
}

/// Maps a submission result to the entry's terminal status and the
/// outcome surfaced to the presentation sink.
pub fn classify(result: &SubmitResult, description: &str) -> (EntryStatus, Outcome) {
    let engine = result
        .engine_result
        .as_deref()
        .map(EngineResult::from_code)
        .or_else(|| {
            result
                .engine_result_message
                .as_deref()
                .and_then(EngineResult::from_message)
        });

    match engine {
        Some(EngineResult::Success) => (
            EntryStatus::Confirmed,
            Outcome::Success {
                description: description.to_owned(),
            },
        ),
        Some(EngineResult::NoPermission) => (EntryStatus::Rejected, Outcome::NotYetEligible),
        Some(EngineResult::NoEntry) | Some(EngineResult::NoTarget) => {
            (EntryStatus::Rejected, Outcome::NotFound)
        }
        Some(EngineResult::MaxLedgerPassed) => (
            EntryStatus::Expired,
            Outcome::Failure {
                reason: "transaction expired before validation".to_owned(),
            },
        ),
        Some(EngineResult::Other(code)) => {
            let reason = match result.engine_result_message.as_deref() {
                Some(message) => format!("{code}: {message}"),
                None => code,
            };
            (EntryStatus::Rejected, Outcome::Failure { reason })
        }
        None => (
            EntryStatus::Rejected,
            Outcome::Failure {
                reason: "submission returned no result code".to_owned(),
            },
        ),
    }
}
