use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnqueueError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("lock duration too short: {0}s")]
    InvalidDuration(u64),
    #[error("escrow sequence must be a positive integer")]
    InvalidSequence,
    #[error("insufficient funds: {required} drops required, {available} drops available")]
    InsufficientFunds { required: u64, available: u64 },
    #[error("wallet address {derived} does not match account {expected}")]
    WalletMismatch { derived: String, expected: String },
    #[error("ledger request failed: {0}")]
    Ledger(#[from] LedgerClientError),
    #[error("wallet operation failed: {0}")]
    Wallet(#[from] WalletError),
}

#[derive(Error, Debug)]
pub enum LedgerClientError {
    #[error("failed to reach ledger endpoint: {0}")]
    FailedToConnect(String),
    #[error("account balance unavailable: {0}")]
    BalanceUnavailable(String),
    #[error("failed to fetch escrow objects: {0}")]
    FailedToGetEscrows(String),
    #[error("failed to fetch validated ledger index: {0}")]
    FailedToGetLedgerIndex(String),
    #[error("failed to autofill transaction: {0}")]
    FailedToAutofill(String),
    #[error("failed to submit transaction: {0}")]
    FailedToSubmit(String),
    #[error("failed to fetch account transactions: {0}")]
    FailedToGetTransactions(String),
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("failed to derive wallet: {0}")]
    FailedToDerive(String),
    #[error("failed to sign transaction: {0}")]
    FailedToSign(String),
}

/// Failure of an in-flight entry before a structured engine result was
/// obtained. Terminates that entry only; the drain loop moves on.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error(transparent)]
    Ledger(#[from] LedgerClientError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

#[derive(Error, Debug)]
pub enum OutcomeStoreError {
    #[error("failed to record outcome")]
    FailedToRecordOutcome,
    #[error("no outcome recorded for entry {0}")]
    OutcomeNotFound(u64),
}

#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("failed to report outcome")]
    FailedToReportOutcome,
}
