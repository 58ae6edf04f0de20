pub mod channel_reporter;
pub mod ledger_client;
pub mod memory;
pub mod rpc_client;
pub mod rpc_wallet;
pub mod shutdown;
pub mod wallet;
