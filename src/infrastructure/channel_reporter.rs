use crate::domain::{
    errors::ReporterError,
    models::{OutcomeStore, RecordedOutcome, Reporter},
};
use std::{marker::PhantomData, sync::Arc};
use tokio::sync::mpsc;

use super::shutdown::Shutdown;

/// Reporter that decouples the drain worker from outcome persistence:
/// outcomes are pushed onto a channel and stored by a listener task.
#[derive(Clone)]
pub struct ChannelReporter<O, S> {
    outcomes: mpsc::Sender<RecordedOutcome>,
    _store: PhantomData<O>,
    _shutdown: PhantomData<S>,
}

impl<O, S> ChannelReporter<O, S>
where
    O: OutcomeStore + Send + Sync + 'static,
    S: Shutdown + Send + Sync + 'static,
{
    pub fn new(store: Arc<O>, shutdown: S) -> Self {
        let (tx_outcomes, rx_outcomes) = mpsc::channel(100);

        listen_for_outcomes(rx_outcomes, store, shutdown);

        Self {
            outcomes: tx_outcomes,
            _store: PhantomData,
            _shutdown: PhantomData,
        }
    }
}

fn listen_for_outcomes<O, S>(
    mut rx_outcomes: mpsc::Receiver<RecordedOutcome>,
    store: Arc<O>,
    shutdown: S,
) where
    O: OutcomeStore + Send + Sync + 'static,
    S: Shutdown + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut shutdown_recv = shutdown.subscribe();
        loop {
            tokio::select! {
                _ = shutdown_recv.recv() => {
                    tracing::info!("Received shutdown signal, stopping outcome listener");
                    break;
                }
                Some(outcome) = rx_outcomes.recv() => {
                    tracing::info!(
                        "entry {} [{}] finished: {:?}",
                        outcome.entry_id,
                        outcome.target,
                        outcome.outcome
                    );
                    if let Err(e) = store.record_outcome(outcome).await {
                        tracing::error!("Failed to record outcome: {:?}", e);
                    }
                }
            }
        }
    });
}

#[async_trait::async_trait]
impl<O, S> Reporter for ChannelReporter<O, S>
where
    O: OutcomeStore + Send + Sync + 'static,
    S: Shutdown + Send + Sync + 'static,
{
    async fn report(&self, outcome: RecordedOutcome) -> Result<(), ReporterError> {
        self.outcomes
            .send(outcome)
            .await
            .map_err(|_| ReporterError::FailedToReportOutcome)
    }
}
