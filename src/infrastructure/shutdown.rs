use tokio::sync::broadcast;

/// Subscription point for the session-wide stop signal.
pub trait Shutdown {
    fn subscribe(&self) -> broadcast::Receiver<()>;
}

#[derive(Clone)]
pub struct ShutdownChannel {
    shutdown: broadcast::Sender<()>,
}

impl ShutdownChannel {
    pub fn new(shutdown: broadcast::Sender<()>) -> Self {
        Self { shutdown }
    }

    /// Signals every subscriber. Send errors only mean nobody is
    /// listening anymore, which is fine during teardown.
    pub fn notify(&self) {
        let _ = self.shutdown.send(());
    }
}

impl Shutdown for ShutdownChannel {
    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }
}
