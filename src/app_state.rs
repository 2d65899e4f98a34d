use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use crate::generator::FunnelGenerator;

#[derive(Clone)]
pub struct AppState {
    pub generator: FunnelGenerator,
    /// Timeout aplicado por la capa HTTP a cada generación (`None` = sin límite).
    pub request_timeout: Option<Duration>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl AppState {
    pub fn new(generator: FunnelGenerator, request_timeout: Option<Duration>) -> (Self, oneshot::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let state = Self {
            generator,
            request_timeout,
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_tx))),
        };
        (state, shutdown_rx)
    }
}
