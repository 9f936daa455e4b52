//! Application state.

use std::sync::Arc;

use camwatch_detector::{DetectorConfig, DetectorResult, StreamSupervisor};

use crate::config::ApiConfig;
use crate::hub::EventHub;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub supervisor: Arc<StreamSupervisor>,
    pub hub: EventHub,
}

impl AppState {
    /// Plan record tasks and wire the supervisor to the event hub.
    pub async fn new(config: ApiConfig, detector: DetectorConfig) -> DetectorResult<Self> {
        let hub = EventHub::new(config.event_log_capacity, detector.static_root.clone());
        let supervisor = StreamSupervisor::new(detector, Arc::new(hub.clone())).await?;

        Ok(Self {
            config,
            supervisor: Arc::new(supervisor),
            hub,
        })
    }
}
