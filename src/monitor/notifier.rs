use std::sync::Arc;

use serde::Serialize;

use crate::bus::event_types::EVENT_ALERT_THRESHOLD;
use crate::bus::EventBus;
use crate::feed::QuakeEvent;

/// Threshold alert for one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuakeAlert {
    pub event_id: String,
    pub magnitude: f64,
    pub place: String,
    pub time: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub url: String,
    pub threshold: f64,
    /// True when the triggering snapshot was served from cache.
    pub from_cache: bool,
}

impl QuakeAlert {
    pub fn new(event: &QuakeEvent, threshold: f64, from_cache: bool) -> Self {
        Self {
            event_id: event.id.clone(),
            magnitude: event.magnitude,
            place: event.place.clone(),
            time: event.time,
            latitude: event.latitude,
            longitude: event.longitude,
            url: event.url.clone(),
            threshold,
            from_cache,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Platform notification capability.
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: &QuakeAlert) -> Result<(), NotifyError>;
}

/// Delivers alerts as `alert.threshold` events on the bus.
pub struct BusNotifier {
    bus: Arc<EventBus>,
}

impl BusNotifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl Notifier for BusNotifier {
    fn notify(&self, alert: &QuakeAlert) -> Result<(), NotifyError> {
        let payload = serde_json::to_value(alert)
            .map_err(|error| NotifyError::Delivery(error.to_string()))?;
        self.bus.emit(EVENT_ALERT_THRESHOLD, payload);
        tracing::info!(
            "M{:.1} alert: {} ({})",
            alert.magnitude,
            alert.place,
            alert.event_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::quake;

    #[tokio::test]
    async fn bus_notifier_publishes_alert_payload() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe();
        let notifier = BusNotifier::new(bus.clone());

        let alert = QuakeAlert::new(&quake("us1", 5.5, 42, 1.0, 2.0), 4.0, false);
        notifier.notify(&alert).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, EVENT_ALERT_THRESHOLD);
        assert_eq!(event.payload["event_id"], "us1");
        assert_eq!(event.payload["magnitude"], 5.5);
        assert_eq!(event.payload["from_cache"], false);
    }
}
