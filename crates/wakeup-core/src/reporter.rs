//! Fire-and-forget statistics reporting.
//!
//! Reports never block the alarm flow and their failures are only logged.

use tokio::task::JoinHandle;

use crate::api::AlarmApi;
use crate::events::StatisticsEvent;

#[derive(Debug)]
pub struct EventReporter<A> {
    api: A,
    pending: Vec<JoinHandle<()>>,
}

impl<A: AlarmApi> EventReporter<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            pending: Vec::new(),
        }
    }

    /// Send `event` in the background. Must be called inside a tokio runtime.
    pub fn report(&mut self, event: StatisticsEvent) {
        self.pending.retain(|handle| !handle.is_finished());
        let api = self.api.clone();
        self.pending.push(tokio::spawn(async move {
            match api.record_event(&event).await {
                Ok(()) => {
                    tracing::debug!(alarm_id = %event.alarm_id, event = event.event.as_str(), "event reported")
                }
                Err(e) => tracing::warn!(
                    alarm_id = %event.alarm_id,
                    event = event.event.as_str(),
                    "failed to report event: {e}"
                ),
            }
        }));
    }

    /// Reports still in flight.
    pub fn in_flight(&self) -> usize {
        self.pending.iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait for every report sent so far.
    pub async fn flush(&mut self) {
        for handle in self.pending.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!("event report task failed: {e}");
            }
        }
    }
}
