//! Alarm server contract.
//!
//! Every server interaction the client needs goes through [`AlarmApi`] so the
//! controller can run against [`HttpApi`] in production and an in-memory fake
//! in tests.

mod client;
mod wire;

use std::future::Future;

pub use client::{HttpApi, DEFAULT_TIMEOUT};
pub use wire::{error_message, parse_alarm, parse_alarm_list, parse_sound_list, SoundEntry, Statistics};

use crate::alarm::{AlarmId, AlarmRecord, ChallengeType, NewAlarm};
use crate::challenge::ChallengeRecord;
use crate::error::ApiError;
use crate::events::StatisticsEvent;

/// Remote alarm store, challenge generator and statistics sink.
///
/// Handles are cheap to clone; the controller clones one into each spawned
/// request task.
pub trait AlarmApi: Clone + Send + Sync + 'static {
    fn list_alarms(&self) -> impl Future<Output = Result<Vec<AlarmRecord>, ApiError>> + Send;

    /// Returns the stored record, carrying the server-assigned id.
    fn create_alarm(
        &self,
        alarm: &NewAlarm,
    ) -> impl Future<Output = Result<AlarmRecord, ApiError>> + Send;

    fn delete_alarm(&self, id: &AlarmId) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Flip the enabled flag server-side. Returns the new value.
    fn toggle_alarm(&self, id: &AlarmId) -> impl Future<Output = Result<bool, ApiError>> + Send;

    fn fetch_challenge(
        &self,
        challenge_type: ChallengeType,
    ) -> impl Future<Output = Result<ChallengeRecord, ApiError>> + Send;

    fn record_event(
        &self,
        event: &StatisticsEvent,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn statistics(&self) -> impl Future<Output = Result<Statistics, ApiError>> + Send;

    fn list_sounds(&self) -> impl Future<Output = Result<Vec<SoundEntry>, ApiError>> + Send;
}
