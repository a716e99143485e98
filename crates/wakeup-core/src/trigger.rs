//! Matches clock ticks against the alarm registry.
//!
//! Resolution is one minute: an alarm fires when its `HH:MM` equals the
//! current local minute. A minute missed entirely (suspended tab, sleeping
//! laptop) is not fired retroactively.

use crate::alarm::{AlarmRecord, AlarmRegistry, ClockTime};

#[derive(Debug, Default, Clone, Copy)]
pub struct TriggerEngine;

impl TriggerEngine {
    pub fn new() -> Self {
        Self
    }

    /// Check every enabled alarm against `now`.
    ///
    /// Returns at most one alarm to start ringing. While another alarm is
    /// `busy` (or once one has been picked this tick) further matches are
    /// dropped without setting their fired flag, so they get another chance
    /// on the next tick within the same minute.
    pub fn check(&self, registry: &mut AlarmRegistry, now: ClockTime, busy: bool) -> Option<AlarmRecord> {
        let mut busy = busy;
        let mut fired = None;

        for alarm in registry.iter_mut().filter(|a| a.enabled) {
            if alarm.time != now {
                alarm.fired_this_minute = false;
                continue;
            }
            if alarm.fired_this_minute {
                continue;
            }
            if busy {
                tracing::debug!(alarm_id = %alarm.id, "alarm matched while another is active; dropped");
                continue;
            }
            alarm.fired_this_minute = true;
            busy = true;
            fired = Some(alarm.clone());
        }

        fired
    }
}
