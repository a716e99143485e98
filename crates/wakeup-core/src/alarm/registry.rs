//! In-memory alarm set.
//!
//! All operations are synchronous over local state. Persisting changes to the
//! server is the caller's concern and is best-effort.

use std::collections::BTreeMap;

use super::record::{AlarmId, AlarmRecord};
use super::time::ClockTime;

/// A local time override left by a snooze: `(server time, snoozed time)`.
type Override = (ClockTime, ClockTime);

#[derive(Debug, Clone, Default)]
pub struct AlarmRegistry {
    alarms: Vec<AlarmRecord>,
    snoozed: BTreeMap<AlarmId, Override>,
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set, resetting every `fired_this_minute` flag.
    pub fn load(&mut self, records: Vec<AlarmRecord>) {
        self.snoozed.clear();
        self.alarms = records
            .into_iter()
            .map(|mut r| {
                r.fired_this_minute = false;
                r
            })
            .collect();
    }

    /// Merge a fresh server listing into the local set.
    ///
    /// Alarms gone from the server are dropped and new ones added. Alarms
    /// already known keep their `fired_this_minute` flag, and a snoozed
    /// alarm keeps its snoozed time until its server time changes.
    /// Returns `true` if anything the user can see changed.
    pub fn sync(&mut self, records: Vec<AlarmRecord>) -> bool {
        let mut snoozed = BTreeMap::new();
        let merged: Vec<AlarmRecord> = records
            .into_iter()
            .map(|mut record| {
                record.fired_this_minute = false;
                if let Some(&(server_time, local_time)) = self.snoozed.get(&record.id) {
                    if server_time == record.time {
                        snoozed.insert(record.id.clone(), (server_time, local_time));
                        record.time = local_time;
                    }
                }
                if let Some(known) = self.get(&record.id) {
                    record.fired_this_minute = known.fired_this_minute;
                }
                record
            })
            .collect();

        let changed = merged != self.alarms;
        self.alarms = merged;
        self.snoozed = snoozed;
        changed
    }

    /// Insert a record, replacing any existing one with the same id.
    pub fn add(&mut self, mut record: AlarmRecord) {
        self.snoozed.remove(&record.id);
        record.fired_this_minute = false;
        match self.alarms.iter_mut().find(|a| a.id == record.id) {
            Some(existing) => *existing = record,
            None => self.alarms.push(record),
        }
    }

    pub fn remove(&mut self, id: &AlarmId) -> Option<AlarmRecord> {
        self.snoozed.remove(id);
        let pos = self.alarms.iter().position(|a| &a.id == id)?;
        Some(self.alarms.remove(pos))
    }

    /// Move an alarm to a new time and make it eligible to fire again.
    ///
    /// Returns `false` if the alarm is no longer in the registry.
    pub fn reschedule(&mut self, id: &AlarmId, time: ClockTime) -> bool {
        let Some(alarm) = self.alarms.iter_mut().find(|a| &a.id == id) else {
            return false;
        };
        let server_time = self.snoozed.get(id).map_or(alarm.time, |&(server, _)| server);
        self.snoozed.insert(id.clone(), (server_time, time));
        alarm.time = time;
        alarm.fired_this_minute = false;
        true
    }

    pub fn set_enabled(&mut self, id: &AlarmId, enabled: bool) -> bool {
        match self.get_mut(id) {
            Some(alarm) => {
                alarm.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &AlarmId) -> Option<&AlarmRecord> {
        self.alarms.iter().find(|a| &a.id == id)
    }

    pub fn get_mut(&mut self, id: &AlarmId) -> Option<&mut AlarmRecord> {
        self.alarms.iter_mut().find(|a| &a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlarmRecord> {
        self.alarms.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut AlarmRecord> {
        self.alarms.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }
}
