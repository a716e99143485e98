//! `HH:MM` clock time used for alarm schedules.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// AM/PM marker for 12-hour form entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Meridiem {
    Am,
    Pm,
}

impl FromStr for Meridiem {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AM" => Ok(Meridiem::Am),
            "PM" => Ok(Meridiem::Pm),
            other => Err(ValidationError::InvalidValue {
                field: "ampm".into(),
                message: format!("expected AM or PM, got '{other}'"),
            }),
        }
    }
}

/// A 24-hour wall-clock time with minute resolution.
///
/// Serialized as the zero-padded `"HH:MM"` string the server stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidTime(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    /// Convert a form entry with an AM/PM selector. `12 AM` is midnight,
    /// `12 PM` is noon; the hour must be within `1..=12`.
    pub fn from_12_hour(hour: u8, minute: u8, meridiem: Meridiem) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&hour) {
            return Err(ValidationError::InvalidTime(format!("{hour}:{minute:02} (12-hour)")));
        }
        let h24 = match meridiem {
            Meridiem::Pm if hour < 12 => hour + 12,
            Meridiem::Am if hour == 12 => 0,
            _ => hour,
        };
        Self::new(h24, minute)
    }

    /// Truncate a local timestamp to its minute.
    pub fn of(at: NaiveDateTime) -> Self {
        Self {
            hour: at.hour() as u8,
            minute: at.minute() as u8,
        }
    }

    /// The minute `minutes` after `at`, truncated to the minute.
    pub fn after(at: NaiveDateTime, minutes: u32) -> Self {
        Self::of(at + Duration::minutes(i64::from(minutes)))
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// `07:05 AM` style rendering.
    pub fn to_12_hour(&self) -> String {
        let meridiem = if self.hour >= 12 { "PM" } else { "AM" };
        let h12 = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{h12:02}:{:02} {meridiem}", self.minute)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ClockTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour = h.parse::<u8>().map_err(|_| invalid())?;
        let minute = m.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `hh:mm:ss AM` clock face used by the time-of-day display.
pub fn format_clock_face(at: NaiveDateTime) -> String {
    let meridiem = if at.hour() >= 12 { "PM" } else { "AM" };
    let h12 = match at.hour() % 12 {
        0 => 12,
        h => h,
    };
    format!("{h12:02}:{:02}:{:02} {meridiem}", at.minute(), at.second())
}
