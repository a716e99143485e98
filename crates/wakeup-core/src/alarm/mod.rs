mod record;
mod registry;
mod time;

pub use record::{AlarmId, AlarmRecord, ChallengeType, NewAlarm, DEFAULT_LABEL, DEFAULT_SOUND};
pub use registry::AlarmRegistry;
pub use time::{format_clock_face, ClockTime, Meridiem};
