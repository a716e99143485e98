mod countdown;
mod machine;
mod record;
mod timers;

pub use countdown::{format_mss, Countdown, CountdownView, Urgency};
pub use machine::{ActiveAlarmContext, ChallengeMachine, Effect, FetchToken, Phase, Timings};
pub use record::ChallengeRecord;
pub use timers::{TimerHandle, TimerKind, TimerSet};
