//! Line-oriented terminal front end for `wakeup-cli run`.

use std::io::{self, Stdout, Write};

use chrono::NaiveDateTime;
use wakeup_core::alarm::format_clock_face;
use wakeup_core::challenge::{CountdownView, Urgency};
use wakeup_core::{AlarmRegistry, AudioSink, Notice, NoticeLevel, PlaybackError, Presenter, Screen, SoundSource, Statistics};

const BELL: &str = "\x07";

/// Renders screens as text. Countdowns and the idle clock share one status
/// line that is rewritten in place.
pub struct TerminalPresenter<W: Write = Stdout> {
    out: W,
    last: Option<Screen>,
    status_open: bool,
}

impl TerminalPresenter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last: None,
            status_open: false,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        let prefix = if self.status_open { "\n" } else { "" };
        self.status_open = false;
        self.write(&format!("{prefix}{text}\n"));
    }

    fn status(&mut self, text: &str) {
        self.status_open = true;
        self.write(&format!("\r{text:<40}"));
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::debug!("terminal write failed: {e}");
        }
    }

    fn countdown_status(prefix: &str, view: &CountdownView) -> String {
        let marker = match view.urgency {
            Urgency::Normal => "",
            Urgency::Warning => " !",
            Urgency::Urgent => " !!",
        };
        format!("  {prefix} {}{marker}", view.display)
    }
}

/// Same screen apart from the countdown value.
fn same_layout(a: &Screen, b: &Screen) -> bool {
    match (a, b) {
        (Screen::AwaitingChallenge { label: la, .. }, Screen::AwaitingChallenge { label: lb, .. }) => la == lb,
        (
            Screen::Challenge {
                prompt: pa,
                loading_failed: fa,
                countdown: ca,
                ..
            },
            Screen::Challenge {
                prompt: pb,
                loading_failed: fb,
                countdown: cb,
                ..
            },
        ) => pa == pb && fa == fb && ca.is_some() == cb.is_some(),
        _ => false,
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn render(&mut self, screen: &Screen) {
        if self.last.as_ref() == Some(screen) {
            return;
        }
        let layout_kept = self.last.as_ref().is_some_and(|last| same_layout(last, screen));
        self.last = Some(screen.clone());

        match screen {
            Screen::Idle => self.line("Waiting for the next alarm."),
            Screen::Ringing { label } => {
                self.line(&format!("{BELL}*** {label} ***"));
                self.line("    [s] snooze    [x] stop");
            }
            Screen::AwaitingChallenge { label, countdown } => {
                if !layout_kept {
                    self.line(&format!("Alarm '{label}' stopped. A challenge follows."));
                }
                self.status(&Self::countdown_status("challenge in", countdown));
            }
            Screen::Challenge {
                prompt,
                countdown,
                loading_failed,
                ..
            } => {
                if !layout_kept {
                    match (prompt, loading_failed) {
                        (_, true) => self.line("Could not load challenge, retrying..."),
                        (None, false) => self.line("Loading challenge..."),
                        (Some(prompt), false) => {
                            self.line(prompt);
                            self.line("Type your answer and press Enter.");
                        }
                    }
                }
                if let Some(view) = countdown {
                    self.status(&Self::countdown_status("time left", view));
                }
            }
            Screen::WrongAnswer => self.line("Wrong answer. The alarm will ring again."),
            Screen::Success => self.line("Correct! Good morning."),
            Screen::TimedOut => self.line("Time's up! The alarm will ring again."),
        }
    }

    fn show_time(&mut self, now: NaiveDateTime) {
        if matches!(self.last, None | Some(Screen::Idle)) {
            self.status(&format!("  {}", format_clock_face(now)));
        }
    }

    fn notice(&mut self, notice: &Notice) {
        let tag = match notice.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        self.line(&format!("[{tag}] {}", notice.message));
    }

    fn show_alarms(&mut self, alarms: &AlarmRegistry) {
        if alarms.is_empty() {
            self.line("No alarms set.");
            return;
        }
        self.line("Alarms:");
        for alarm in alarms.iter() {
            let state = if alarm.enabled { "" } else { " (off)" };
            self.line(&format!(
                "  {}  {} [{}]{state}",
                alarm.time.to_12_hour(),
                alarm.label,
                alarm.challenge_type
            ));
        }
    }

    fn show_statistics(&mut self, stats: &Statistics) {
        self.line(&format!(
            "Streak {} | wake-ups {} | failed {} | alarms {}",
            stats.streak, stats.successful_wakeups, stats.failed_attempts, stats.total_alarms
        ));
    }
}

/// Stand-in audio output: announces the looping sound instead of decoding it.
#[derive(Debug, Default)]
pub struct TerminalAudio {
    playing: Option<SoundSource>,
}

impl AudioSink for TerminalAudio {
    fn play_looped(&mut self, source: &SoundSource) -> Result<(), PlaybackError> {
        tracing::info!(sound = %source, "alarm sound looping");
        println!("(sound: {source})");
        self.playing = Some(source.clone());
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(source) = self.playing.take() {
            tracing::info!(sound = %source, "alarm sound stopped");
        }
    }
}
