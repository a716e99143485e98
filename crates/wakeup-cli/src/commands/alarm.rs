use clap::Subcommand;
use wakeup_core::error::ValidationError;
use wakeup_core::{AlarmApi, AlarmId, ClockTime, Config, Meridiem, NewAlarm};

#[derive(Subcommand)]
pub enum AlarmAction {
    /// List alarms stored on the server
    List {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an alarm
    Add {
        /// Alarm time, "HH:MM" (24-hour) or "h:mm" with --ampm
        time: String,
        /// AM or PM for a 12-hour time
        #[arg(long)]
        ampm: Option<String>,
        /// Label shown while ringing
        #[arg(long)]
        label: Option<String>,
        /// Challenge type: math or sentence
        #[arg(long)]
        challenge: Option<String>,
        /// Preset name or uploaded sound path
        #[arg(long)]
        sound: Option<String>,
    },
    /// Delete an alarm
    Remove {
        /// Alarm ID
        id: String,
    },
    /// Enable or disable an alarm
    Toggle {
        /// Alarm ID
        id: String,
    },
}

pub async fn run(action: AlarmAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AlarmAction::List { json } => {
            let api = super::connect(&Config::load()?)?;
            let alarms = api.list_alarms().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&alarms)?);
            } else if alarms.is_empty() {
                println!("no alarms");
            } else {
                for alarm in &alarms {
                    println!(
                        "{:>4}  {}  {:<24} {:<8} {:<10} {}",
                        alarm.id,
                        alarm.time.to_12_hour(),
                        alarm.label,
                        alarm.challenge_type,
                        alarm.sound,
                        if alarm.enabled { "on" } else { "off" }
                    );
                }
            }
        }
        AlarmAction::Add {
            time,
            ampm,
            label,
            challenge,
            sound,
        } => {
            // Validate before touching config or network.
            let time = form_time(&time, ampm.as_deref())?;
            let form = NewAlarm::from_form(&time, label.as_deref(), challenge.as_deref(), sound.as_deref())?;

            let api = super::connect(&Config::load()?)?;
            let created = api.create_alarm(&form).await?;
            println!(
                "Alarm created: {} at {} ({})",
                created.id,
                created.time,
                created.time.to_12_hour()
            );
        }
        AlarmAction::Remove { id } => {
            let api = super::connect(&Config::load()?)?;
            api.delete_alarm(&AlarmId::new(id.trim())).await?;
            println!("Alarm deleted");
        }
        AlarmAction::Toggle { id } => {
            let api = super::connect(&Config::load()?)?;
            let enabled = api.toggle_alarm(&AlarmId::new(id.trim())).await?;
            println!("Alarm {} {}", id.trim(), if enabled { "enabled" } else { "disabled" });
        }
    }
    Ok(())
}

/// Normalize a form time to `HH:MM`, applying the AM/PM selector if given.
fn form_time(time: &str, ampm: Option<&str>) -> Result<String, ValidationError> {
    let Some(ampm) = ampm else {
        return Ok(time.trim().to_string());
    };
    let meridiem: Meridiem = ampm.parse()?;
    let entered: ClockTime = time.parse()?;
    Ok(ClockTime::from_12_hour(entered.hour(), entered.minute(), meridiem)?.to_string())
}
