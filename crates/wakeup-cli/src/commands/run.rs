use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use wakeup_core::{AlarmController, ChallengeMachine, Config, SystemClock, UserInput};

use crate::terminal::{TerminalAudio, TerminalPresenter};

/// Map one line of terminal input to a user action.
fn parse_input(line: &str) -> UserInput {
    match line.trim() {
        "" => UserInput::Interaction,
        "s" | "snooze" => UserInput::Snooze,
        "x" | "stop" => UserInput::Stop,
        _ => UserInput::Submit(line.to_string()),
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let api = super::connect(&config)?;
    let machine = ChallengeMachine::new(config.timings(), config.sound_library());
    let mut controller = AlarmController::new(api, machine, TerminalAudio::default(), TerminalPresenter::stdout());

    println!("WakeUp is running against {}. Ctrl-D to quit.", config.server.base_url);

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(parse_input(&line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("stdin closed: {e}");
                    break;
                }
            }
        }
    });

    controller.run(&SystemClock::new(), rx).await?;
    Ok(())
}
