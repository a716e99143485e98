use wakeup_core::{AlarmApi, Config, Statistics};

pub async fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let api = super::connect(&Config::load()?)?;
    let stats = api.statistics().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    print!("{}", summary(&stats));
    Ok(())
}

/// Human-readable statistics table. The streak counts consecutive successful
/// wake-ups.
fn summary(stats: &Statistics) -> String {
    let mut out = format!(
        "Total alarms:        {}\n\
         Successful wake-ups: {}\n\
         Failed attempts:     {}\n\
         Snoozes:             {}\n\
         Current streak:      {}\n",
        stats.total_alarms, stats.successful_wakeups, stats.failed_attempts, stats.total_snoozes, stats.streak
    );
    if let Some(secs) = stats.average_response_time {
        out.push_str(&format!(
            "Avg. time to wake:   {}\n",
            wakeup_core::challenge::format_mss(secs)
        ));
    }
    out
}
