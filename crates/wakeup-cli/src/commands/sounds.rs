use wakeup_core::{AlarmApi, Config};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let library = config.sound_library();

    println!("Presets:");
    for name in library.preset_names() {
        let marker = if name == config.sounds.default_preset { " (default)" } else { "" };
        println!("  {name:<10} {}{marker}", library.resolve(name));
    }

    let api = super::connect(&config)?;
    match api.list_sounds().await {
        Ok(sounds) if sounds.is_empty() => println!("Uploaded: none"),
        Ok(sounds) => {
            println!("Uploaded:");
            for sound in &sounds {
                println!("  {:<24} {}", sound.name, library.resolve(&sound.url));
            }
        }
        Err(e) => {
            tracing::warn!("could not list uploaded sounds: {e}");
            println!("Uploaded: unavailable ({e})");
        }
    }
    Ok(())
}
