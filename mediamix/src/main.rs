mod commands;
mod console_delegate;
mod settings;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use media_capture_core::AudioFormat;

use settings::AppSettings;

/// Record microphone audio to raw PCM and WAV files.
#[derive(Parser)]
#[command(name = "mediamix", version, about)]
struct Cli {
    /// Settings file (default: <config dir>/mediamix/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record from the microphone
    Record {
        /// Recording length in seconds
        #[arg(short, long, default_value_t = 5)]
        seconds: u64,
        /// Keep only the headerless PCM file
        #[arg(long)]
        raw: bool,
        /// Input device name (default: system default microphone)
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Wrap an existing raw PCM file in a WAV container
    Convert {
        raw: PathBuf,
        #[arg(long, default_value_t = 44100)]
        rate: u32,
        #[arg(long, default_value_t = 1)]
        channels: u16,
        #[arg(long, default_value_t = 16)]
        bits: u16,
    },
    /// List input devices
    Devices,
    /// List saved recordings, newest first
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a single recording by file name
    Delete { file_name: String },
    /// Delete every file in the recordings directory
    Clean,
    /// Show or change preferences
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    SetDarkMode {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    SetVolume {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=crate::settings::MAX_VOLUME as i64))]
        volume: u8,
    },
    SetRecordingsDir { dir: PathBuf },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings_path = cli.settings.unwrap_or_else(AppSettings::default_path);
    let mut settings = AppSettings::load(&settings_path)?;

    match cli.command {
        Command::Record { seconds, raw, device } => commands::record(&settings, seconds, raw, device)?,
        Command::Convert {
            raw,
            rate,
            channels,
            bits,
        } => {
            let container = commands::convert(&raw, AudioFormat::new(rate, channels, bits))?;
            commands::print_container(&container);
        }
        Command::Devices => commands::devices()?,
        Command::List { json } => {
            let recordings = commands::list_recordings(&settings.recordings_dir())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&recordings)?);
            } else {
                for r in &recordings {
                    let duration = r.duration_secs.map(|d| format!("{:.1}s", d)).unwrap_or_else(|| "-".into());
                    println!("{:<40} {:>10} bytes {:>8}  {}", r.file_name, r.size_bytes, duration, r.created_at);
                }
            }
        }
        Command::Delete { file_name } => {
            let path = commands::delete_recording(&settings.recordings_dir(), &file_name)?;
            println!("Deleted {}", path.display());
        }
        Command::Clean => {
            let removed = commands::clean(&settings.recordings_dir())?;
            println!("Deleted {} file(s)", removed);
        }
        Command::Settings { action } => {
            let changed = match action.unwrap_or(SettingsAction::Show) {
                SettingsAction::Show => false,
                SettingsAction::SetDarkMode { enabled } => {
                    settings.dark_mode = enabled;
                    true
                }
                SettingsAction::SetVolume { volume } => {
                    settings.set_volume(volume)?;
                    true
                }
                SettingsAction::SetRecordingsDir { dir } => {
                    settings.recordings_dir = Some(dir);
                    true
                }
            };
            if changed {
                settings.save(&settings_path)?;
                log::info!("Saved settings to {}", settings_path.display());
            }
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}
