//! cosmowall - NASA Astronomy Picture of the Day for the desktop
//!
//! Resolves the picture for a date through the local cache, then optionally
//! sets it as wallpaper, shows it in feh or the caption viewer, and narrates
//! the caption.

use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use cosmowall::cache::CacheEntry;
use cosmowall::cli::{today_utc, Cli, RunOptions};
use cosmowall::config::Config;
use cosmowall::data::ApodClient;
use cosmowall::desktop::{self, DesktopEnv};
use cosmowall::logging;
use cosmowall::narration::{self, CommandSynthesizer};
use cosmowall::reconciler::{date_key, Reconciler, Resolution, ResolveError};
use cosmowall::ui::{self, LayoutMode, Viewer};

/// Number of explanation characters shown per entry by `--list-cached`
const LIST_PREVIEW_CHARS: usize = 200;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = %e, "fatal error");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let options = match RunOptions::from_cli(&cli, today_utc()) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let client = ApodClient::new(&config.api_key, &config.api_url, config.timeout)?;
    let reconciler = Reconciler::new(config.store(), client);

    if options.list_cached {
        print_listing(&reconciler.list()?);
        return Ok(ExitCode::SUCCESS);
    }

    let Some(date) = options.date else {
        // Only the loop viewer runs without a date
        let entries = reconciler.list()?;
        if entries.is_empty() {
            println!("No cached APODs found.");
        } else {
            ui::run(Viewer::new(entries, 0, LayoutMode::Loop, options.fullscreen))?;
        }
        return Ok(ExitCode::SUCCESS);
    };

    let key = date_key(date);
    let resolution = match reconciler.resolve(date).await {
        Ok(resolution) => resolution,
        Err(e) => {
            report_resolve_error(&e);
            return Ok(ExitCode::SUCCESS);
        }
    };

    let entry = resolution.entry().clone();
    print_summary(&key, &resolution);

    let image = Path::new(&entry.img);

    if options.set_bg {
        match DesktopEnv::detect().set_wallpaper(image) {
            Ok(true) => println!("Set desktop background to {}", entry.img),
            Ok(false) => eprintln!("No supported desktop environment detected; background unchanged."),
            Err(e) => eprintln!("Failed to set desktop background: {}", e),
        }
    }

    if options.feh {
        if let Err(e) = desktop::show_with_feh(image) {
            eprintln!("Failed to display image with feh: {}", e);
        }
    }

    if options.audio || options.play {
        let synth = CommandSynthesizer::new(&config.tts_program);
        match reconciler.ensure_audio(&key, &entry, &options.voice, options.force_audio, &synth) {
            Ok(audio) => {
                println!("Narration: {}", audio.display());
                if options.play {
                    if let Err(e) = narration::play_detached(&audio, &config.player) {
                        eprintln!("{}", e);
                    }
                }
            }
            // Playback cannot go ahead without the file
            Err(e) if options.play => return Err(e.into()),
            Err(e) => eprintln!("Failed to generate narration: {}", e),
        }
    }

    if let Some(layout) = options.viewer {
        open_viewer(&reconciler, &key, entry, layout, options.fullscreen)?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Opens the caption viewer on `entry`
///
/// The loop layout cycles through the whole cache, starting at `key`.
fn open_viewer<S>(
    reconciler: &Reconciler<S>,
    key: &str,
    entry: CacheEntry,
    layout: LayoutMode,
    fullscreen: bool,
) -> Result<(), Box<dyn Error>> {
    let (entries, index) = if layout == LayoutMode::Loop {
        let entries = reconciler.list()?;
        let index = entries.iter().position(|(date, _)| date == key).unwrap_or(0);
        (entries, index)
    } else {
        (vec![(key.to_string(), entry)], 0)
    };

    ui::run(Viewer::new(entries, index, layout, fullscreen))?;
    Ok(())
}

/// Prints what was resolved for a date
fn print_summary(key: &str, resolution: &Resolution) {
    let entry = resolution.entry();
    if resolution.is_cached() {
        println!("Using cached APOD for {} -> {}\n", key, entry.img);
    } else {
        println!("Saved APOD {} -> {}\n", key, entry.img);
    }
    println!("Title: {}\n", entry.title);
    println!("Explanation: {}", entry.explanation);
}

/// Reports a failed resolution; none of these end the run with an error
fn report_resolve_error(error: &ResolveError) {
    tracing::info!(error = %error, "could not resolve APOD");
    match error {
        ResolveError::NotAnImage { title, .. } => {
            println!("{}", error);
            if !title.is_empty() {
                println!("{}", title);
            }
        }
        _ => eprintln!("{}", error),
    }
}

/// Prints every cached entry with a preview of its explanation
fn print_listing(entries: &[(String, CacheEntry)]) {
    if entries.is_empty() {
        println!("No cached APODs found.");
        return;
    }

    for (date, entry) in entries {
        let title = if entry.title.is_empty() {
            "No Title"
        } else {
            entry.title.as_str()
        };
        let preview: String = entry.explanation.chars().take(LIST_PREVIEW_CHARS).collect();
        println!("{}: {}\n   {}...\n", date, title, preview);
    }
}
