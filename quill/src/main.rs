//! Quill - an AI co-writing studio for the terminal.
//!
//! A vim-style terminal interface for planning, drafting, checking and
//! illustrating scenes with a team of AI writing agents.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a line-oriented interface suitable for scripts:
//!
//! ```bash
//! cargo run -p quill -- --headless --data-dir ./my-novel
//! ```

mod app;
mod events;
mod headless;
mod playback;
mod ui;

use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use quill_core::{Generator, QuillConfig};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use app::App;
use events::{handle_event, EventResult};
use ui::render::render;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Check for --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let headless = args.iter().any(|a| a == "--headless");
    let config = parse_config_from_args(QuillConfig::from_env(), &args);

    init_tracing(headless, &config.log_path())?;
    tracing::info!(data_dir = %config.data_dir.display(), headless, "starting quill");

    if config.api_key.is_none() {
        tracing::warn!("no API key configured; agents are unavailable");
        if headless {
            eprintln!("Warning: GEMINI_API_KEY not set. Agents are unavailable.");
        }
    }

    let mut studio = config.studio();
    if let Err(e) = studio.load().await {
        // Keep going with the default story; nothing is written until a load succeeds.
        tracing::error!(error = %e, "failed to load saved story");
        eprintln!("Warning: could not load saved story: {e}");
    }

    // Check for --headless mode
    if headless {
        return headless::run_headless(studio, config.export_dir())
            .await
            .map_err(|e| e.into());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, App::new(studio, &config)).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend, G: Generator>(
    terminal: &mut Terminal<B>,
    mut app: App<G>,
) -> io::Result<()> {
    loop {
        // Render
        terminal.draw(|f| render(f, &app))?;

        // Await queued work one item per frame
        if let Some(op) = app.take_pending() {
            if let Some(label) = op.working_label() {
                app.set_status(label);
                terminal.draw(|f| render(f, &app))?;
            }
            app.perform(op).await;
            continue;
        }

        // Poll for events
        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            if handle_event(&mut app, ev) == EventResult::Quit {
                return Ok(());
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Install the tracing subscriber. The TUI owns the terminal, so it logs to a file.
fn init_tracing(headless: bool, log_path: &Path) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    }
    Ok(())
}

/// Apply command line overrides to the environment configuration.
fn parse_config_from_args(mut config: QuillConfig, args: &[String]) -> QuillConfig {
    let mut i = 0;
    while i < args.len() {
        if let Some(dir) = args[i].strip_prefix("--data-dir=") {
            config = config.with_data_dir(PathBuf::from(dir));
        } else if args[i] == "--data-dir" {
            if let Some(dir) = args.get(i + 1) {
                config = config.with_data_dir(PathBuf::from(dir));
                i += 1;
            }
        }
        i += 1;
    }
    config
}

fn print_help() {
    println!("Quill - AI co-writing studio");
    println!();
    println!("USAGE:");
    println!("  quill [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help          Show this help message");
    println!("  --headless          Run in headless mode (line commands, no TUI)");
    println!("  --data-dir <PATH>   Where the story, exports and log are kept");
    println!();
    println!("ENVIRONMENT:");
    println!("  GEMINI_API_KEY      API key for the writing agents (also API_KEY)");
    println!("  QUILL_DATA_DIR      Default data directory");
    println!("  QUILL_TEXT_MODEL    Model for planning, drafting, checking and editing");
    println!("  QUILL_IMAGE_MODEL   Model for scene illustrations");
    println!("  QUILL_SPEECH_MODEL  Model for narration");
    println!("  QUILL_VOICE         Narration voice");
    println!("  RUST_LOG            Log filter (default: info)");
    println!();
    println!("EXAMPLES:");
    println!("  quill                                  # Interactive TUI mode");
    println!("  quill --headless                       # Headless with defaults");
    println!("  quill --headless --data-dir ./novel    # Headless on another story");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_data_dir_flag() {
        let config = parse_config_from_args(
            QuillConfig::default(),
            &args(&["quill", "--headless", "--data-dir", "/tmp/novel"]),
        );
        assert_eq!(config.data_dir, PathBuf::from("/tmp/novel"));
        assert_eq!(config.log_path(), PathBuf::from("/tmp/novel/quill.log"));
    }

    #[test]
    fn test_data_dir_equals_form() {
        let config =
            parse_config_from_args(QuillConfig::default(), &args(&["quill", "--data-dir=/x"]));
        assert_eq!(config.data_dir, PathBuf::from("/x"));
    }

    #[test]
    fn test_missing_data_dir_value_keeps_default() {
        let before = QuillConfig::default().data_dir;
        let config = parse_config_from_args(QuillConfig::default(), &args(&["quill", "--data-dir"]));
        assert_eq!(config.data_dir, before);
    }
}
