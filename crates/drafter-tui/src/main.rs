use anyhow::Result;
use clap::Parser;
use drafter_core::{Config, SessionId};
use std::path::PathBuf;
use tokio::sync::mpsc;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "drafter")]
#[command(version, about = "Chat with Drafter and watch the document update live")]
struct Cli {
    /// Backend base URL
    #[arg(short, long)]
    server: Option<String>,
    /// Re-attach to an existing session instead of starting a new one
    #[arg(long)]
    session: Option<String>,
    /// Write diagnostics to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Remember --server in the config file
    #[arg(long, requires = "server")]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config, command line wins over the file
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring config file: {:#}", e);
        Config::new()
    });
    if let Some(server) = &cli.server {
        config.server_url = Some(server.clone());
        if cli.save_config {
            config.save()?;
        }
    }

    let log_path = logging::init(cli.log_file.clone().or_else(|| config.log_file.clone()))?;
    let settings = config.settings();

    let session = match cli.session.as_deref() {
        Some(raw) => SessionId::parse(raw)?,
        None => SessionId::generate(),
    };
    tracing::info!(log = %log_path.display(), "Logging initialised");

    let (sync_tx, sync_rx) = mpsc::unbounded_channel();
    let mut app = App::new(&settings, session, sync_tx);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(sync_rx);

    app.start();
    let result = run(&mut terminal, &mut app, &mut events).await;

    // Release the poll timer before handing the terminal back
    app.shutdown();
    tui::restore()?;

    tracing::info!(session = %app.session_id(), messages = app.state.messages().len(), "Session ended");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
