use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use promptline::api::BackendClient;
use promptline::app::App;
use promptline::config::Config;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "promptline")]
#[command(version = "0.1.0")]
#[command(about = "Terminal chat client for an AI completion backend", long_about = None)]
struct Cli {
    /// Backend base URL (overrides config file and BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check backend health and exit
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }

    match cli.command {
        Some(Commands::Health) => check_health(&config).await,
        None => {
            init_logging(&config)?;
            run_tui(config).await
        }
    }
}

async fn check_health(config: &Config) -> Result<()> {
    let client = BackendClient::new(config.backend_url.clone());
    let health = client
        .health()
        .await
        .with_context(|| format!("Backend at {} is not reachable", config.backend_url))?;

    match health.database {
        Some(database) => println!("{} (database: {})", health.status, database),
        None => println!("{}", health.status),
    }
    Ok(())
}

/// Diagnostics go to a file under the app home dir; writing to stdout or
/// stderr would corrupt the terminal UI.
fn init_logging(config: &Config) -> Result<()> {
    let file = std::fs::File::options()
        .create(true)
        .append(true)
        .open(config.log_path())
        .context("Failed to open log file")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

async fn run_tui(config: Config) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    tracing::info!(backend_url = %config.backend_url, "starting promptline");
    let result = run_loop(&mut terminal, App::new(&config)).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> Result<()> {
    loop {
        terminal.draw(|frame| app.render(frame))?;

        if event::poll(Duration::from_millis(50)).context("Failed to poll events")? {
            if let Event::Key(key) = event::read().context("Failed to read event")? {
                app.handle_key(key);
            }
        }

        app.on_tick();

        if app.should_exit() {
            return Ok(());
        }
    }
}
