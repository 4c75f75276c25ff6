mod app;
mod auth;
mod config;
mod db;
mod responder;
mod session;
mod summary;
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use app::App;
use tui::Tui;
use std::fs;

#[derive(Parser, Debug)]
#[command(author, version, about = "A terminal chat that pretends to turn text into summaries, images, video, audio and sign language", long_about = None)]
struct Cli {
    #[arg(short, long, help = "Enable debug logging")]
    debug: bool,
    #[arg(long, help = "Override the store location, e.g. sqlite:/tmp/sumup.db")]
    database_url: Option<String>,
    #[arg(long, help = "Mock generation delay in milliseconds")]
    delay_ms: Option<u64>,
    #[arg(long, help = "Sign in with an identity token before the UI starts")]
    identity_token: Option<String>,
}

fn init_logging(config: &Config, debug_enabled: bool) -> Result<()> {
    let data_dir = config.data_directory();
    fs::create_dir_all(&data_dir).with_context(|| format!("creating data directory {:?}", data_dir))?;
    let log_path = data_dir.join("sumup.log");
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening log file {:?}", log_path))?;

    // The terminal belongs to the UI, so logs go to a file.
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if debug_enabled { "debug" } else { "info" })
    )
    .target(env_logger::Target::Pipe(Box::new(log_file)))
    .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load();
    if let Some(url) = cli.database_url.clone() {
        config.database_url = Some(url);
    }
    if let Some(delay) = cli.delay_ms {
        config.mock.delay_ms = delay;
    }

    let debug_enabled = cli.debug || config.debug_enabled();
    init_logging(&config, debug_enabled)?;

    log::info!("SumUpAI starting...");
    log::debug!("CLI args: {:?}", cli);
    log::debug!("Loaded configuration: {:?}", config);

    let mut app = App::new(config).await?;

    if let Some(token) = cli.identity_token.as_deref() {
        // A rejection stays in app.error, which the input box shows once the UI is up.
        if app.login_with_identity_token(token).await.is_err() {
            log::warn!("Starting signed out: the --identity-token value was rejected");
        }
    }

    let mut tui = Tui::new()?;
    tui.run_loop(&mut app).await?;

    // Let an in-flight response land in storage before exiting.
    if app.is_generating {
        let grace = std::time::Duration::from_millis(app.config.mock.delay_ms + 500);
        if tokio::time::timeout(grace, app.wait_for_completion()).await.is_err() {
            log::warn!("Exited with a mock response still pending");
        }
    }

    log::info!("Application finished.");
    Ok(())
}
