use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use rpk::app::App;
use rpk::config::Config;
use rpk::error::{AppError, AppResult};
use rpk::picker::{PickerOptions, SelectionValue};
use rpk::roster::HttpDirectoryClient;

/// Terminal assignee picker over a paged directory endpoint.
#[derive(Debug, Parser)]
#[command(name = "rpk", version)]
struct Cli {
    /// Directory endpoint returning paged member listings.
    endpoint: String,

    /// Offer the "(unassign)" row in the panel.
    #[arg(long)]
    allow_unassign: bool,

    /// Render the anchor but ignore activation.
    #[arg(long)]
    disabled: bool,

    /// Label shown while nothing is selected.
    #[arg(long, default_value = "Select assignee")]
    placeholder: String,

    /// Member id to treat as the current assignment.
    #[arg(long)]
    current: Option<String>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();
    init_logging()?;

    let config = Config::load()?;
    let token = std::env::var(&config.directory.token_env)
        .ok()
        .filter(|token| !token.is_empty());
    let client = Arc::new(HttpDirectoryClient::new(
        cli.endpoint,
        token,
        Duration::from_millis(config.directory.request_timeout_ms),
    ));

    let options = PickerOptions {
        current: cli
            .current
            .map(SelectionValue::Member)
            .unwrap_or(SelectionValue::Empty),
        allow_unassign: cli.allow_unassign,
        disabled: cli.disabled,
        placeholder: cli.placeholder,
    };

    let mut app = App::new_with_config(client, options, config);
    app.run().await
}

/// Logs go to the file named by `RPK_LOG`; stderr is owned by the
/// alternate-screen terminal session while the app runs.
fn init_logging() -> AppResult<()> {
    let Some(path) = std::env::var_os("RPK_LOG").filter(|path| !path.is_empty()) else {
        return Ok(());
    };

    let file = std::fs::File::create(&path).map_err(|source| {
        AppError::io_with_context(source, format!("failed to open log file {path:?}"))
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
