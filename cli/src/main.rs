mod config;
mod input;
mod terminal;
mod ui;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use searchbar_core::{HttpSearchClient, Session, Settings};

/// Incremental search box for a JSON search endpoint.
///
/// Prints the final query on stdout when it exits.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// Read settings from this file instead of the default config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// URL to send the search requests to
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Key in the response object that holds the results
    #[arg(short, long)]
    results_key: Option<String>,

    /// How long typing has to pause before a search is sent
    #[arg(short, long, value_name = "MS")]
    quiet_period_ms: Option<u64>,

    /// Show cached results right away instead of after the quiet period
    #[arg(long)]
    no_debounce_cache_hits: bool,

    /// Log more, can be repeated
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(endpoint) = &self.endpoint {
            settings.endpoint = endpoint.clone();
        }
        if let Some(key) = &self.results_key {
            settings.results_key = key.clone();
        }
        if let Some(ms) = self.quiet_period_ms {
            settings.quiet_period_ms = ms;
        }
        if self.no_debounce_cache_hits {
            settings.debounce_cache_hits = false;
        }
    }

    fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// The terminal is busy drawing, so everything is logged to a file.
fn init_logger(level: log::LevelFilter) -> anyhow::Result<PathBuf> {
    use log::LevelFilter;

    let dir = config::cache_dir()?;
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", dir))?;
    let path = dir.join(config::LOG_NAME);

    fern::Dispatch::new()
        .level(LevelFilter::Off)
        .level_for("searchbar", level)
        .level_for("searchbar_core", level)
        .level_for("protocol", level)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:<5} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(fern::log_file(&path).with_context(|| format!("opening {:?}", path))?)
        .apply()
        .context("installing the logger")?;
    Ok(path)
}

#[tokio::main]
async fn async_main(settings: Settings) -> ExitCode {
    let client = match HttpSearchClient::new(&settings) {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to create the search client: {:?}", e);
            eprintln!("searchbar: {}", e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("Searching {}", client.endpoint());

    let session = Session::spawn(Arc::new(client), &settings);
    let res = terminal::run(&session).await;

    log::info!("Stopping the session...");
    if let Err(e) = session.shutdown().await {
        log::error!("Session exited abnormally: {:?}", e);
    }

    match res {
        Ok(query) => {
            log::info!("Goodbye");
            println!("{}", query);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Terminal loop failed: {:?}", e);
            eprintln!("searchbar: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logger(cli.log_level()) {
        eprintln!("searchbar: logging is disabled: {:?}", e);
    }
    log::info!("Welcome");

    let mut settings = match config::read_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to read config: {:?}", e);
            eprintln!("searchbar: failed to read config: {:?}", e);
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut settings);
    if let Err(e) = config::validate(&settings) {
        eprintln!("searchbar: {}", e);
        return ExitCode::FAILURE;
    }
    log::debug!("Settings: {:?}", settings);

    async_main(settings)
}
