use std::fs::{self, File};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use ratatui::crossterm::event::Event;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod catalog;
mod controller;
mod detail;
mod domain;
mod inputter;
mod list_state;
mod model;
mod record;
mod table;
mod ui;

use catalog::{CatalogSource, Dispatcher, HttpCatalog};
use controller::Controller;
use domain::{CatalogError, DEFAULT_BASE_URL, DEFAULT_RESOURCE, Message, TvConfig};
use list_state::PageSize;
use model::{Model, Status};

/// Browse a remote product catalog in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Base url of the catalog api
    #[arg(long, env = "CATV_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Name of the record collection
    #[arg(long, default_value = DEFAULT_RESOURCE)]
    resource: String,

    /// Records per page (5, 10, 20 or 30)
    #[arg(long, default_value_t = PageSize::default())]
    page_size: PageSize,

    /// Request timeout in milliseconds, no timeout if omitted
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Terminal event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Log file, `~` and environment variables are expanded
    #[arg(long, env = "CATV_LOG_FILE", default_value = "~/.cache/catv.log")]
    log_file: String,

    /// Open the details of this product right away
    product_id: Option<String>,
}

impl From<&Args> for TvConfig {
    fn from(args: &Args) -> Self {
        TvConfig::default()
            .base_url(args.base_url.as_str())
            .resource(args.resource.as_str())
            .page_size(args.page_size)
            .timeout_ms(args.timeout_ms)
            .event_poll_time(args.poll_ms)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(log_file: &str) -> Result<(), CatalogError> {
    let path = shellexpand::full(log_file).map_err(|e| CatalogError::Config(e.to_string()))?;
    let path = Path::new(path.as_ref());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

async fn run(args: Args) -> Result<(), CatalogError> {
    init_logging(&args.log_file)?;
    let config = TvConfig::from(&args);
    info!("Starting catv with {config:?}");

    let source = HttpCatalog::new(&config)?;
    let controller = Controller::new(&config);
    let (mut model, first) = Model::init(&config);

    let (message_tx, message_rx) = mpsc::channel::<Message>(64);
    let (event_tx, event_rx) = mpsc::channel::<Event>(64);

    let mut dispatcher = Dispatcher::new(source, message_tx);
    dispatcher.dispatch(first);
    if let Some(id) = args.product_id
        && let Some(fetch) = model.update(Message::OpenDetail(id))
    {
        dispatcher.dispatch(fetch);
    }

    controller.spawn_input_reader(event_tx);

    let mut terminal = ratatui::init();
    let result = event_loop(
        &mut terminal,
        &mut model,
        &controller,
        &mut dispatcher,
        message_rx,
        event_rx,
    )
    .await;
    ratatui::restore();
    info!("Bye");
    result
}

async fn event_loop<S: CatalogSource>(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    controller: &Controller,
    dispatcher: &mut Dispatcher<S>,
    mut messages: mpsc::Receiver<Message>,
    mut events: mpsc::Receiver<Event>,
) -> Result<(), CatalogError> {
    while model.status != Status::Quitting {
        terminal.draw(|f| ui::draw(model, f))?;

        let message = tokio::select! {
            Some(event) = events.recv() => controller.handle_event(event, model.raw_keyevents()),
            Some(message) = messages.recv() => Some(message),
            else => break,
        };

        if let Some(message) = message
            && let Some(fetch) = model.update(message)
        {
            dispatcher.dispatch(fetch);
        }
    }
    Ok(())
}
