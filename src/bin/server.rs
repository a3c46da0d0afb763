use std::{fs::OpenOptions, net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use receipt_scanner::{
    AppState, GeminiClient, HttpImageFetcher, LocalObjectStore, build_router, graceful_shutdown,
    logging_middleware,
};

/// The REST API server for receipt_scanner.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The directory uploaded receipt images are stored in.
    #[arg(long, default_value = "objects")]
    objects_dir: PathBuf,

    /// The URL clients and the image fetcher use to reach this server.
    ///
    /// Defaults to "http://127.0.0.1:<port>".
    #[arg(long)]
    public_url: Option<String>,

    /// The Gemini model used for extraction and insights.
    #[arg(long, default_value = receipt_scanner::DEFAULT_GEMINI_MODEL)]
    gemini_model: String,

    /// The base URL of the Gemini API.
    #[arg(long, default_value = receipt_scanner::DEFAULT_GEMINI_API_BASE)]
    gemini_api_base: String,

    /// The API key for the Gemini API.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: String,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let public_url = args
        .public_url
        .unwrap_or_else(|| format!("http://127.0.0.1:{}", args.port));

    let conn = Connection::open(&args.db_path).expect("Could not open the database.");
    let ai = GeminiClient::new(&args.gemini_api_key, &args.gemini_model)
        .with_api_base(&args.gemini_api_base);
    let object_store = LocalObjectStore::new(&args.objects_dir, &public_url);

    let app_state = AppState::new(
        conn,
        Arc::new(ai),
        Arc::new(HttpImageFetcher::new()),
        object_store,
    )
    .expect("Could not initialize the app state.");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(app_state).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    tracing::info!(
        "HTTP server listening on {addr}, serving objects from {} at {public_url}",
        args.objects_dir.display()
    );
    tracing::info!("Using Gemini model {}", args.gemini_model);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped with an error.");
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged by the handlers.
        .on_failure(());

    router.layer(tracing_layer)
}
