//! Shipping Mark Web - Web server for generating shipping-mark label PDFs.

mod form;
mod helpers;
mod routes;
mod state;
mod templates;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, header};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use clap::Parser;
use shipping_mark_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

/// Resolve the static files directory.
///
/// Priority:
/// 1. Explicit path if provided
/// 2. ./static if it exists
/// 3. Crate's built-in static directory
fn resolve_static_dir(explicit_path: Option<&str>) -> PathBuf {
    if let Some(path) = explicit_path {
        return PathBuf::from(path);
    }

    let local_static = PathBuf::from("static");
    if local_static.is_dir() {
        return local_static;
    }

    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
}

#[derive(Parser, Debug)]
#[command(name = "shipping-mark-web")]
#[command(author, version, about = "Shipping Mark Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// Configuration file (defaults to ~/.config/shipping-mark/config.toml or ./config.toml)
    #[arg(short, long, env = "SHIPPING_MARK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the template PDFs
    #[arg(long, env = "SHIPPING_MARK_TEMPLATE_DIR")]
    template_dir: Option<PathBuf>,

    /// Directory holding image assets
    #[arg(long, env = "SHIPPING_MARK_ASSET_DIR")]
    asset_dir: Option<PathBuf>,

    /// Replacement profile table (TOML)
    #[arg(long, env = "SHIPPING_MARK_PROFILES")]
    profiles: Option<PathBuf>,

    /// Maximum request body size in KiB
    #[arg(long, default_value = "1024")]
    body_limit_kib: usize,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Static files directory (defaults to ./static or crate's static dir)
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<String>,
}

impl Args {
    fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => AppConfig::load(),
        };

        if let Some(dir) = &self.template_dir {
            config.template_dir.clone_from(dir);
        }
        if let Some(dir) = &self.asset_dir {
            config.asset_dir.clone_from(dir);
        }
        if let Some(path) = &self.profiles {
            config.profiles_file = Some(path.clone());
        }
        Ok(config)
    }
}

fn router(state: Arc<AppState>, static_dir: PathBuf, body_limit: usize) -> Router {
    Router::new()
        // Pages
        .route("/", get(routes::index))
        // API endpoints - JSON listings
        .route("/api/profiles", get(routes::profiles))
        .route("/api/addresses", get(routes::addresses))
        .route("/api/pdf_files", get(routes::pdf_files))
        // API endpoints - PDF responses
        .route("/api/generate", post(routes::generate))
        .route("/api/preview", post(routes::preview))
        // Static files with Cache-Control: no-cache (cache but always revalidate via ETag)
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-cache"),
                ))
                .service(ServeDir::new(static_dir)),
        )
        // Middleware
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{default_level},lopdf=warn"))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = args.app_config()?;
    let state = Arc::new(
        AppState::new(config).context("Failed to initialize application state")?,
    );

    let app = router(
        state,
        resolve_static_dir(args.static_dir.as_deref()),
        args.body_limit_kib * 1024,
    );

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
