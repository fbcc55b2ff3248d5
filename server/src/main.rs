use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::Router;
use cinesearch_core::FuzzyEntityIndex;
use cinesearch_server::build_app;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Tab-separated entity file (header line, then name/score/description/
    /// wikipedia_url/wikidata_id/synonyms)
    #[arg(long)]
    entities: String,
    /// q-gram width
    #[arg(long, default_value_t = 3)]
    q: usize,
    /// Also index entity synonyms
    #[arg(long, default_value_t = false)]
    with_synonyms: bool,
    /// Directory of static files for the demo UI
    #[arg(long)]
    web: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let start = Instant::now();
    let index = FuzzyEntityIndex::from_tsv_file(&args.entities, args.q, args.with_synonyms)?;
    tracing::info!(
        entities = index.num_entities(),
        q = args.q,
        with_synonyms = args.with_synonyms,
        took_ms = start.elapsed().as_millis() as u64,
        "fuzzy index built"
    );

    let app: Router = build_app(Arc::new(index), args.web);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
