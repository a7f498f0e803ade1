//! PubMed Search Function - Entry Point

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pubmed_search::{
    PubMedClient, SearchPipeline,
    config::{CitationLink, Config, SearchProfile},
    server::SearchServer,
};

#[derive(Parser, Debug)]
#[command(name = "pubmed-search")]
#[command(about = "HTTP search function for PubMed")]
#[command(version)]
struct Cli {
    /// Contact email sent to NCBI with every request (required by NCBI usage policy)
    #[arg(long, env = "NCBI_EMAIL")]
    email: String,

    /// NCBI API key (optional, enables higher rate limits)
    #[arg(long, env = "NCBI_API_KEY")]
    api_key: Option<String>,

    /// E-utilities base URL
    #[arg(long, env = "EUTILS_URL")]
    eutils_url: Option<String>,

    /// Which request fields are accepted and how results are sorted
    #[arg(long, default_value = "keywords", env = "SEARCH_PROFILE")]
    profile: Profile,

    /// Override the profile's result cap
    #[arg(long)]
    max_results: Option<u32>,

    /// Skip citation lookups
    #[arg(long)]
    no_citations: bool,

    /// Count PMC references instead of PubMed citing articles
    #[arg(long)]
    pmc_citations: bool,

    /// HTTP server port
    #[arg(long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum Profile {
    /// Free-text keywords and date range, most cited first
    #[default]
    Keywords,
    /// Medicine, condition, journals and date range, most recent first
    Clinical,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        profile = ?cli.profile,
        "Starting PubMed search function"
    );

    let mut config = Config::new(cli.email);
    if let Some(key) = cli.api_key.filter(|k| !k.is_empty()) {
        config = config.with_api_key(key);
    }
    if let Some(url) = cli.eutils_url {
        config.eutils_url = url.trim_end_matches('/').to_string();
    }
    if cli.pmc_citations {
        config = config.with_citation_link(CitationLink::pmc_refs());
    }

    let mut profile = match cli.profile {
        Profile::Keywords => SearchProfile::keywords(),
        Profile::Clinical => SearchProfile::clinical(),
    };
    if let Some(max) = cli.max_results {
        profile.max_results = max;
    }
    profile.enrich_citations = !cli.no_citations;

    let concurrency = config.citation_concurrency;
    let client = PubMedClient::new(config)?;
    let pipeline =
        SearchPipeline::new(Arc::new(client), profile).with_citation_concurrency(concurrency);

    SearchServer::new(pipeline).run_http(cli.port).await
}
