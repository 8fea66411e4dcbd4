pub mod cli;
pub mod core;
pub mod providers;
pub mod server;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::{Analyzer, AssumptionOverrides, CompanyFinancials};
use crate::providers::caching::CachingFinancialsProvider;
use crate::providers::yahoo_finance::YahooFinanceProvider;
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Analyze {
        tickers: Vec<String>,
        overrides: AssumptionOverrides,
        json: bool,
    },
    History {
        limit: usize,
    },
    Save {
        id: String,
    },
    Delete {
        id: String,
    },
    Purge,
    Serve {
        bind: Option<String>,
    },
}

/// Wires the Yahoo provider, the disk cache and the analysis store.
pub fn build_analyzer(config: &AppConfig) -> Result<Analyzer> {
    let data_path = config.default_data_path()?;
    let kv = KeyValueStore::open(&data_path)?;

    let cache = Arc::new(kv.cache::<String, CompanyFinancials>("cache")?);
    let analyses = Arc::new(kv.analyses("analyses")?);

    let yahoo = YahooFinanceProvider::new(&config.yahoo())?;
    let provider = CachingFinancialsProvider::new(yahoo, "yahoo", cache, config.cache_ttl());

    Ok(Analyzer::new(Arc::new(provider), analyses)
        .with_capm(config.valuation.capm())
        .with_retention(config.retention()))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let analyzer = build_analyzer(&config)?;

    match command {
        AppCommand::Analyze {
            tickers,
            overrides,
            json,
        } => {
            let overrides = (!overrides.is_empty()).then_some(&overrides);
            cli::analyze::run(&analyzer, &tickers, overrides, json).await
        }
        AppCommand::History { limit } => cli::history::run(&analyzer, limit).await,
        AppCommand::Save { id } => cli::history::save(&analyzer, &id).await,
        AppCommand::Delete { id } => cli::history::delete(&analyzer, &id).await,
        AppCommand::Purge => cli::history::purge(&analyzer).await,
        AppCommand::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("Invalid bind address: {bind}"))?;
            info!("Starting server on {}", addr);
            server::serve(Arc::new(analyzer), addr).await
        }
    }
}
