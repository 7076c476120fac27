mod config;
mod replay;

use std::{fs::File, io::BufReader, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use run_tracker::RunIdService;
use shared::{
    cards::SignatureTreasureSet,
    state::{ApplicationState, NavigationState},
};
use state_core::{default_registry, StateStore};
use storage::Storage;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{load_settings, prepare_database_url},
    replay::{parse_events, replay_events, ReplaySummary},
};

/// Replays recorded store events and reports how matches were grouped into
/// runs.
#[derive(Parser, Debug)]
struct Cli {
    /// JSON-lines file, one store event per line.
    #[arg(long)]
    events: PathBuf,
    #[arg(long, default_value = "replay.toml")]
    config: PathBuf,
    /// Overrides the configured preferences database.
    #[arg(long)]
    database_url: Option<String>,
    /// Also print the final application state.
    #[arg(long)]
    dump_state: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config);
    if let Some(url) = cli.database_url {
        settings.database_url = url;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url)
        .await
        .with_context(|| format!("failed to open preferences database '{database_url}'"))?;
    storage.health_check().await?;
    let storage = Arc::new(storage);

    let file = File::open(&cli.events)
        .with_context(|| format!("failed to open events file '{}'", cli.events.display()))?;
    let events = parse_events(BufReader::new(file))?;
    info!(events = events.len(), path = %cli.events.display(), "loaded events");

    let catalog = Arc::new(SignatureTreasureSet::new(settings.signature_cards.clone()));
    let store = StateStore::new_with_state(
        default_registry(storage, catalog.clone()),
        ApplicationState::default(),
        NavigationState::default(),
        settings.store,
    );
    let runs = RunIdService::spawn(store.as_ref(), settings.run_boundary, catalog);
    let mut failures = store.subscribe_failures();

    let (last_seq, assignments) = replay_events(&store, &runs, events).await?;
    let snapshot = store
        .wait_for(last_seq)
        .await
        .context("state store stopped before the replay finished")?;
    let current_run_id = runs
        .settled(last_seq)
        .await
        .context("run tracking stopped before the replay finished")?;
    store.shutdown().await;

    let mut failed = Vec::new();
    loop {
        match failures.try_recv() {
            Ok(failure) => failed.push(failure),
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "failure reports dropped"),
            Err(_) => break,
        }
    }

    let summary = ReplaySummary::new(&snapshot, current_run_id, assignments, failed);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    if cli.dump_state {
        println!("{}", serde_json::to_string_pretty(snapshot.state.as_ref())?);
    }

    Ok(())
}
