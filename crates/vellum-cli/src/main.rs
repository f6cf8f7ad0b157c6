//! vellum - render relation history from a vellum database.
//!
//! # Usage
//!
//! ```text
//! vellum history <relation-id> [--privileged] [--json] [--config <path>]
//! vellum version <relation-id> <version> [--privileged] [--json] [--config <path>]
//! ```
//!
//! # Configuration
//!
//! Read from `--config`, else `~/.vellum/config.toml` if present, else
//! defaults; `VELLUM_*` environment variables (and a `.env` file) override
//! either. Changesets and users are read from the same database.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vellum_core::{
    render_document, ChangesetOwnerCache, DisplayNameCache, HistoryConfig, RelationHistoryStore,
    RelationRenderer, SqliteDirectory, SqliteRelationHistory, Viewer,
};

mod args;

use args::{Args, Command};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the document, logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse(std::env::args().skip(1))?;
    let config = load_config(args.config.as_ref())?;
    tracing::debug!(path = %config.database_path.display(), "Using history database");

    let directory =
        Arc::new(SqliteDirectory::from_config(&config).context("opening changeset directory")?);
    let store = SqliteRelationHistory::new(&config, directory.clone())
        .context("opening history store")?;
    let renderer = RelationRenderer::new(directory.clone(), directory);

    let snapshots = match args.command {
        Command::History { relation_id } => {
            let history = store.history(relation_id)?;
            if history.is_empty() {
                bail!("relation {} has no history", relation_id);
            }
            history
        }
        Command::Version {
            relation_id,
            version,
        } => vec![store
            .get_version(relation_id, version)?
            .ok_or_else(|| anyhow!("relation {} has no version {}", relation_id, version))?],
    };

    let viewer = if args.privileged {
        Viewer::Moderator
    } else {
        Viewer::Public
    };

    // One pair of caches for the whole invocation.
    let mut changeset_cache = ChangesetOwnerCache::new();
    let mut display_name_cache = DisplayNameCache::new();
    let nodes = renderer.render_all(
        &snapshots,
        viewer,
        &mut changeset_cache,
        &mut display_name_cache,
    )?;
    tracing::info!(
        rendered = nodes.len(),
        changesets = changeset_cache.len(),
        users = display_name_cache.len(),
        "Rendered relation history"
    );

    let document = render_document(nodes);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print!("{}", document.to_xml_document());
    }
    Ok(())
}

fn load_config(explicit: Option<&PathBuf>) -> Result<HistoryConfig> {
    let default_file = dirs::home_dir().map(|h| h.join(".vellum").join("config.toml"));

    let base = match (explicit, default_file) {
        (Some(path), _) => HistoryConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        (None, Some(path)) if path.exists() => HistoryConfig::from_file(&path)
            .with_context(|| format!("reading config {}", path.display()))?,
        _ => HistoryConfig::default(),
    };
    Ok(base.with_env_overrides()?)
}
