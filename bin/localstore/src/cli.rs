//! Command line interface.

use std::ops::ControlFlow;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr};
use tracing::{debug, info};
use vertex_storage_redb::RedbStore;
use vertex_swarm_localstore::{LayoutKind, LocalStore, LocalStoreArgs, Options};
use vertex_swarm_primitives::ChunkAddress;

/// File name of the store inside the data directory.
const DB_FILE: &str = "localstore.redb";

/// Vertex local store maintenance
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct LocalStoreCli {
    /// Directory holding the store.
    #[arg(long, value_name = "DIR", global = true, default_value = "localstore")]
    pub(crate) datadir: PathBuf,

    /// Base address of the node, hex encoded. Required when creating a store.
    #[arg(long, value_name = "ADDRESS", global = true)]
    pub(crate) base: Option<ChunkAddress>,

    /// Local store configuration.
    #[command(flatten)]
    pub(crate) store: LocalStoreArgs,

    /// Logging configuration.
    #[command(flatten)]
    pub(crate) logs: LogArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Logging configuration.
#[derive(Debug, Args, Clone, Default)]
#[command(next_help_heading = "Logging")]
pub(crate) struct LogArgs {
    /// Silence all output.
    #[arg(short, long, global = true)]
    pub(crate) quiet: bool,

    /// Verbose mode (-v, -vv, -vvv, etc.).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub(crate) verbosity: u8,

    /// Log filter directive (e.g., "vertex_swarm_localstore=trace").
    #[arg(long = "log.filter", value_name = "DIRECTIVE", global = true)]
    pub(crate) filter: Option<String>,

    /// Use JSON format for log output.
    #[arg(long = "log.json", global = true)]
    pub(crate) json: bool,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print layout, base address, size and index entry counts.
    Info,
    /// List pull index entries in pull order.
    Pull {
        /// Stop after this many entries.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Evict least recently accessed chunks.
    Gc {
        /// Size to shrink to. Defaults to the configured capacity.
        #[arg(long)]
        target: Option<u64>,
    },
}

/// Run a parsed command line.
pub(crate) fn run(cli: LocalStoreCli) -> Result<()> {
    let db = open(&cli)?;

    match cli.command {
        Command::Info => {
            let counts = db.index_counts()?;
            println!("layout:    {}", db.layout());
            println!("base:      {}", db.base());
            println!("size:      {}", db.size()?);
            println!("capacity:  {}", db.options().capacity);
            println!("retrieval: {}", counts.retrieval);
            println!("pull:      {}", counts.pull);
            println!("push:      {}", counts.push);
            println!("gc:        {}", counts.gc);
        }
        Command::Pull { limit } => {
            let limit = limit.unwrap_or(usize::MAX);
            let base = *db.base();
            let mut listed = 0usize;
            db.iterate_pull(|item| {
                if listed >= limit {
                    return Ok(ControlFlow::Break(()));
                }
                println!(
                    "{:>2} {:>20} {}",
                    base.proximity(&item.address),
                    item.store_timestamp,
                    item.address
                );
                listed += 1;
                Ok(ControlFlow::Continue(()))
            })?;
        }
        Command::Gc { target } => {
            let target = target.unwrap_or(db.options().capacity);
            let report = db.collect_garbage(target)?;
            info!(evicted = report.evicted, size = report.size, target, "Garbage collected");
            println!("evicted: {}", report.evicted);
            println!("size:    {}", report.size);
        }
    }

    Ok(())
}

/// Open the store in the data directory.
///
/// An existing store keeps its layout and base address. `--base` must match
/// the stored one when given.
fn open(cli: &LocalStoreCli) -> Result<LocalStore<RedbStore>> {
    std::fs::create_dir_all(&cli.datadir)
        .wrap_err_with(|| format!("failed to create data directory: {}", cli.datadir.display()))?;
    let path = cli.datadir.join(DB_FILE);
    let kv = RedbStore::open(&path)
        .wrap_err_with(|| format!("failed to open local store: {}", path.display()))?;

    let stored_base = LocalStore::stored_base(&kv)?;
    let Some(base) = cli.base.or(stored_base) else {
        eyre::bail!("no base address stored in {}, pass --base", path.display());
    };

    let mut options = Options::from_config(&cli.store);
    if let Some(layout) = LocalStore::stored_layout(&kv)? {
        debug!(%layout, "Using stored retrieval layout");
        options.use_retrieval_composite_index = layout == LayoutKind::Composite;
    }

    Ok(LocalStore::open(kv, base, options)?)
}
