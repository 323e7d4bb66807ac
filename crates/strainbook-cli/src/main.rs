//! `strainbook` operator binary.
//!
//! Reads `strainbook.toml` (or the path given with `--config`), opens the
//! SQLite catalogue and runs one subcommand against it. Results are printed
//! to stdout as JSON; logs go to stderr.
//!
//! ```text
//! strainbook entry add --shop 3 --name "Amnesia Haze" --category sativa --amount 12,5
//! strainbook reconcile --shop 3
//! strainbook offering find haze
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use strainbook_core::{
  ShopId,
  entry::{EntryDraft, EntryId},
  offering::ManualStatus,
  reconcile::ReconcileOverride,
  store::CatalogueStore,
  strain::StrainId,
};
use strainbook_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "strainbook", author, version, about = "Strain catalogue for shop menus")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "strainbook.toml")]
  config: PathBuf,

  /// SQLite database file; overrides `store_path` from the config.
  #[arg(long, value_name = "FILE")]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Strain registry.
  #[command(subcommand)]
  Strain(StrainCommand),
  /// Current menu entries of a shop.
  #[command(subcommand)]
  Entry(EntryCommand),
  /// Offering catalogue.
  #[command(subcommand)]
  Offering(OfferingCommand),
  /// Show what reconciling a shop would do.
  Check {
    #[arg(long)]
    shop: i64,
  },
  /// Sync a shop's offerings with its current menu.
  Reconcile {
    #[arg(long)]
    shop:        i64,
    /// Proceed even though the shop has no current entries.
    #[arg(long)]
    allow_empty: bool,
    /// Proceed even though every active offering would be discontinued.
    #[arg(long)]
    allow_mass:  bool,
  },
}

#[derive(Subcommand)]
enum StrainCommand {
  /// Find or create the strain for a name.
  Resolve { name: String },
  /// Rename a strain, merging it into another when the name is taken.
  Rename { id: i64, name: String },
  Get { id: i64 },
  /// Look up a strain by any spelling of its name.
  Find { name: String },
  /// Prefix search on display names.
  Suggest {
    #[arg(default_value = "")]
    prefix: String,
    #[arg(long, default_value_t = 30)]
    limit:  usize,
  },
}

#[derive(Subcommand)]
enum EntryCommand {
  /// Add a line to the menu, creating the strain if needed.
  Add {
    #[arg(long)]
    shop:  i64,
    #[arg(long)]
    name:  String,
    #[command(flatten)]
    draft: DraftArgs,
  },
  /// Write the entry for an existing strain.
  Set {
    #[arg(long)]
    shop:   i64,
    #[arg(long)]
    strain: i64,
    #[command(flatten)]
    draft:  DraftArgs,
  },
  /// Edit an entry, renaming its strain if the name changed.
  Edit {
    #[arg(long)]
    shop:  i64,
    #[arg(long)]
    id:    i64,
    #[arg(long)]
    name:  String,
    #[command(flatten)]
    draft: DraftArgs,
  },
  Get {
    #[arg(long)]
    shop: i64,
    #[arg(long)]
    id:   i64,
  },
  List {
    #[arg(long)]
    shop: i64,
  },
  /// Delete the given entries.
  Delete {
    #[arg(long)]
    shop: i64,
    #[arg(required = true)]
    ids:  Vec<i64>,
  },
  /// Delete every entry except the given ones.
  Keep {
    #[arg(long)]
    shop: i64,
    ids:  Vec<i64>,
  },
  Clear {
    #[arg(long)]
    shop: i64,
  },
  /// Start the menu from the shop's active offerings.
  Load {
    #[arg(long)]
    shop:    i64,
    /// Clear current entries first.
    #[arg(long)]
    replace: bool,
  },
}

#[derive(Subcommand)]
enum OfferingCommand {
  /// Copy one entry into the catalogue.
  Sync {
    #[arg(long)]
    shop:  i64,
    #[arg(long)]
    entry: i64,
  },
  /// Force an offering's status.
  Set {
    #[arg(long)]
    shop:   i64,
    #[arg(long)]
    strain: i64,
    #[arg(long, value_enum)]
    status: StatusArg,
    #[arg(long)]
    reason: Option<String>,
    /// Free-text hint such as "back in spring".
    #[arg(long)]
    until:  Option<String>,
    /// Keep the status out of reach of syncs and reconciliation.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    lock:   bool,
  },
  Get {
    #[arg(long)]
    shop:   i64,
    #[arg(long)]
    strain: i64,
  },
  List {
    #[arg(long)]
    shop: i64,
  },
  /// Active offerings in any shop whose strain name contains `query`.
  Find {
    query: String,
    #[arg(long, default_value_t = 200)]
    limit: usize,
  },
}

#[derive(Args)]
struct DraftArgs {
  #[arg(long)]
  category: String,
  #[arg(long, default_value = "€")]
  currency: String,
  /// Price per gram, e.g. `12` or `12,5`.
  #[arg(long)]
  amount:   String,
  /// Mark the line as a cali import.
  #[arg(long)]
  overlay:  bool,
  #[arg(long, default_value = "")]
  note:     String,
}

impl From<DraftArgs> for EntryDraft {
  fn from(args: DraftArgs) -> Self {
    EntryDraft::new(&args.category, &args.currency, &args.amount)
      .with_overlay(args.overlay)
      .with_note(&args.note)
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
  Active,
  Discontinued,
}

// ─── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CliConfig {
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
}

fn default_store_path() -> PathBuf { PathBuf::from("strainbook.db") }

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("STRAINBOOK"))
    .build()
    .context("failed to read config file")?;

  let cli_cfg: CliConfig = settings
    .try_deserialize()
    .context("failed to deserialise CliConfig")?;

  let store_path = expand_tilde(cli.db.as_deref().unwrap_or(cli_cfg.store_path.as_path()));

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::debug!(path = ?store_path, "opened store");

  run(&store, cli.command).await
}

async fn run(store: &SqliteStore, command: Command) -> anyhow::Result<()> {
  match command {
    Command::Strain(cmd) => run_strain(store, cmd).await,
    Command::Entry(cmd) => run_entry(store, cmd).await,
    Command::Offering(cmd) => run_offering(store, cmd).await,
    Command::Check { shop } => emit(&store.safety_check(ShopId(shop)).await?),
    Command::Reconcile { shop, allow_empty, allow_mass } => {
      let overrides = ReconcileOverride { allow_empty, allow_mass };
      emit(&store.reconcile(ShopId(shop), overrides).await?)
    }
  }
}

async fn run_strain(store: &SqliteStore, cmd: StrainCommand) -> anyhow::Result<()> {
  match cmd {
    StrainCommand::Resolve { name } => emit(&store.resolve_or_create(&name).await?),
    StrainCommand::Rename { id, name } => {
      emit(&store.rename_or_merge(StrainId(id), &name).await?)
    }
    StrainCommand::Get { id } => {
      let strain = store
        .get_strain(StrainId(id))
        .await?
        .with_context(|| format!("strain {id} not found"))?;
      emit(&strain)
    }
    StrainCommand::Find { name } => emit(&store.find_strain(&name).await?),
    StrainCommand::Suggest { prefix, limit } => {
      emit(&store.suggest_strains(&prefix, limit).await?)
    }
  }
}

async fn run_entry(store: &SqliteStore, cmd: EntryCommand) -> anyhow::Result<()> {
  match cmd {
    EntryCommand::Add { shop, name, draft } => {
      emit(&store.record_entry(ShopId(shop), &name, &draft.into()).await?)
    }
    EntryCommand::Set { shop, strain, draft } => emit(
      &store
        .upsert_entry(ShopId(shop), StrainId(strain), &draft.into())
        .await?,
    ),
    EntryCommand::Edit { shop, id, name, draft } => emit(
      &store
        .update_entry(ShopId(shop), EntryId(id), &name, &draft.into())
        .await?,
    ),
    EntryCommand::Get { shop, id } => {
      let entry = store
        .get_entry(ShopId(shop), EntryId(id))
        .await?
        .with_context(|| format!("menu entry {id} not found for shop {shop}"))?;
      emit(&entry)
    }
    EntryCommand::List { shop } => emit(&store.list_entries(ShopId(shop)).await?),
    EntryCommand::Delete { shop, ids } => emit(
      &store
        .delete_entries(ShopId(shop), ids.into_iter().map(EntryId).collect())
        .await?,
    ),
    EntryCommand::Keep { shop, ids } => emit(
      &store
        .keep_only_entries(ShopId(shop), ids.into_iter().map(EntryId).collect())
        .await?,
    ),
    EntryCommand::Clear { shop } => emit(&store.clear_entries(ShopId(shop)).await?),
    EntryCommand::Load { shop, replace } => {
      let loaded = store
        .load_entries_from_active_offerings(ShopId(shop), replace)
        .await?;
      emit(&Loaded { loaded })
    }
  }
}

async fn run_offering(store: &SqliteStore, cmd: OfferingCommand) -> anyhow::Result<()> {
  match cmd {
    OfferingCommand::Sync { shop, entry } => emit(
      &store
        .sync_offering_from_entry(ShopId(shop), EntryId(entry))
        .await?,
    ),
    OfferingCommand::Set { shop, strain, status, reason, until, lock } => {
      let status = match status {
        StatusArg::Active => ManualStatus::Active,
        StatusArg::Discontinued => ManualStatus::Discontinued { reason, until_hint: until },
      };
      emit(
        &store
          .set_offering_status(ShopId(shop), StrainId(strain), status, lock)
          .await?,
      )
    }
    OfferingCommand::Get { shop, strain } => {
      let offering = store
        .get_offering(ShopId(shop), StrainId(strain))
        .await?
        .with_context(|| format!("no offering of strain {strain} for shop {shop}"))?;
      emit(&offering)
    }
    OfferingCommand::List { shop } => emit(&store.list_offerings(ShopId(shop)).await?),
    OfferingCommand::Find { query, limit } => {
      emit(&store.find_active_offerings(&query, limit).await?)
    }
  }
}

#[derive(Serialize)]
struct Loaded {
  loaded: usize,
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("failed to encode output")?;
  println!("{json}");
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
