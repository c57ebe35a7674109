//! ordrfs: restaurant catalog filesystem CLI
//!
//! Commands:
//!   mount [<backing>] [<mnt>]  - mount the catalog over a backing directory
//!   unmount <mnt>              - unmount a mounted projection
//!   catalog list               - print categories and their restaurants
//!   catalog check              - verify the catalog store is reachable
//!   menu <restaurant>          - print a restaurant's rendered menu
//!   order <id> --item ...      - submit an order to the ordering service
//!   config show                - display the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use ordrfs_catalog::{
    build_operator, check_health, load_snapshot, CatalogSource, OpendalCatalog, OrderItem,
    OrderRequest,
};
use ordrfs_core::config::{expand_tilde, OrdrfsConfig};
use ordrfs_core::{sanitize_name, CatalogSnapshot, RestaurantRecord};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "ordrfs",
    version,
    about = "Restaurant catalog filesystem",
    long_about = "ordrfs: browse a food-ordering catalog as directories and menu files"
)]
struct Cli {
    /// Path to the ordrfs configuration file
    #[arg(
        long,
        short = 'c',
        env = "ORDRFS_CONFIG",
        default_value = "~/.config/ordrfs/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [log].level
    #[arg(long, env = "ORDRFS_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides [log].format
    #[arg(long, env = "ORDRFS_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mount the catalog over a backing directory (requires FUSE)
    #[cfg(feature = "fuse")]
    Mount {
        /// Real directory the namespace is overlaid on (default: [mount].backing_dir)
        backing_dir: Option<PathBuf>,
        /// Local mountpoint (default: [mount].mountpoint)
        mountpoint: Option<PathBuf>,
        /// Let other users access the mount
        #[arg(long)]
        allow_other: bool,
    },

    /// Unmount an ordrfs mountpoint (requires FUSE)
    #[cfg(feature = "fuse")]
    Unmount {
        /// Local mountpoint to unmount
        mountpoint: PathBuf,
    },

    /// Catalog inspection
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// Print the menu of a restaurant (by directory name or id)
    Menu {
        restaurant: String,
    },

    /// Submit an order to the ordering service
    ///
    /// Orders are never placed by writing into the mounted filesystem.
    Order {
        /// Restaurant id
        restaurant_id: String,
        /// Menu item as `id` or `id:quantity` (repeatable)
        #[arg(long = "item", short = 'i', required = true)]
        items: Vec<String>,
        /// Tip amount
        #[arg(long, default_value = "0.00")]
        tip: String,
        /// Print the receipt as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogAction {
    /// Print every category with the restaurants filed under it
    List,
    /// Check that the catalog store is reachable
    Check,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = OrdrfsConfig::load(&config_path)?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or_else(|| {
        LogFormat::from_str(&config.log.format, true).unwrap_or(LogFormat::Text)
    });
    init_logging(&level, &format);

    if !config_path.exists() {
        warn!("config file not found: {}  (using defaults)", config_path.display());
    }

    match cli.command {
        #[cfg(feature = "fuse")]
        Commands::Mount {
            backing_dir,
            mountpoint,
            allow_other,
        } => cmd_mount(&config, backing_dir, mountpoint, allow_other).await,
        #[cfg(feature = "fuse")]
        Commands::Unmount { mountpoint } => cmd_unmount(&mountpoint),
        Commands::Catalog {
            action: CatalogAction::List,
        } => cmd_catalog_list(&config).await,
        Commands::Catalog {
            action: CatalogAction::Check,
        } => cmd_catalog_check(&config).await,
        Commands::Menu { restaurant } => cmd_menu(&config, &restaurant).await,
        Commands::Order {
            restaurant_id,
            items,
            tip,
            json,
        } => cmd_order(&config, restaurant_id, &items, tip, json).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Catalog helpers ───────────────────────────────────────────────────────────

fn open_catalog(config: &OrdrfsConfig) -> Result<OpendalCatalog> {
    let op = build_operator(&config.catalog).context("building catalog operator")?;
    Ok(OpendalCatalog::new(op, config.catalog.prefix.clone()))
}

async fn fetch_snapshot(config: &OrdrfsConfig) -> Result<CatalogSnapshot> {
    let catalog = open_catalog(config)?;
    let snapshot = load_snapshot(&catalog)
        .await
        .context("loading catalog snapshot")?;
    info!(
        categories = snapshot.category_count(),
        restaurants = snapshot.restaurant_count(),
        "catalog loaded"
    );
    Ok(snapshot)
}

/// Find a restaurant by its directory name, its raw name, or its id.
fn find_restaurant<'a>(snapshot: &'a CatalogSnapshot, query: &str) -> Option<&'a RestaurantRecord> {
    snapshot
        .restaurant(query)
        .or_else(|| snapshot.restaurant(&sanitize_name(query)))
        .or_else(|| snapshot.restaurants().find(|r| r.id == query))
}

// ── `ordrfs mount` (requires fuse feature) ───────────────────────────────────

#[cfg(feature = "fuse")]
async fn cmd_mount(
    config: &OrdrfsConfig,
    backing_dir: Option<PathBuf>,
    mountpoint: Option<PathBuf>,
    allow_other: bool,
) -> Result<()> {
    let backing_dir = expand_tilde(&backing_dir.unwrap_or_else(|| config.mount.backing_dir.clone()));
    let mountpoint = mountpoint
        .or_else(|| config.mount.mountpoint.clone())
        .context("no mountpoint given and [mount].mountpoint is not set")?;
    let mountpoint = expand_tilde(&mountpoint);

    // A mount never starts on a partial or empty catalog
    let snapshot = fetch_snapshot(config).await?;

    tokio::fs::create_dir_all(&mountpoint)
        .await
        .with_context(|| format!("creating mountpoint: {}", mountpoint.display()))?;

    println!(
        "Mounting {} categories / {} restaurants over {} → {}",
        snapshot.category_count(),
        snapshot.restaurant_count(),
        backing_dir.display(),
        mountpoint.display()
    );
    println!("Press Ctrl-C or run `ordrfs unmount {}` to stop.", mountpoint.display());

    ordrfs_fuse::mount(ordrfs_fuse::MountConfig {
        snapshot: std::sync::Arc::new(snapshot),
        backing_dir,
        mountpoint,
        allow_other: allow_other || config.mount.allow_other,
        attr_ttl: std::time::Duration::from_secs(config.mount.attr_ttl_secs),
    })
    .await
    .context("FUSE mount failed")
}

// ── `ordrfs unmount` (requires fuse feature) ─────────────────────────────────

#[cfg(feature = "fuse")]
fn cmd_unmount(mountpoint: &Path) -> Result<()> {
    // macOS: umount works with FUSE-T and macFUSE
    // Linux: fusermount3 first, then plain umount
    #[cfg(target_os = "macos")]
    let attempts: &[(&str, &[&str])] = &[("umount", &[])];
    #[cfg(not(target_os = "macos"))]
    let attempts: &[(&str, &[&str])] = &[("fusermount3", &["-u"]), ("umount", &[])];

    let mut last_err = None;
    for (program, args) in attempts {
        match std::process::Command::new(program)
            .args(*args)
            .arg(mountpoint)
            .status()
        {
            Ok(s) if s.success() => {
                println!("Unmounted: {}", mountpoint.display());
                return Ok(());
            }
            Ok(s) => last_err = Some(format!("{program} exited {s}")),
            Err(e) => last_err = Some(format!("failed to run {program}: {e}")),
        }
    }
    anyhow::bail!(
        "{}: unmount {} manually",
        last_err.unwrap_or_default(),
        mountpoint.display()
    )
}

// ── `ordrfs catalog` ─────────────────────────────────────────────────────────

async fn cmd_catalog_list(config: &OrdrfsConfig) -> Result<()> {
    let snapshot = fetch_snapshot(config).await?;
    for category in snapshot.categories() {
        println!("{category}/");
        for name in snapshot.restaurants_in(category) {
            let id = snapshot.restaurant(name).map_or("?", |r| r.id.as_str());
            println!("    {name}  [{id}]");
        }
    }
    println!();
    println!(
        "{} categories, {} restaurants",
        snapshot.category_count(),
        snapshot.restaurant_count()
    );
    Ok(())
}

async fn cmd_catalog_check(config: &OrdrfsConfig) -> Result<()> {
    let catalog = open_catalog(config)?;
    let location = match config.catalog.backend {
        ordrfs_core::config::CatalogBackend::Http => config.catalog.endpoint.clone(),
        ordrfs_core::config::CatalogBackend::Fs => {
            expand_tilde(&config.catalog.root).display().to_string()
        }
        ordrfs_core::config::CatalogBackend::Memory => "memory".to_string(),
    };

    match check_health(catalog.operator(), catalog.prefix()).await {
        Ok(()) => {
            println!("catalog: {location} [ok]");
            Ok(())
        }
        Err(e) => {
            println!("catalog: {location} [UNREACHABLE]");
            Err(e.context("catalog health check failed"))
        }
    }
}

// ── `ordrfs menu` ────────────────────────────────────────────────────────────

async fn cmd_menu(config: &OrdrfsConfig, query: &str) -> Result<()> {
    let snapshot = fetch_snapshot(config).await?;
    let restaurant = find_restaurant(&snapshot, query)
        .with_context(|| format!("no restaurant named or numbered {query:?}"))?;

    println!("{}", restaurant.name);
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&restaurant.render_menu())
        .context("writing menu")?;
    Ok(())
}

// ── `ordrfs order` ───────────────────────────────────────────────────────────

fn parse_items(specs: &[String]) -> Result<Vec<OrderItem>> {
    specs
        .iter()
        .map(|s| OrderItem::parse(s).with_context(|| format!("invalid item {s:?} (expected id or id:qty)")))
        .collect()
}

async fn cmd_order(
    config: &OrdrfsConfig,
    restaurant_id: String,
    items: &[String],
    tip: String,
    json: bool,
) -> Result<()> {
    let order = OrderRequest {
        restaurant_id,
        items: parse_items(items)?,
        tip,
        account: config.account.clone(),
    };
    let catalog = open_catalog(config)?;
    let receipt = catalog
        .submit_order(&order)
        .await
        .context("submitting order")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&receipt).context("serializing receipt")?
        );
    } else {
        println!("order:     {}", if receipt.success { "accepted" } else { "REJECTED" });
        println!("reference: {}", receipt.reference_number);
        if !receipt.message.is_empty() {
            println!("message:   {}", receipt.message);
        }
    }

    if !receipt.success {
        anyhow::bail!("order was not accepted");
    }
    Ok(())
}

// ── `ordrfs config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &OrdrfsConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use ordrfs_core::MenuRecord;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn order_arguments() {
        let cli = Cli::try_parse_from([
            "ordrfs", "order", "42", "--item", "201:2", "-i", "301", "--tip", "1.50",
        ])
        .unwrap();
        match cli.command {
            Commands::Order {
                restaurant_id,
                items,
                tip,
                json,
            } => {
                assert_eq!(restaurant_id, "42");
                assert_eq!(tip, "1.50");
                assert!(!json);
                let parsed = parse_items(&items).unwrap();
                assert_eq!(parsed[0].quantity, 2);
                assert_eq!(parsed[1].item_id, "301");
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["ordrfs", "order", "42"]).is_err());
        assert!(parse_items(&["201:zero".to_string()]).is_err());
    }

    #[test]
    fn restaurant_lookup_by_name_or_id() {
        let snapshot = CatalogSnapshot::from_records(vec![RestaurantRecord {
            id: "43".into(),
            name: "A/B Grill".into(),
            cuisine: ["Grill".to_string()].into(),
            address: String::new(),
            city: String::new(),
            phone: String::new(),
            menu: MenuRecord::default(),
        }]);

        assert_eq!(find_restaurant(&snapshot, "A/B Grill").unwrap().id, "43");
        assert_eq!(find_restaurant(&snapshot, "A\u{2215}B Grill").unwrap().id, "43");
        assert_eq!(find_restaurant(&snapshot, "43").unwrap().id, "43");
        assert!(find_restaurant(&snapshot, "nope").is_none());
    }

    #[test]
    fn log_flags_override_config() {
        let cli = Cli::try_parse_from(["ordrfs", "--log", "debug", "--log-format", "json", "config", "show"])
            .unwrap();
        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }
}
