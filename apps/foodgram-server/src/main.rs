use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use api_ingress::{ApiIngress, ApiIngressConfig};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use recipes::infra::loaders;
use recipes::{RecipesConfig, RecipesModule};
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use url::Url;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const RECIPES_MODULE: &str = "recipes";
const API_INGRESS_MODULE: &str = "api_ingress";
const MEMORY_DSN: &str = "sqlite::memory:";

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Adds `mode=rwc` so a missing database file is created.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case(MEMORY_DSN) || dsn.eq_ignore_ascii_case("sqlite://:memory:") {
        return Ok(MEMORY_DSN.to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    out.push('?');
    out.push_str(query.unwrap_or("mode=rwc"));
    Ok(out)
}

/// Foodgram Server - recipe sharing backend
#[derive(Parser)]
#[command(name = "foodgram-server")]
#[command(about = "Foodgram Server - recipe sharing backend")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database instead of the configured one
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
    /// Apply database migrations and exit
    Migrate,
    /// Load ingredients from a CSV (name,measurement_unit) or JSON file
    LoadIngredients {
        /// Path to the ingredients file
        file: PathBuf,
    },
    /// Load tags from a JSON file
    LoadTags {
        /// Path to the tags file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Foodgram Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config),
        Commands::Migrate => {
            let db = connect_db(&config, &args).await?;
            RecipesModule::migrate(&db).await?;
            println!("Migrations applied");
            Ok(())
        }
        Commands::LoadIngredients { file } => {
            let items = loaders::read_ingredients(&file)?;
            let total = items.len();
            let module = recipes_module(&config, &args).await?;
            let created = module.client().load_ingredients(items).await?;
            println!("Loaded {created} new ingredients ({total} in file)");
            Ok(())
        }
        Commands::LoadTags { file } => {
            let tags = loaders::read_tags(&file)?;
            let total = tags.len();
            let module = recipes_module(&config, &args).await?;
            let created = module.client().load_tags(tags).await?;
            println!("Loaded {created} new tags ({total} in file)");
            Ok(())
        }
    }
}

/// Detect DB backend from URL scheme.
fn detect_from_dsn(cfg: &DatabaseConfig) -> Result<&'static str> {
    let raw = cfg.url.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    if raw.eq_ignore_ascii_case(MEMORY_DSN) {
        return Ok("sqlite");
    }

    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;

    match url.scheme() {
        "sqlite" | "sqlite3" => Ok("sqlite"),
        "postgres" | "postgresql" => Ok("postgres"),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

async fn connect_db(config: &AppConfig, args: &CliArgs) -> Result<DatabaseConnection> {
    let db_config = config
        .database
        .clone()
        .ok_or_else(|| anyhow!("Database configuration is missing"))?;

    let dsn = if args.mock {
        MEMORY_DSN.to_string()
    } else {
        detect_from_dsn(&db_config)?;
        let dsn = db_config.url.trim().to_string();
        if dsn.starts_with("sqlite://") {
            absolutize_sqlite_dsn(&dsn, Path::new(&config.server.home_dir), true)?
        } else {
            dsn
        }
    };

    let mut opts = ConnectOptions::new(dsn.clone());
    // every pooled in-memory connection would get its own empty database
    let max_conns = if dsn == MEMORY_DSN {
        1
    } else {
        db_config.max_conns.unwrap_or(10)
    };
    opts.max_connections(max_conns)
        .acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    if let Some(ms) = db_config.busy_timeout_ms {
        opts.map_sqlx_sqlite_opts(move |o| o.busy_timeout(Duration::from_millis(u64::from(ms))));
    }

    tracing::info!("Connecting to database: {}", redact_dsn(&dsn));
    let db = Database::connect(opts)
        .await
        .with_context(|| format!("Failed to connect to database {}", redact_dsn(&dsn)))?;
    tracing::info!("Connected DB backend: {:?}", db.get_database_backend());
    Ok(db)
}

/// Hide the password part of a DSN for logging.
fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => dsn.to_string(),
    }
}

/// Connect, migrate and wire the recipes module.
async fn recipes_module(config: &AppConfig, args: &CliArgs) -> Result<RecipesModule> {
    let recipes_cfg: RecipesConfig = config.module_config(RECIPES_MODULE)?;
    let media_root = config.resolve_path(&recipes_cfg.media_root);
    std::fs::create_dir_all(&media_root)
        .with_context(|| format!("Failed to create media root {}", media_root.display()))?;

    let db = connect_db(config, args).await?;
    RecipesModule::migrate(&db).await?;
    Ok(RecipesModule::new(db, recipes_cfg, media_root))
}

fn bind_addr(config: &AppConfig) -> Result<SocketAddr> {
    let raw = format!("{}:{}", config.server.host, config.server.port);
    raw.parse()
        .with_context(|| format!("Invalid bind address '{raw}'"))
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Initializing modules...");

    let ingress_cfg: ApiIngressConfig = config.module_config(API_INGRESS_MODULE)?;
    let addr = bind_addr(&config)?;
    let module = recipes_module(&config, &args).await?;

    let ingress = ApiIngress::new(ingress_cfg);
    let router = ingress.build_router(module.router(), RecipesModule::openapi());
    ingress
        .serve(router, addr, api_ingress::shutdown_signal())
        .await
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    let _: RecipesConfig = config.module_config(RECIPES_MODULE)?;
    let _: ApiIngressConfig = config.module_config(API_INGRESS_MODULE)?;
    bind_addr(&config)?;
    if let Some(db) = &config.database {
        detect_from_dsn(db)?;
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
