use std::{path::PathBuf, sync::LazyLock};

use clap::Parser;
use ido_cleanup::{
    config::{self, ConfigError, DaemonConfig, DatabaseConfig, LogLevel},
    observability, registry,
    retention::RoundResult,
    shutdown, startup,
};

/// Version with optional commit and build date, injected at compile time.
static VERSION: LazyLock<String> = LazyLock::new(|| {
    build_version(
        env!("CARGO_PKG_VERSION"),
        option_env!("IDO_CLEANUP_COMMIT"),
        option_env!("IDO_CLEANUP_BUILD_DATE"),
    )
});

fn build_version(version: &str, commit: Option<&str>, date: Option<&str>) -> String {
    let mut result = version.to_string();
    if let Some(commit) = commit.filter(|c| !c.is_empty()) {
        result.push_str(&format!("\ncommit: {commit}"));
    }
    if let Some(date) = date.filter(|d| !d.is_empty()) {
        result.push_str(&format!("\ndate: {date}"));
    }
    result
}

#[derive(Parser, Debug)]
#[command(
    version = VERSION.as_str(),
    about = "Icinga IDO Cleanup",
    long_about = "Periodically deletes old rows from the Icinga IDO history tables, \
                  in bounded batches, speeding up while a backlog remains."
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to an optional TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database URL (mysql://, postgres://, sqlite: or a Go MySQL DSN)
    #[arg(long, env = "DB_DSN", global = true)]
    db: Option<String>,

    /// IDO instance name
    #[arg(long, global = true)]
    instance: Option<String>,

    /// Limit deleting rows in one query
    #[arg(long, global = true)]
    limit: Option<u64>,

    /// Cleanup every X seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    interval: Option<u64>,

    /// Cleanup every X seconds while a table hits the limit
    #[arg(long, value_name = "SECONDS", global = true)]
    fast_interval: Option<u64>,

    /// Just run once
    #[arg(long, global = true)]
    once: bool,

    /// Just check - don't purge
    #[arg(long, global = true)]
    noop: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// How long to keep entries of a table in days (0 disables cleanup)
    #[arg(
        long = "age",
        value_name = "TABLE=DAYS",
        value_parser = parse_age,
        global = true
    )]
    ages: Vec<(String, u32)>,
}

#[derive(clap::Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    /// Run the cleanup daemon (default)
    #[default]
    Run,
    /// List the known tables with their effective retention ages
    Tables,
    /// Connect, resolve the instance and report eligible rows without deleting
    Check,
}

fn parse_age(value: &str) -> Result<(String, u32), String> {
    let (table, days) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TABLE=DAYS, got '{value}'"))?;
    let days = days
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid number of days '{days}': {e}"))?;
    Ok((table.trim().to_string(), days))
}

/// Load the config file (if any) and apply command line flags on top.
fn load_config(args: &Args) -> Result<DaemonConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => DaemonConfig::from_file(path)?,
        None => DaemonConfig::default(),
    };

    if let Some(url) = &args.db {
        config.database = DatabaseConfig::from_url(url)?;
    } else if config.database.is_none() {
        config.database = DatabaseConfig::from_url(config::DEFAULT_DATABASE_URL)?;
    }
    if let Some(instance) = &args.instance {
        config.cleanup.instance = instance.clone();
    }
    if let Some(limit) = args.limit {
        config.cleanup.limit = limit;
    }
    if let Some(interval) = args.interval {
        config.cleanup.interval_secs = interval;
    }
    if let Some(fast_interval) = args.fast_interval {
        config.cleanup.fast_interval_secs = fast_interval;
    }
    config.cleanup.once |= args.once;
    config.cleanup.dry_run |= args.noop;
    if args.debug {
        config.observability.logging.level = LogLevel::Debug;
    }
    for (table, days) in &args.ages {
        config.retention.set_age(table.clone(), *days);
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match args.command.unwrap_or_default() {
        Command::Run => run(config).await,
        Command::Tables => print_tables(&config),
        Command::Check => check(config).await,
    }
}

async fn run(config: DaemonConfig) {
    if let Err(e) = startup::init_observability(&config.observability) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = config.database.kind(),
        instance = %config.cleanup.instance,
        "Starting ido-cleanup"
    );

    let (db, mut scheduler) = match startup::bootstrap(&config).await {
        Ok(started) => started,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let shutdown = shutdown::install_signal_handler();
    scheduler.run(&shutdown).await;

    db.close().await;
    tracing::info!("Stopping ido-cleanup");
}

fn print_tables(config: &DaemonConfig) {
    println!("{:<28} {:<16} {:>8}", "TABLE", "TIME COLUMN", "AGE");
    for table in registry::KNOWN_TABLES {
        let age = config.retention.age_for(table.name);
        let age = if age == 0 {
            "-".to_string()
        } else {
            format!("{age}d")
        };
        println!(
            "{:<28} {:<16} {:>8}",
            table.qualified_name(&config.cleanup.table_prefix),
            table.time_column,
            age
        );
    }
}

async fn check(mut config: DaemonConfig) {
    config.cleanup.dry_run = true;
    config.cleanup.once = true;

    if let Err(e) = observability::init_tracing(&config.observability.logging) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let db = match startup::connect(&config).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let instance_id =
        match startup::resolve_instance(db.instances().as_ref(), &config.cleanup.instance).await {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        };

    let result = startup::build_round(&db, &config, instance_id).run().await;
    db.close().await;

    print_check(&config, instance_id, &result);
    if result.errors() > 0 {
        std::process::exit(1);
    }
}

fn print_check(config: &DaemonConfig, instance_id: i64, result: &RoundResult) {
    println!(
        "Instance '{}' (id {instance_id}), database {}",
        config.cleanup.instance,
        config.database.kind()
    );
    println!("{:<28} {:>12}  {}", "TABLE", "ELIGIBLE", "OLDEST");
    for outcome in &result.outcomes {
        let oldest = outcome
            .oldest
            .map(|ts| ts.to_string())
            .unwrap_or_else(|| "-".to_string());
        match &outcome.error {
            Some(e) => println!("{:<28} {:>12}  {e}", outcome.table, "error"),
            None => println!("{:<28} {:>12}  {oldest}", outcome.table, outcome.rows),
        }
    }
    println!("Total eligible rows: {}", result.total_rows());
}
