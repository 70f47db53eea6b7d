//! pgunion CLI
//!
//! Connects with retry and runs one of a few commands against the sample
//! customers/companies schema.

use clap::{Parser, Subcommand};
use pgunion::config::DEFAULT_CONFIG_PATH;
use pgunion::schema::{create_schema, Company, Customer};
use pgunion::{
    union_all, ConnectionError, DatabaseConfig, HookRegistry, LifeError, LifeModelTrait,
    MayPostgresExecutor, SelectQuery, UnionError,
};
use sea_query::{Expr, ExprTrait, Order};
use std::process;

#[derive(Parser)]
#[command(name = "pgunion")]
#[command(about = "Compose UNION ALL queries over the customers schema")]
#[command(version)]
struct Cli {
    /// Settings file; its `[database]` section supplies the defaults below
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Connection string for postgres
    #[arg(long, env = "PGUNION_DATABASE_URL")]
    postgres: Option<String>,

    /// Give up connecting after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Wait between connection attempts, in milliseconds
    #[arg(long)]
    retry_ms: Option<u64>,

    /// Leave the elapsed time out of logged queries
    #[arg(long)]
    no_execution_time: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Flags given on the command line win over the loaded settings
    fn apply_to(&self, mut config: DatabaseConfig) -> DatabaseConfig {
        if let Some(url) = &self.postgres {
            config.url = url.clone();
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.connect_timeout_seconds = timeout_secs;
        }
        if let Some(retry_ms) = self.retry_ms {
            config.retry_interval_ms = retry_ms;
        }
        if self.no_execution_time {
            config.log_execution_time = false;
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and run the liveness check
    Ping,

    /// Create the sample schema if missing
    Schema,

    /// Select customers by name, one UNION ALL branch per name
    Union {
        /// Customer names
        #[arg(required = true)]
        names: Vec<String>,

        /// Limit applied to the combined rows
        #[arg(long)]
        limit: Option<u64>,

        /// Also load the companies of each customer
        #[arg(long)]
        with_companies: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Query(#[from] LifeError),
    #[error(transparent)]
    Union(#[from] UnionError),
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let loaded = DatabaseConfig::load_from(&cli.config).unwrap_or_else(|e| {
        log::warn!("Using default database settings: {e}");
        DatabaseConfig::default()
    });
    let config = cli.apply_to(loaded);

    let registry = HookRegistry::new();
    let result = config
        .establish(&registry)
        .map_err(CliError::from)
        .and_then(|executor| match cli.command {
            Commands::Ping => handle_ping(&executor),
            Commands::Schema => create_schema(&executor).map_err(CliError::from),
            Commands::Union {
                names,
                limit,
                with_companies,
            } => handle_union(&executor, &names, limit, with_companies),
        });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn handle_ping(executor: &MayPostgresExecutor) -> Result<(), CliError> {
    executor.check_health()?;
    println!("ok");
    Ok(())
}

fn handle_union(
    executor: &MayPostgresExecutor,
    names: &[String],
    limit: Option<u64>,
    with_companies: bool,
) -> Result<(), CliError> {
    let branches: Vec<SelectQuery<Customer>> = names
        .iter()
        .map(|name| Customer::find().filter(Expr::col(Customer::NAME).eq(name.as_str())))
        .collect();

    let mut combined = union_all(&branches)?.order_by(Customer::NAME, Order::Asc);
    if let Some(limit) = limit {
        combined = combined.limit(limit);
    }

    if with_companies {
        for (customer, companies) in combined.find_with_related::<Company>().all(executor)? {
            let names: Vec<&str> = companies.iter().map(|c| c.name.as_str()).collect();
            println!("{}\t{}\t{}", customer.id, customer.name, names.join(", "));
        }
    } else {
        for customer in combined.all(executor)? {
            println!("{}\t{}", customer.id, customer.name);
        }
    }
    Ok(())
}
