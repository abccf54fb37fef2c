mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, Subcommand};
use strata_core::{init_logging, LogFormat, LoggingConfig, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version, about = "Apply ordered SQL migrations to MySQL and PostgreSQL")]
struct Cli {
    /// Connection configuration file (JSON, or YAML by extension)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format: pretty, compact or json
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the migrations ledger table
    Init,

    /// Apply migrations
    #[command(group(ArgGroup::new("target").required(true).args(["all", "name"])))]
    Migrate {
        /// Apply every pending migration in --dir
        #[arg(long)]
        all: bool,

        /// Apply a single migration file
        #[arg(long, value_name = "PATH")]
        name: Option<PathBuf>,

        /// Migrations directory used with --all
        #[arg(long, default_value = "./migrations")]
        dir: PathBuf,
    },

    /// Create an empty, timestamped migration file
    New {
        /// Migration name, e.g. add_users
        #[arg(long)]
        name: String,

        /// Directory to create the file in
        #[arg(long, default_value = "./migrations")]
        dir: PathBuf,
    },

    /// Show applied and pending migrations
    Status {
        /// Migrations directory
        #[arg(long, default_value = "./migrations")]
        dir: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    if let Err(e) = init_logging(logging.with_format(cli.log_format)) {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init => commands::init::run(&cli.config).await,
        Commands::Migrate { all, name, dir } => match (all, name) {
            (_, Some(path)) => commands::migrate::single(&cli.config, &path).await,
            (true, None) => commands::migrate::batch(&cli.config, &dir).await,
            (false, None) => anyhow::bail!("either --all or --name is required"),
        },
        Commands::New { name, dir } => commands::new::run(&dir, &name),
        Commands::Status { dir, json } => commands::status::run(&cli.config, &dir, json).await,
    }
}
