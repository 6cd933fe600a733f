use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gma_core::role::Role;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::session::Credentials;

const DEFAULT_LOG_FILTER: &str = "warn,gma_interaction=info,gma_application=info";

#[derive(Parser)]
#[command(name = "gma")]
#[command(about = "GMA CLI - ministry reports and measurements from the terminal", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.config/gma/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    credentials: CredentialArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CredentialArgs {
    /// CAS username
    #[arg(short, long, global = true, env = "GMA_USERNAME")]
    username: Option<String>,

    /// CAS password
    #[arg(short, long, global = true, env = "GMA_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Args)]
struct RoleArg {
    /// staff or director
    #[arg(long, default_value = "staff")]
    role: Role,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print the current user
    Login,
    /// List the nodes assigned to you
    Assignments {
        #[command(flatten)]
        role: RoleArg,
    },
    /// List your latest reports for a node
    Reports {
        node: String,
        #[command(flatten)]
        role: RoleArg,
    },
    /// Show the measurements of a node's report
    Measurements {
        node: String,
        #[command(flatten)]
        role: RoleArg,
        /// Report covering this date (YYYYMMDD or YYYY-MM-DD); latest report otherwise
        #[arg(long)]
        date: Option<String>,
    },
    /// Set and save one measurement value
    SetValue {
        node: String,
        measurement_id: String,
        value: f64,
        #[command(flatten)]
        role: RoleArg,
        #[arg(long)]
        date: Option<String>,
    },
    /// Generate graph data for a node
    Graph {
        node: String,
        /// Strategy id or name (repeatable)
        #[arg(long = "strategy")]
        strategies: Vec<String>,
        /// Measurement id or name (repeatable)
        #[arg(long = "measurement")]
        measurements: Vec<String>,
        /// Language id, name or code (en, ko, zh-hans)
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a config file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();
    let credentials = Credentials {
        username: cli.credentials.username,
        password: cli.credentials.password,
    };

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(config_path)?,
            ConfigAction::Init { force } => commands::config::init(config_path, force)?,
        },
        Commands::Login => commands::session::login(config_path, &credentials).await?,
        Commands::Assignments { role } => {
            commands::reports::assignments(config_path, &credentials, role.role).await?
        }
        Commands::Reports { node, role } => {
            commands::reports::reports(config_path, &credentials, &node, role.role).await?
        }
        Commands::Measurements { node, role, date } => {
            commands::reports::measurements(config_path, &credentials, &node, role.role, date.as_deref())
                .await?
        }
        Commands::SetValue {
            node,
            measurement_id,
            value,
            role,
            date,
        } => {
            commands::reports::set_value(
                config_path,
                &credentials,
                &node,
                role.role,
                date.as_deref(),
                &measurement_id,
                value,
            )
            .await?
        }
        Commands::Graph {
            node,
            strategies,
            measurements,
            language,
            start,
            end,
            json,
        } => {
            let request = commands::graph::GraphArgs {
                node,
                strategies,
                measurements,
                language,
                start,
                end,
                json,
            };
            commands::graph::run(config_path, &credentials, request).await?
        }
    }

    Ok(())
}
