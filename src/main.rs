use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use manila_client::config::Config;
use manila_client::resource::manager::ListOptions;
use manila_client::utils::{extract_properties, format_properties};
use manila_client::{format_error, ApiVersion, Client};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command line client for the Shared File Systems API
#[derive(Parser, Debug)]
#[command(name = "manila", version, about, long_about = None)]
struct Args {
    /// Share API endpoint, e.g. http://controller:8786/v2/<project>
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Auth token (defaults to OS_AUTH_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// API microversion to negotiate, e.g. 2.56
    #[arg(long, global = true)]
    api_version: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Output format
    #[arg(long, value_enum, default_value = "json", global = true)]
    output: OutputFormat,

    /// Config file (defaults to <config dir>/manila/config.json)
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage shares
    #[command(subcommand)]
    Share(ShareCommand),
    /// Manage share group replicas
    #[command(subcommand)]
    Replica(ReplicaCommand),
    /// Show or change the saved configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the saved configuration
    Show,
    /// Save the share API endpoint
    SetEndpoint { endpoint: String },
    /// Save the API microversion to negotiate
    SetApiVersion { version: String },
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
    /// Only return resources in this status
    #[arg(long)]
    status: Option<String>,
    /// Key to sort by
    #[arg(long)]
    sort_key: Option<String>,
    /// Sort direction (asc or desc)
    #[arg(long)]
    sort_dir: Option<String>,
    /// Include resources of all projects (admin only)
    #[arg(long)]
    all_tenants: bool,
}

impl ListArgs {
    fn into_options(self) -> ListOptions {
        let mut options = ListOptions::default();
        if let Some(status) = self.status {
            options = options.search("status", status);
        }
        if self.all_tenants {
            options = options.search("all_tenants", 1);
        }
        options.sort_key = self.sort_key;
        options.sort_dir = self.sort_dir;
        options
    }
}

#[derive(Subcommand, Debug)]
enum ShareCommand {
    /// List shares
    List(ListArgs),
    /// Show one share
    Show { id: String },
    /// Delete a share
    Delete {
        id: String,
        /// Delete regardless of the share's state
        #[arg(long)]
        force: bool,
    },
    /// Grow a share to a new size in GiB
    Extend { id: String, size: u64 },
    /// Shrink a share to a new size in GiB
    Shrink { id: String, size: u64 },
    /// Ask the service to set a share's status
    ResetState { id: String, state: String },
    /// Grant access to a share
    AccessAllow {
        id: String,
        /// ip, user or cert
        access_type: String,
        access_to: String,
        /// rw or ro
        #[arg(long)]
        level: Option<String>,
    },
    /// Revoke an access rule
    AccessDeny { id: String, rule: String },
    /// List access rules of a share
    AccessList { id: String },
    /// Set metadata given as key=value pairs
    MetadataSet {
        id: String,
        #[arg(required = true)]
        properties: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ReplicaCommand {
    /// List share group replicas
    List {
        /// Only replicas of this share group
        #[arg(long)]
        share_group: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Promote a replica to active
    Promote { id: String },
    /// Re-sync a replica
    Resync { id: String },
    /// Delete a replica
    Delete {
        id: String,
        #[arg(long)]
        force: bool,
    },
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("manila started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("manila").join("manila.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".manila").join("manila.log");
    }
    PathBuf::from("manila.log")
}

fn print_output<T: Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn config_file(override_path: Option<&Path>) -> Result<PathBuf> {
    override_path
        .map(Path::to_path_buf)
        .or_else(Config::config_path)
        .context("Cannot determine the config directory; use --config")
}

fn load_config(args: &Args) -> Config {
    match config_file(args.config_file.as_deref()) {
        Ok(path) => Config::load_from(&path),
        Err(_) => Config::default(),
    }
}

fn build_client(args: &Args) -> Result<Client> {
    let mut config = load_config(args);
    if args.endpoint.is_some() {
        config.endpoint = args.endpoint.clone();
    }
    if args.token.is_some() {
        config.token = args.token.clone();
    }
    if let Some(raw) = &args.api_version {
        let version: ApiVersion = raw.parse()?;
        config.api_version = Some(version);
    }

    Client::from_config(&config).context("Failed to initialize share API client")
}

async fn run_share(client: &Client, command: ShareCommand, output: OutputFormat) -> Result<()> {
    let shares = client.shares();
    match command {
        ShareCommand::List(list) => print_output(output, &shares.list(list.into_options()).await?),
        ShareCommand::Show { id } => print_output(output, &shares.get(id.as_str()).await?),
        ShareCommand::Delete { id, force } => {
            if force {
                shares.force_delete(id.as_str()).await?;
            } else {
                shares.delete(id.as_str(), None).await?;
            }
            Ok(())
        }
        ShareCommand::Extend { id, size } => Ok(shares.extend(id.as_str(), size).await?),
        ShareCommand::Shrink { id, size } => Ok(shares.shrink(id.as_str(), size).await?),
        ShareCommand::ResetState { id, state } => {
            Ok(shares.reset_state(id.as_str(), &state).await?)
        }
        ShareCommand::AccessAllow {
            id,
            access_type,
            access_to,
            level,
        } => {
            let rule = shares
                .allow(id.as_str(), &access_type, &access_to, level.as_deref())
                .await?;
            print_output(output, &rule)
        }
        ShareCommand::AccessDeny { id, rule } => {
            Ok(shares.deny(id.as_str(), rule.as_str()).await?)
        }
        ShareCommand::AccessList { id } => {
            print_output(output, &shares.access_list(id.as_str()).await?)
        }
        ShareCommand::MetadataSet { id, properties } => {
            let metadata = extract_properties(properties.as_slice())?;
            let updated = shares.set_metadata(id.as_str(), &metadata).await?;
            println!("{}", format_properties(&updated));
            Ok(())
        }
    }
}

async fn run_replica(client: &Client, command: ReplicaCommand, output: OutputFormat) -> Result<()> {
    let replicas = client.share_group_replicas();
    match command {
        ReplicaCommand::List { share_group, list } => {
            let found = replicas
                .list(share_group.as_deref(), list.into_options())
                .await?;
            print_output(output, &found)
        }
        ReplicaCommand::Promote { id } => Ok(replicas.promote(id.as_str()).await?),
        ReplicaCommand::Resync { id } => Ok(replicas.resync(id.as_str()).await?),
        ReplicaCommand::Delete { id, force } => Ok(replicas.delete(id.as_str(), force).await?),
    }
}

fn run_config(path: &Path, command: ConfigCommand, output: OutputFormat) -> Result<()> {
    let mut config = Config::load_from(path);
    match command {
        ConfigCommand::Show => print_output(output, &config),
        ConfigCommand::SetEndpoint { endpoint } => {
            config.set_endpoint(&endpoint, path)?;
            Ok(())
        }
        ConfigCommand::SetApiVersion { version } => {
            let version: ApiVersion = version.parse()?;
            config.set_api_version(version, path)?;
            Ok(())
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let output = args.output;
    if let Command::Config(command) = args.command {
        let path = config_file(args.config_file.as_deref())?;
        return run_config(&path, command, output);
    }

    let client = build_client(&args)?;
    match args.command {
        Command::Share(command) => run_share(&client, command, output).await,
        Command::Replica(command) => run_replica(&client, command, output).await,
        Command::Config(_) => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        let message = match err.downcast_ref::<manila_client::Error>() {
            Some(api_err) => format_error(api_err),
            None => format!("{:#}", err),
        };
        tracing::error!("{:?}", err);
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}
