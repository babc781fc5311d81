//! CLI command definitions and dispatch.

mod down;
mod info;
mod inspect;
mod ps;
mod pull;
mod run;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use vkcri::{GrpcTransport, HostVolumeResolver, PodLifecycle, RuntimeClient, StaticResources};
use vkcri_core::AdapterConfig;

/// vkcri - run Kubernetes pod declarations on a CRI runtime.
#[derive(Parser)]
#[command(name = "vkcri", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command. Flags override the config file.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Config file (default: ~/.vkcri/config.yaml if present)
    #[arg(long, global = true, env = "VKCRI_CONFIG")]
    pub config: Option<PathBuf>,

    /// CRI runtime socket
    #[arg(long, global = true, env = "VKCRI_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Directory for pod logs
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Runtime handler for new sandboxes
    #[arg(long, global = true)]
    pub runtime_handler: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Create a pod sandbox and start its containers
    Run(run::RunArgs),
    /// Stop and remove a pod sandbox
    Down(down::DownArgs),
    /// List pod sandboxes
    Ps(ps::PsArgs),
    /// Show a pod sandbox and its containers as JSON
    Inspect(inspect::InspectArgs),
    /// Pull an image through the runtime
    Pull(pull::PullArgs),
    /// Show runtime and host information
    Info(info::InfoArgs),
}

/// Load the config file, then apply command-line overrides.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<AdapterConfig, Box<dyn std::error::Error>> {
    let mut config = AdapterConfig::load(global.config.as_deref())?;
    if let Some(socket) = &global.socket {
        config.paths.socket_path = socket.clone();
    }
    if let Some(log_dir) = &global.log_dir {
        config.log_dir = log_dir.clone();
    }
    if let Some(handler) = &global.runtime_handler {
        config.runtime_handler = handler.clone();
    }
    Ok(config)
}

/// Connect to the configured runtime.
pub(crate) async fn connect(
    config: &AdapterConfig,
) -> Result<RuntimeClient<GrpcTransport>, Box<dyn std::error::Error>> {
    let transport = GrpcTransport::connect(
        &config.paths.socket_path,
        Duration::from_secs(config.connect_timeout_secs),
    )
    .await?;
    Ok(RuntimeClient::new(transport).with_runtime_handler(config.runtime_handler.clone()))
}

pub(crate) type Lifecycle = PodLifecycle<GrpcTransport, HostVolumeResolver<StaticResources>>;

/// Connect and wrap the client in a pod lifecycle.
pub(crate) async fn open_lifecycle(
    config: &AdapterConfig,
    resources: StaticResources,
) -> Result<Lifecycle, Box<dyn std::error::Error>> {
    let client = connect(config).await?;
    let resolver = HostVolumeResolver::new(config.paths.clone(), resources);
    Ok(PodLifecycle::new(
        client,
        resolver,
        config.paths.clone(),
        config.log_dir.clone(),
    ))
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli.global)?;
    tracing::debug!(socket = %config.paths.socket_path.display(), "Configuration loaded");

    match cli.command {
        Command::Run(args) => run::execute(args, &config).await,
        Command::Down(args) => down::execute(args, &config).await,
        Command::Ps(args) => ps::execute(args, &config).await,
        Command::Inspect(args) => inspect::execute(args, &config).await,
        Command::Pull(args) => pull::execute(args, &config).await,
        Command::Info(args) => info::execute(args, &config).await,
    }
}
