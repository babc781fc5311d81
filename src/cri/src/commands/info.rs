//! `vkcri info` command.

use clap::Args;

use vkcri_core::AdapterConfig;

use crate::output;

#[derive(Args)]
pub struct InfoArgs;

pub async fn execute(_args: InfoArgs, config: &AdapterConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("vkcri version {}", vkcri_core::VERSION);
    println!("Runtime socket: {}", config.paths.socket_path.display());
    println!("Volume root: {}", config.paths.volume_root.display());
    println!("Log directory: {}", config.log_dir.display());

    match super::connect(config).await {
        Ok(client) => match client.version().await {
            Ok(v) => println!(
                "Runtime: {} {} (CRI {})",
                v.runtime_name, v.runtime_version, v.runtime_api_version
            ),
            Err(e) => println!("Runtime: not available ({e})"),
        },
        Err(e) => println!("Runtime: not available ({e})"),
    }

    match vkcri_core::system_total_memory() {
        0 => println!("Host memory: unknown"),
        total => println!("Host memory: {}", output::format_bytes(total)),
    }

    Ok(())
}
