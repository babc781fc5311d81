//! `vkcri inspect` command - sandbox and container status as JSON.

use clap::Args;

use vkcri::StaticResources;
use vkcri_core::AdapterConfig;

#[derive(Args)]
pub struct InspectArgs {
    /// Pod sandbox ID
    pub sandbox_id: String,
}

pub async fn execute(args: InspectArgs, config: &AdapterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let lifecycle = super::open_lifecycle(config, StaticResources::default()).await?;
    let report = lifecycle.describe(&args.sandbox_id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
