//! `vkcri down` command.

use clap::Args;

use vkcri::StaticResources;
use vkcri_core::AdapterConfig;

#[derive(Args)]
pub struct DownArgs {
    /// Pod sandbox ID
    pub sandbox_id: String,
}

pub async fn execute(args: DownArgs, config: &AdapterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let lifecycle = super::open_lifecycle(config, StaticResources::default()).await?;
    lifecycle.teardown(&args.sandbox_id).await?;
    println!("{}", args.sandbox_id);
    Ok(())
}
