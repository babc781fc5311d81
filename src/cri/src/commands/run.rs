//! `vkcri run` command.

use std::path::PathBuf;

use clap::Args;

use vkcri::StaticResources;
use vkcri_core::{AdapterConfig, PodDeclaration};

use crate::output;

#[derive(Args)]
pub struct RunArgs {
    /// Pod declaration (YAML)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Secrets and config maps available to the pod's volumes (YAML)
    #[arg(long)]
    pub resources: Option<PathBuf>,

    /// Creation attempt, recorded in metadata and log paths
    #[arg(long, default_value_t = 0)]
    pub attempt: u32,
}

pub async fn execute(args: RunArgs, config: &AdapterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut pod = PodDeclaration::from_file(&args.file)?;
    if pod.metadata.uid.is_empty() {
        pod.metadata.uid = uuid::Uuid::new_v4().to_string();
        tracing::debug!(uid = %pod.metadata.uid, "Assigned pod UID");
    }

    let resources = match &args.resources {
        Some(path) => StaticResources::from_file(path)?,
        None => StaticResources::default(),
    };

    let lifecycle = super::open_lifecycle(config, resources).await?;
    let running = lifecycle.run_pod(&pod, args.attempt).await?;

    println!("Pod {} started (sandbox {})", pod.full_name(), running.sandbox_id);
    let mut table = output::new_table(&["CONTAINER ID", "NAME"]);
    for (name, id) in &running.containers {
        table.add_row([output::short_id(id), name.as_str()]);
    }
    println!("{table}");

    Ok(())
}
