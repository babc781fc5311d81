//! `vkcri ps` command - list pod sandboxes.

use clap::Args;

use vkcri::cri_api::{PodSandbox, PodSandboxState};
use vkcri_core::AdapterConfig;

use crate::output;

#[derive(Args)]
pub struct PsArgs {
    /// Only display sandbox IDs
    #[arg(short, long)]
    pub quiet: bool,
}

pub async fn execute(args: PsArgs, config: &AdapterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::connect(config).await?;
    let mut sandboxes = client.list_pod_sandboxes().await?;
    sandboxes.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if args.quiet {
        for sandbox in &sandboxes {
            println!("{}", sandbox.id);
        }
        return Ok(());
    }

    let mut table = output::new_table(&["POD ID", "CREATED", "STATE", "NAME", "NAMESPACE", "ATTEMPT"]);
    for sandbox in &sandboxes {
        let (name, namespace, attempt) = match &sandbox.metadata {
            Some(m) => (m.name.as_str(), m.namespace.as_str(), m.attempt.to_string()),
            None => ("", "", String::new()),
        };
        table.add_row([
            output::short_id(&sandbox.id).to_string(),
            output::format_age(sandbox.created_at),
            state_name(sandbox).to_string(),
            name.to_string(),
            namespace.to_string(),
            attempt,
        ]);
    }

    println!("{table}");
    Ok(())
}

fn state_name(sandbox: &PodSandbox) -> &'static str {
    match PodSandboxState::try_from(sandbox.state) {
        Ok(PodSandboxState::SandboxReady) => "Ready",
        Ok(PodSandboxState::SandboxNotready) => "NotReady",
        Err(_) => "Unknown",
    }
}
