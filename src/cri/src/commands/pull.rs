//! `vkcri pull` command.

use clap::Args;

use vkcri_core::AdapterConfig;

#[derive(Args)]
pub struct PullArgs {
    /// Image reference (e.g., "nginx:1.25", "ghcr.io/org/image:tag")
    pub image: String,

    /// Only print the resolved image reference
    #[arg(short, long)]
    pub quiet: bool,
}

pub async fn execute(args: PullArgs, config: &AdapterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::connect(config).await?;

    if !args.quiet {
        println!("Pulling {}...", args.image);
    }
    let image_ref = client.pull_image(&args.image).await?;

    if args.quiet {
        println!("{image_ref}");
    } else {
        println!("Pulled: {} ({})", args.image, image_ref);
    }
    Ok(())
}
