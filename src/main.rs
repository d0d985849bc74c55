use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use dashgen::{orchestrator_from_config, AgentConfig, GenerationRequest, Workspace};

/// Generate a Vue dashboard project from a natural-language description.
#[derive(Parser, Debug)]
#[command(name = "dashgen", version, about)]
struct Cli {
    /// Description of the dashboard or component set to generate
    #[arg(long)]
    prompt: String,

    /// Style libraries to use, comma-separated
    #[arg(long, default_value = "tailwind,element-plus")]
    styles: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AgentConfig::from_env()?;
    let request = GenerationRequest {
        description: cli.prompt,
        style_hints: cli
            .styles
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    };

    let store = Workspace::create(&config.workspace_root)?;
    let orchestrator = orchestrator_from_config(&config);
    let summary = orchestrator.run(&store, &request).await?;

    println!("\nProject ready: {}", summary.project_dir.display());
    println!("Generated components: {}", summary.generated.join(", "));
    if !summary.stubbed.is_empty() {
        println!("Stubbed components: {}", summary.stubbed.join(", "));
    }
    for warning in &summary.warnings {
        println!("warning: {}", warning);
    }
    println!(
        "\ncd {} && npm install && npm run dev",
        summary.project_dir.display()
    );
    Ok(())
}
