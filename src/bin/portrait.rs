//! Command-line front end for the transform workflow

use anyhow::Context;
use clap::Parser;
use portrait_gateway::config::Settings;
use portrait_gateway::workflow::{
    CandidateFile, Completion, ResultPresenter, TransformClient, TransformResult,
    WorkflowController,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*};

/// Turn a photo into an anime-style portrait through the transform gateway.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JPEG, PNG or WebP photo, at most 4 MiB.
    image: PathBuf,

    /// Optional description of the character; a default is used when omitted.
    #[arg(short, long, default_value = "")]
    prompt: String,

    /// Gateway base URL (defaults to client.endpoint from settings).
    #[arg(long, env = "PORTRAIT_ENDPOINT")]
    endpoint: Option<String>,

    /// Directory the finished portrait is saved to.
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Settings file to load instead of config/default.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the result URL without saving a local copy.
    #[arg(long)]
    no_download: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load_from_path(path),
        None => Settings::load(),
    }
    .context("Failed to load settings")?;

    // Logs go to stderr so stdout carries only the result.
    tracing_subscriber::registry()
        .with(settings.logging.env_filter())
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    if let Some(endpoint) = args.endpoint {
        settings.client.endpoint = endpoint;
    }
    if let Some(out_dir) = &args.out_dir {
        settings.client.download_dir = out_dir.to_string_lossy().into_owned();
    }

    let controller = WorkflowController::new();
    let client = TransformClient::new(&settings.client)?;
    let presenter = ResultPresenter::from_config(&settings.client);

    let candidate = CandidateFile::from_path(&args.image)
        .await
        .with_context(|| format!("Cannot open {}", args.image.display()))?;
    controller.select(candidate).await?;
    controller.set_prompt(args.prompt);

    println!("Transforming {} via {} ...", args.image.display(), client.url());
    let completion = controller.transform(&client).await?;
    info!(?completion, "Transform finished");

    let result = match (completion, controller.result()) {
        (Completion::Applied(_), Some(result)) => result,
        _ => anyhow::bail!("Transform result was discarded"),
    };
    println!("{}", presenter.render(&result));

    let url = match result {
        TransformResult::Success { result_image_url } => result_image_url,
        TransformResult::Failure { .. } => std::process::exit(1),
    };

    if !args.no_download {
        match presenter.download(&url).await {
            Ok(path) => println!("Saved to {}", path.display()),
            Err(e) => {
                error!(error = %e, "Download failed");
                eprintln!("{} (the portrait is still available at {})", e, url);
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
