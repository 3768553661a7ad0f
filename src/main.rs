use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use page_diff::capture::CommandCapture;
use page_diff::config::RunConfig;
use page_diff::gate::{self, EXIT_ERROR, GateOutcome, RunError};
use page_diff::logging::init_tracing;
use tracing::error;

#[derive(Parser, Debug)]
#[command(
    name = "page_diff",
    about = "Capture a page, compare it with the previous capture, and fail on visual changes",
    version
)]
struct Cli {
    /// JSON run configuration; flags below override it
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Page to capture
    #[arg(short = 'u', long = "url")]
    url: Option<String>,

    /// Directory holding the initial/final screenshots
    #[arg(short = 'd', long = "dir")]
    dir: Option<PathBuf>,

    /// Directory for review images and report.json
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Similarity score needed to pass
    #[arg(short = 't', long = "threshold")]
    threshold: Option<f64>,

    /// Regions with this many changed pixels or fewer are ignored
    #[arg(long = "min-area")]
    min_area: Option<u32>,

    /// Browser executable used for screenshots
    #[arg(long = "browser")]
    browser: Option<String>,

    /// Skip writing review images
    #[arg(long = "no-artifacts")]
    no_artifacts: bool,
}

fn resolve_config(cli: &Cli) -> Result<RunConfig, RunError> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    if let Some(dir) = &cli.dir {
        config.screenshot_dir = dir.clone();
    }
    if let Some(output) = &cli.output {
        config.output_dir = output.clone();
    }
    if let Some(threshold) = cli.threshold {
        config.compare.pass_threshold = threshold;
    }
    if let Some(min_area) = cli.min_area {
        config.compare.min_area = min_area;
    }
    if let Some(browser) = &cli.browser {
        config.capture.program = browser.clone();
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<GateOutcome, RunError> {
    let config = resolve_config(&cli)?;
    let capture = CommandCapture::new(config.url.clone(), config.capture.clone());
    gate::run(&config, &capture, !cli.no_artifacts).await
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(outcome) => {
            match &outcome {
                GateOutcome::Bootstrapped(_) => println!("Screenshot stored; nothing to compare yet."),
                GateOutcome::Compared(verdict) if verdict.is_pass() => println!(
                    "Test Passed: no significant visual differences (SSIM {:.4}).",
                    verdict.score()
                ),
                GateOutcome::Compared(verdict) => println!(
                    "Test Failed: significant visual differences (SSIM {:.4}, {} regions).",
                    verdict.score(),
                    verdict.regions().len()
                ),
            }
            outcome.exit_code()
        }
        Err(e) => {
            error!("comparison could not run: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
