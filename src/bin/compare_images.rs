use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use page_diff::compare::{CompareConfig, DEFAULT_MIN_AREA, DEFAULT_PASS_THRESHOLD, evaluate};
use page_diff::config::validate_compare;
use page_diff::gate::{EXIT_ERROR, RunError, verdict_exit_code};
use page_diff::logging::init_tracing;
use page_diff::present::ArtifactWriter;
use page_diff::source::load_pair;
use tracing::{error, warn};

#[derive(Parser, Debug)]
#[command(
    name = "compare_images",
    about = "Compare two screenshots and write highlighted differences",
    version
)]
struct Cli {
    /// Earlier screenshot
    before: PathBuf,

    /// Later screenshot
    after: PathBuf,

    /// Directory for review images and report.json
    #[arg(short = 'o', long = "output", default_value = "output")]
    output: PathBuf,

    /// Similarity score needed to pass
    #[arg(short = 't', long = "threshold", default_value_t = DEFAULT_PASS_THRESHOLD)]
    threshold: f64,

    /// Regions with this many changed pixels or fewer are ignored
    #[arg(long = "min-area", default_value_t = DEFAULT_MIN_AREA)]
    min_area: u32,

    /// Also stream the images to a Rerun viewer
    #[cfg(feature = "rerun")]
    #[arg(long = "rerun")]
    rerun: bool,
}

fn run(cli: &Cli) -> Result<ExitCode, RunError> {
    let config = CompareConfig {
        pass_threshold: cli.threshold,
        min_area: cli.min_area,
    };
    validate_compare(&config)?;

    let (before, after) = load_pair(&cli.before, &cli.after)?;
    let verdict = evaluate(&before, &after, &config)?;
    println!("SSIM Score: {:.6}", verdict.score());

    if let Err(e) = ArtifactWriter::new(&cli.output).write(&before, &after, &verdict, &config) {
        warn!("could not write review artifacts: {e}");
    }

    #[cfg(feature = "rerun")]
    if cli.rerun {
        if let Err(e) = page_diff::present::log_to_rerun(&before, &after, &verdict) {
            warn!("rerun logging failed: {e}");
        }
    }

    if verdict.is_pass() {
        println!("Test Passed: No significant visual differences detected.");
    } else {
        println!(
            "Test Failed: Significant visual differences detected ({} regions).",
            verdict.regions().len()
        );
        for region in verdict.regions() {
            let b = region.bounds;
            println!("  x={} y={} w={} h={} area={}", b.x, b.y, b.width, b.height, region.area);
        }
    }
    Ok(verdict_exit_code(&verdict))
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("comparison could not run: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
