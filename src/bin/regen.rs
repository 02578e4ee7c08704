use ball_larus::regen::{self, RegenConfig};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "regen")]
#[command(about = "Regenerate block-sequence paths from a profiling run", long_about = None)]
struct Cli {
    /// Directory holding profile.txt and the per-function artifacts
    directory: PathBuf,
    /// Paths counted at least this often are classified as hot
    hot_path_threshold: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = RegenConfig {
        hot_path_threshold: cli.hot_path_threshold.unwrap_or(1),
        ..RegenConfig::default()
    };
    match regen::run(&cli.directory, &config) {
        Ok(summary) if summary.functions_failed == 0 => ExitCode::SUCCESS,
        Ok(summary) => {
            log::error!("{} function(s) could not be decoded", summary.functions_failed);
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
