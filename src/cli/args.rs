use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "imgprobe",
    version,
    about = "Diagnose delivery problems with a remote image URL"
)]
pub struct Cli {
    /// Image URL to diagnose
    #[arg(short = 'u', long = "url")]
    pub url: Option<String>,

    /// Upstream API endpoint for credentialed probes
    #[arg(long = "api-endpoint")]
    pub api_endpoint: Option<String>,

    /// Bearer credential for the upstream API
    #[arg(long = "api-key")]
    pub api_key: Option<String>,

    /// Case identifier attached to the report
    #[arg(long = "case")]
    pub case: Option<String>,

    /// Directory for report artifacts
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Per-probe timeout override in seconds
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Run independent probes concurrently with this many workers
    #[arg(long = "parallel")]
    pub parallel: Option<usize>,

    /// Guided interactive session
    #[arg(short = 'w', long = "wizard", action = ArgAction::SetTrue)]
    pub wizard: bool,

    /// Verbose human output
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Debug logs (implies verbose)
    #[arg(short = 'd', long = "debug", action = ArgAction::SetTrue)]
    pub debug: bool,
}
