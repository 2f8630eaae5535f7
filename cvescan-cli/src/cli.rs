use std::path::PathBuf;

use clap::Parser;

/// Check a list of packages against a CVE Manager vulnerability service
#[derive(Parser)]
#[command(name = "cvescan", version)]
pub struct Cli {
    /// Path to a file of package URLs, one per line
    #[arg(short, long)]
    pub file: PathBuf,

    /// Advisory provider to query
    #[arg(long, default_value = "cve-manager")]
    pub provider: String,

    /// Override the CVE Manager server URL
    #[arg(long, env = "CVE_MANAGER_URL")]
    pub server_url: Option<String>,

    /// Emit results (and logs) as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}
