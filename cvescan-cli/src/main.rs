mod cli;

use std::fs;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cvescan::output;
use cvescan::package::Package;
use cvescan::provider::{ProviderConfig, create_provider};

use cli::Cli;

fn init_tracing(args: &Cli) {
    let filter = EnvFilter::builder()
        .with_default_directive(args.verbose.tracing_level_filter().into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_packages(contents: &str) -> Result<Vec<Package>> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.parse()
                .with_context(|| format!("invalid package URL: {line}"))
        })
        .collect()
}

async fn run(args: Cli) -> Result<()> {
    let contents = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let packages = parse_packages(&contents)?;

    let config = ProviderConfig {
        server_url: args.server_url.clone(),
    };
    let provider = create_provider(&args.provider, &config)?;

    let results = provider.retrieve_package_findings(&packages).await;
    let entries = output::report_entries(&packages, results);

    let formatter = output::formatter(args.json);
    formatter.write_results(&entries, &mut std::io::stdout().lock())?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_tracing(&args);

    if !args.file.exists() {
        eprintln!("error: file not found: {}", args.file.display());
        process::exit(1);
    }

    if let Err(e) = run(args).await {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
