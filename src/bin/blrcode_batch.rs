use std::path::PathBuf;
use std::process::ExitCode;

use blacklies::DnsResolver;
use blacklies::batch::{DEFAULT_CONCURRENCY, check_many, parse_query_list};
use blacklies::cli::{ResolverArgs, init_tracing};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::warn;

/// Check a list of `<qname> <qtype>` lines and print one response code per line
#[derive(Parser, Debug)]
#[command(name = "blrcode-batch", author, version, about, long_about = None)]
struct Args {
    /// Query list; stdin when absent or `-`
    input: Option<PathBuf>,

    /// Queries in flight at once
    #[arg(short = 'j', long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Print one JSON object per line
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    resolver: ResolverArgs,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.resolver.verbose);

    let text = match &args.input {
        Some(path) if path.as_os_str() != "-" => tokio::fs::read_to_string(path).await?,
        _ => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            text
        }
    };

    let queries = parse_query_list(&text)?;
    let resolver = DnsResolver::new(args.resolver.to_config()?)?;
    let results = check_many(&resolver, queries, args.concurrency).await;

    let mut failures = 0;
    for result in &results {
        if result.result.is_err() {
            failures += 1;
        }
        if args.json {
            println!("{}", serde_json::to_string(&result.report())?);
        } else {
            println!("{}", result);
        }
    }

    if failures > 0 {
        warn!("{} of {} queries failed", failures, results.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
