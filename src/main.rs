use std::fmt::Display;
use std::path::Path;
use std::process;

use blacklies::cli::{ResolverArgs, init_tracing};
use blacklies::dns::{enums::DNSResourceType, name::DomainName};
use blacklies::{BlackLiesDetector, DnsResolver};
use clap::Parser;
use clap::error::ErrorKind;
use tracing::debug;

const EXIT_USAGE: i32 = -1;
const EXIT_FAILURE: i32 = -2;

/// Print the response code for a query, reporting NXDOMAIN where a signed
/// NODATA answer hides a name that does not exist. The exit status is the
/// numeric code.
#[derive(Parser, Debug)]
#[command(name = "blrcode", author, version, about, long_about = None)]
struct Args {
    /// Name to query
    qname: String,

    /// Record type, e.g. A, PTR or TYPE65
    qtype: String,

    #[command(flatten)]
    resolver: ResolverArgs,
}

fn program_name() -> String {
    std::env::args()
        .next()
        .and_then(|arg| {
            Path::new(&arg)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "blrcode".to_string())
}

fn usage() -> ! {
    println!("Usage: {} <qname> <qtype>", program_name());
    process::exit(EXIT_USAGE)
}

fn fail(err: impl Display) -> ! {
    eprintln!("{}: {}", program_name(), err);
    process::exit(EXIT_FAILURE)
}

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            ErrorKind::MissingRequiredArgument
            | ErrorKind::UnknownArgument
            | ErrorKind::TooManyValues => usage(),
            _ => {
                eprint!("{}", e.render());
                usage()
            }
        },
    };

    init_tracing(args.resolver.verbose);

    let qname: DomainName = args.qname.parse().unwrap_or_else(|e| {
        eprintln!("Invalid name {:?}: {}", args.qname, e);
        usage()
    });
    let qtype: DNSResourceType = args.qtype.parse().unwrap_or_else(|e| {
        eprintln!("{}", e);
        usage()
    });

    let config = args.resolver.to_config().unwrap_or_else(|e| fail(e));
    debug!("Using upstream servers {:?}", config.upstream_servers);
    let resolver = DnsResolver::new(config).unwrap_or_else(|e| fail(e));

    match BlackLiesDetector::new()
        .check(&resolver, &qname, qtype)
        .await
    {
        Ok(rcode) => {
            println!("{}", rcode);
            process::exit(i32::from(rcode.to_u16()))
        }
        Err(e) => fail(e),
    }
}
