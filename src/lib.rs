pub mod batch;
pub mod cli;
pub mod config;
pub mod dns;
pub mod dnssec;
pub mod error;
pub mod resolver;

pub use dns::DNSPacket;
pub use dnssec::BlackLiesDetector;
pub use resolver::{DnsResolver, Resolve, ResolutionOutcome};
