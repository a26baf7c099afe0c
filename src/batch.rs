//! Checking many names at once.
//!
//! Every name gets its own resolve and detect; nothing is shared between
//! them, so the only limit is how many queries are allowed in flight.

use std::fmt;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::info;

use crate::dns::{
    enums::{DNSResourceType, ResponseCode},
    name::DomainName,
};
use crate::dnssec::BlackLiesDetector;
use crate::error::{InputError, ResolveError};
use crate::resolver::Resolve;

pub const DEFAULT_CONCURRENCY: usize = 16;

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub name: DomainName,
    pub qtype: DNSResourceType,
    pub result: Result<ResponseCode, ResolveError>,
}

/// Serializable view of a [`BatchResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub name: String,
    pub qtype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    pub fn report(&self) -> BatchReport {
        let (rcode, value, error) = match &self.result {
            Ok(rcode) => (Some(rcode.to_string()), Some(rcode.to_u16()), None),
            Err(e) => (None, None, Some(e.to_string())),
        };
        BatchReport {
            name: self.name.to_string(),
            qtype: self.qtype.to_string(),
            rcode,
            value,
            error,
        }
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(rcode) => write!(f, "{} {} {}", self.name, self.qtype, rcode),
            Err(e) => write!(f, "{} {} FAILED ({})", self.name, self.qtype, e),
        }
    }
}

/// Parse `<qname> <qtype>` lines. Blank lines and `#` comments are skipped.
pub fn parse_query_list(text: &str) -> Result<Vec<(DomainName, DNSResourceType)>, InputError> {
    let mut queries = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }

        let fields: Vec<&str> = content.split_whitespace().collect();
        let &[qname, qtype] = fields.as_slice() else {
            return Err(InputError::Malformed {
                line,
                text: raw.to_string(),
            });
        };

        let name = qname
            .parse::<DomainName>()
            .map_err(|source| InputError::Invalid { line, source })?;
        let qtype = qtype
            .parse::<DNSResourceType>()
            .map_err(|source| InputError::Invalid { line, source })?;
        queries.push((name, qtype));
    }
    Ok(queries)
}

/// Resolve and check every query, at most `concurrency` at a time.
/// Results come back in input order.
pub async fn check_many<R>(
    resolver: &R,
    queries: Vec<(DomainName, DNSResourceType)>,
    concurrency: usize,
) -> Vec<BatchResult>
where
    R: Resolve + ?Sized,
{
    let detector = BlackLiesDetector::new();
    info!(
        "Checking {} names, {} at a time",
        queries.len(),
        concurrency.max(1)
    );

    stream::iter(queries)
        .map(|(name, qtype)| async move {
            let result = detector.check(resolver, &name, qtype).await;
            BatchResult { name, qtype, result }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}
