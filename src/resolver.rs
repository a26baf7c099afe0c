use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bitstream_io::{BigEndian, BitReader};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::config::ResolverConfig;
use crate::dns::{
    DNSPacket, ParseError,
    common::PacketComponent,
    enums::{DNSResourceType, ResponseCode},
    header::DNSHeader,
    name::DomainName,
};
use crate::error::{ResolveError, Result};

/// What came back from asking the resolver about one name.
#[derive(Debug, Clone)]
pub enum ResolutionOutcome {
    /// The resolver itself reported that the name does not exist
    NonExistent,
    /// Any other answer, to be inspected
    Message(DNSPacket),
    /// No usable answer: timeout, network failure, unusable request
    Failure(ResolveError),
}

/// Source of resolution outcomes for the detector
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, name: &DomainName, qtype: DNSResourceType) -> ResolutionOutcome;
}

#[derive(Debug, Clone)]
pub struct DnsResolver {
    config: ResolverConfig,
}

impl DnsResolver {
    pub fn new(config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "DNS resolver initialized with {} upstream servers",
            config.upstream_servers.len()
        );
        debug!("Upstream servers: {:?}", config.upstream_servers);
        Ok(Self { config })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Build the query: one IN question, RD and AD as configured, and an
    /// EDNS0 OPT record carrying the payload size and DO bit.
    pub fn build_query(&self, name: &DomainName, qtype: DNSResourceType) -> DNSPacket {
        let mut query = DNSPacket::query(rand::random::<u16>(), name.clone(), qtype);
        query.header.rd = self.config.recursion_desired;
        query.header.ad = self.config.authenticated_data;
        query.add_edns(self.config.edns_payload_size, self.config.dnssec_ok);
        query
    }

    /// Send one query and return whatever message was accepted, NXDOMAIN
    /// included. The whole exchange is bounded by the configured timeout.
    pub async fn query(&self, name: &DomainName, qtype: DNSResourceType) -> Result<DNSPacket> {
        let query = self.build_query(name, qtype);
        let query_bytes = query.serialize()?;
        debug!("Querying {} {} (id={})", name, qtype, query.header.id);

        timeout(self.config.timeout, self.query_servers(&query, &query_bytes))
            .await
            .map_err(|_| {
                warn!("Query for {} {} timed out", name, qtype);
                ResolveError::Timeout(self.config.timeout)
            })?
    }

    async fn query_servers(&self, query: &DNSPacket, query_bytes: &[u8]) -> Result<DNSPacket> {
        let mut last_error = None;
        let mut last_response = None;

        for &upstream_addr in &self.config.upstream_servers {
            match self.query_upstream(query, query_bytes, upstream_addr).await {
                Ok(response) => {
                    let rcode = response.rcode();
                    if self.config.try_next_on_servfail
                        && matches!(rcode, ResponseCode::ServFail | ResponseCode::Refused)
                    {
                        warn!("Upstream {} answered {}, trying next server", upstream_addr, rcode);
                        last_response = Some(response);
                        continue;
                    }
                    debug!("Resolved from upstream {}: {}", upstream_addr, rcode);
                    return Ok(response);
                }
                Err(e) => {
                    warn!("Failed to resolve from upstream {}: {}", upstream_addr, e);
                    last_error = Some(e);
                }
            }
        }

        if let Some(response) = last_response {
            return Ok(response);
        }
        Err(ResolveError::AllServersFailed(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no upstream servers".to_string()),
        ))
    }

    async fn query_upstream(
        &self,
        query: &DNSPacket,
        query_bytes: &[u8],
        upstream_addr: SocketAddr,
    ) -> Result<DNSPacket> {
        let max_retries = self.config.max_retries;
        let mut retry = 0;
        loop {
            let attempt = timeout(
                self.config.attempt_timeout,
                self.send_query(query, query_bytes, upstream_addr),
            )
            .await
            .unwrap_or_else(|_| Err(ResolveError::Timeout(self.config.attempt_timeout)));

            match attempt {
                Ok(response) => {
                    if retry > 0 {
                        debug!("Query succeeded on retry {}", retry);
                    }
                    return Ok(response);
                }
                Err(e) if retry < max_retries => {
                    debug!("Query attempt {} failed, retrying: {}", retry + 1, e);
                    retry += 1;
                    tokio::time::sleep(Duration::from_millis(100 * retry as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// UDP first, then TCP if the answer is truncated
    async fn send_query(
        &self,
        query: &DNSPacket,
        query_bytes: &[u8],
        upstream_addr: SocketAddr,
    ) -> Result<DNSPacket> {
        match self.send_udp_query(query, query_bytes, upstream_addr).await? {
            UdpReply::Parsed(response) if !response.header.tc => Ok(response),
            UdpReply::Parsed(response) if !self.config.tcp_fallback => Ok(response),
            UdpReply::Parsed(_) => {
                debug!("UDP response truncated, retrying with TCP");
                self.send_tcp_query(query, query_bytes, upstream_addr).await
            }
            UdpReply::Truncated(e) if self.config.tcp_fallback => {
                debug!("Truncated UDP response did not parse ({}), retrying with TCP", e);
                self.send_tcp_query(query, query_bytes, upstream_addr).await
            }
            UdpReply::Truncated(e) => Err(ResolveError::Protocol(e)),
        }
    }

    async fn send_udp_query(
        &self,
        query: &DNSPacket,
        query_bytes: &[u8],
        upstream_addr: SocketAddr,
    ) -> Result<UdpReply> {
        let bind_addr: SocketAddr = if upstream_addr.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(upstream_addr).await?;
        socket.send(query_bytes).await?;

        let mut response_buf = vec![0u8; 65535];
        loop {
            let response_len = socket.recv(&mut response_buf).await?;
            let raw = &response_buf[..response_len];
            trace!(
                "Raw UDP response data ({} bytes): {:02x?}",
                response_len,
                &raw[..response_len.min(64)]
            );

            // Replies that are not ours are dropped and we keep listening
            // until the attempt times out.
            match DNSPacket::parse(raw) {
                Ok(response) if is_response_to(query, &response) => {
                    log_response_details(&response, response_len, "UDP");
                    return Ok(UdpReply::Parsed(response));
                }
                Ok(response) => {
                    debug!(
                        "Ignoring unrelated UDP response from {} (id={})",
                        upstream_addr, response.header.id
                    );
                }
                Err(e) => match read_header(raw) {
                    Some(header) if header.qr && header.id == query.header.id => {
                        if header.tc {
                            return Ok(UdpReply::Truncated(e));
                        }
                        warn!("Malformed UDP response from {}: {}", upstream_addr, e);
                        return Err(ResolveError::Protocol(e));
                    }
                    _ => {
                        debug!("Failed to parse UDP response from {}: {}", upstream_addr, e);
                    }
                },
            }
        }
    }

    async fn send_tcp_query(
        &self,
        query: &DNSPacket,
        query_bytes: &[u8],
        upstream_addr: SocketAddr,
    ) -> Result<DNSPacket> {
        let mut stream = TcpStream::connect(upstream_addr).await?;

        let query_length = u16::try_from(query_bytes.len())
            .map_err(|_| ResolveError::InvalidQuery("query too long for TCP".to_string()))?;
        stream.write_all(&query_length.to_be_bytes()).await?;
        stream.write_all(query_bytes).await?;
        stream.flush().await?;

        let mut length_buf = [0u8; 2];
        stream.read_exact(&mut length_buf).await?;
        let response_length = u16::from_be_bytes(length_buf) as usize;

        let mut response_buf = vec![0; response_length];
        stream.read_exact(&mut response_buf).await?;

        let response = DNSPacket::parse(&response_buf)?;
        if !is_response_to(query, &response) {
            return Err(ResolveError::Mismatched(upstream_addr));
        }
        log_response_details(&response, response_length, "TCP");
        Ok(response)
    }
}

#[async_trait]
impl Resolve for DnsResolver {
    async fn resolve(&self, name: &DomainName, qtype: DNSResourceType) -> ResolutionOutcome {
        match self.query(name, qtype).await {
            Ok(response) if response.rcode() == ResponseCode::NXDomain => {
                debug!("Resolver reports {} does not exist", name);
                ResolutionOutcome::NonExistent
            }
            Ok(response) => ResolutionOutcome::Message(response),
            Err(e) => ResolutionOutcome::Failure(e),
        }
    }
}

/// A UDP reply to our query
enum UdpReply {
    Parsed(DNSPacket),
    /// TC was set and the message was cut off too early to parse
    Truncated(ParseError),
}

/// Header of a message whose body may not parse
fn read_header(buf: &[u8]) -> Option<DNSHeader> {
    let mut reader = BitReader::<_, BigEndian>::new(buf);
    let mut header = DNSHeader::default();
    header.read(&mut reader, buf).ok()?;
    Some(header)
}

/// Same id, QR set, and the same question (when the answer echoes one)
fn is_response_to(query: &DNSPacket, response: &DNSPacket) -> bool {
    if response.header.id != query.header.id || !response.header.qr {
        return false;
    }
    match (query.questions.first(), response.questions.first()) {
        (Some(q), Some(r)) => {
            response.questions.len() == 1
                && q.qtype == r.qtype
                && q.qclass == r.qclass
                && q.name.eq_ignore_ascii_case(&r.name)
        }
        // FORMERR and similar answers may omit the question
        (_, None) => true,
        (None, Some(_)) => false,
    }
}

fn log_response_details(response: &DNSPacket, response_len: usize, protocol: &str) {
    debug!(
        "Parsed {} response ({} bytes): rcode={}, ad={}, answers={}, authorities={}, additional={}",
        protocol,
        response_len,
        response.rcode(),
        response.header.ad,
        response.answers.len(),
        response.authorities.len(),
        response.resources.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> DnsResolver {
        DnsResolver::new(ResolverConfig::default()).unwrap()
    }

    #[test]
    fn test_query_flags() {
        let name: DomainName = "documentforce.com".parse().unwrap();
        let query = resolver().build_query(&name, DNSResourceType::PTR);
        assert!(query.header.rd);
        assert!(query.header.ad);
        assert!(!query.header.qr);
        assert!(query.dnssec_requested());
        assert_eq!(query.max_udp_payload_size(), 1420);
        assert_eq!(query.questions[0].name, name);
        assert_eq!(query.questions[0].qtype, DNSResourceType::PTR);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ResolverConfig {
            upstream_servers: vec![],
            ..Default::default()
        };
        assert!(matches!(DnsResolver::new(config), Err(ResolveError::Config(_))));
    }

    #[test]
    fn test_response_matching() {
        let name: DomainName = "example.com".parse().unwrap();
        let query = resolver().build_query(&name, DNSResourceType::A);

        let mut response = query.clone();
        response.header.qr = true;
        assert!(is_response_to(&query, &response));

        response.questions[0].name = "EXAMPLE.com".parse().unwrap();
        assert!(is_response_to(&query, &response));

        response.questions[0].qtype = DNSResourceType::AAAA;
        assert!(!is_response_to(&query, &response));

        let mut wrong_id = query.clone();
        wrong_id.header.qr = true;
        wrong_id.header.id = query.header.id.wrapping_add(1);
        assert!(!is_response_to(&query, &wrong_id));

        let mut no_question = query.clone();
        no_question.header.qr = true;
        no_question.questions.clear();
        assert!(is_response_to(&query, &no_question));
    }
}
