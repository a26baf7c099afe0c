use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::trace;

use super::{ParseError, enums::DNSResourceType, name::DomainName};
use crate::dnssec::bitmap::TypeBitmap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Soa {
    pub mname: DomainName,
    pub rname: DomainName,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

/// NSEC record data (RFC 4034 §4)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nsec {
    pub next_domain: DomainName,
    pub types: TypeBitmap,
}

/// RRSIG record data (RFC 4034 §3). Only carried, never verified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rrsig {
    pub type_covered: DNSResourceType,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer_name: DomainName,
    pub signature: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    NS(DomainName),
    CNAME(DomainName),
    PTR(DomainName),
    SOA(Soa),
    NSEC(Nsec),
    RRSIG(Rrsig),
    /// Types without a decoder, and data that failed to decode
    Opaque(Vec<u8>),
}

impl Default for RData {
    fn default() -> Self {
        RData::Opaque(Vec::new())
    }
}

struct Fields<'a> {
    data: &'a [u8],
    pos: usize,
    packet: &'a [u8],
}

impl<'a> Fields<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + len)
            .ok_or_else(|| ParseError::InvalidRecordData("record data truncated".to_string()))?;
        self.pos += len;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ParseError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ParseError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn name(&mut self) -> Result<DomainName, ParseError> {
        let (name, used) = DomainName::decode(self.data, self.pos, self.packet)?;
        self.pos += used;
        Ok(name)
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos.min(self.data.len())..];
        self.pos = self.data.len();
        rest
    }

    fn finish<T>(&self, value: T) -> Result<T, ParseError> {
        if self.pos != self.data.len() {
            return Err(ParseError::InvalidRecordData(format!(
                "{} trailing octets",
                self.data.len() - self.pos
            )));
        }
        Ok(value)
    }
}

impl RData {
    /// Decode `data` as the record data of `rtype`. Embedded names may use
    /// compression pointers into `packet`.
    pub fn decode(rtype: DNSResourceType, data: &[u8], packet: &[u8]) -> Result<Self, ParseError> {
        let mut f = Fields { data, pos: 0, packet };
        let rdata = match rtype {
            DNSResourceType::A => {
                let b = f.take(4)?;
                RData::A(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
            }
            DNSResourceType::AAAA => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(f.take(16)?);
                RData::AAAA(Ipv6Addr::from(octets))
            }
            DNSResourceType::NS => RData::NS(f.name()?),
            DNSResourceType::CNAME => RData::CNAME(f.name()?),
            DNSResourceType::PTR => RData::PTR(f.name()?),
            DNSResourceType::SOA => RData::SOA(Soa {
                mname: f.name()?,
                rname: f.name()?,
                serial: f.u32()?,
                refresh: f.u32()?,
                retry: f.u32()?,
                expire: f.u32()?,
                minimum: f.u32()?,
            }),
            DNSResourceType::NSEC => RData::NSEC(Nsec {
                next_domain: f.name()?,
                types: TypeBitmap::from_wire(f.rest()),
            }),
            DNSResourceType::RRSIG => RData::RRSIG(Rrsig {
                type_covered: f.u16()?.into(),
                algorithm: f.u8()?,
                labels: f.u8()?,
                original_ttl: f.u32()?,
                expiration: f.u32()?,
                inception: f.u32()?,
                key_tag: f.u16()?,
                signer_name: f.name()?,
                signature: f.rest().to_vec(),
            }),
            _ => RData::Opaque(f.rest().to_vec()),
        };
        f.finish(rdata)
    }

    /// Like [`RData::decode`], but keeps undecodable data as opaque octets
    pub fn decode_lossy(rtype: DNSResourceType, data: &[u8], packet: &[u8]) -> Self {
        match Self::decode(rtype, data, packet) {
            Ok(rdata) => rdata,
            Err(e) => {
                trace!("Keeping {} record data opaque: {}", rtype, e);
                RData::Opaque(data.to_vec())
            }
        }
    }

    /// Uncompressed wire form
    pub fn to_wire(&self) -> Vec<u8> {
        match self {
            RData::A(addr) => addr.octets().to_vec(),
            RData::AAAA(addr) => addr.octets().to_vec(),
            RData::NS(name) | RData::CNAME(name) | RData::PTR(name) => name.to_wire(),
            RData::SOA(soa) => {
                let mut out = soa.mname.to_wire();
                out.extend(soa.rname.to_wire());
                for value in [soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum] {
                    out.extend_from_slice(&value.to_be_bytes());
                }
                out
            }
            RData::NSEC(nsec) => {
                let mut out = nsec.next_domain.to_wire();
                out.extend_from_slice(nsec.types.as_bytes());
                out
            }
            RData::RRSIG(sig) => {
                let mut out = Vec::new();
                out.extend_from_slice(&sig.type_covered.to_u16().to_be_bytes());
                out.push(sig.algorithm);
                out.push(sig.labels);
                out.extend_from_slice(&sig.original_ttl.to_be_bytes());
                out.extend_from_slice(&sig.expiration.to_be_bytes());
                out.extend_from_slice(&sig.inception.to_be_bytes());
                out.extend_from_slice(&sig.key_tag.to_be_bytes());
                out.extend(sig.signer_name.to_wire());
                out.extend_from_slice(&sig.signature);
                out
            }
            RData::Opaque(data) => data.clone(),
        }
    }
}
