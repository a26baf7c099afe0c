pub mod common;
pub mod edns;
pub mod enums;
pub mod header;
pub mod name;
pub mod question;
pub mod rdata;
pub mod resource;

use bitstream_io::{BigEndian, BitReader, BitWrite, BitWriter};
use common::PacketComponent;
use edns::EdnsOpt;
use enums::{DNSResourceType, ResponseCode};
use header::DNSHeader;
use name::DomainName;
use question::DNSQuestion;
use rdata::RData;
use resource::{DNSResource, RecordSet, group_record_sets};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub resources: Vec<DNSResource>,
    /// EDNS0 OPT record if present (extracted from additional records)
    pub edns: Option<EdnsOpt>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid DNS header")]
    InvalidHeader,
    #[error("Invalid DNS label")]
    InvalidLabel,
    #[error("Invalid compression pointer")]
    InvalidPointer,
    #[error("DNS name too long")]
    NameTooLong,
    #[error("Unknown record type: {0}")]
    UnknownType(String),
    #[error("Invalid record data: {0}")]
    InvalidRecordData(String),
    #[error("Invalid bit stream: {0}")]
    InvalidBitStream(String),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::InvalidBitStream(e.to_string())
    }
}

impl DNSPacket {
    /// A single-question query with no flags set
    pub fn query(id: u16, name: DomainName, qtype: DNSResourceType) -> Self {
        DNSPacket {
            header: DNSHeader {
                id,
                qdcount: 1,
                ..Default::default()
            },
            questions: vec![DNSQuestion::new(name, qtype)],
            ..Default::default()
        }
    }

    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        trace!("Parsing DNS packet, size: {} bytes", buf.len());
        let mut reader = BitReader::<_, BigEndian>::new(buf);
        let mut packet = DNSPacket::default();
        packet.header.read(&mut reader, buf)?;
        debug!(
            "Parsed DNS header: id={}, qr={}, rcode={}, ad={}, counts={}/{}/{}/{}",
            packet.header.id,
            packet.header.qr,
            packet.header.rcode,
            packet.header.ad,
            packet.header.qdcount,
            packet.header.ancount,
            packet.header.nscount,
            packet.header.arcount
        );

        for _ in 0..packet.header.qdcount {
            let mut question = DNSQuestion::default();
            question.read(&mut reader, buf)?;
            packet.questions.push(question);
        }

        for _ in 0..packet.header.ancount {
            let mut answer = DNSResource::default();
            answer.read(&mut reader, buf)?;
            packet.answers.push(answer);
        }

        for _ in 0..packet.header.nscount {
            let mut authority = DNSResource::default();
            authority.read(&mut reader, buf)?;
            packet.authorities.push(authority);
        }

        for _ in 0..packet.header.arcount {
            let mut resource = DNSResource::default();
            resource.read(&mut reader, buf)?;

            if resource.rtype == DNSResourceType::OPT
                && resource.name.is_root()
                && packet.edns.is_none()
            {
                if let RData::Opaque(rdata) = &resource.rdata {
                    // CLASS holds the payload size rather than a DNS class
                    match EdnsOpt::parse_from_resource(resource.rclass.into(), resource.ttl, rdata) {
                        Ok(edns) => {
                            debug!("Parsed {}", edns);
                            packet.edns = Some(edns);
                            continue;
                        }
                        Err(e) => {
                            debug!("Failed to parse EDNS OPT record: {}", e);
                        }
                    }
                }
            }

            packet.resources.push(resource);
        }

        Ok(packet)
    }

    /// Encode the packet. Section counts are taken from the section
    /// contents, not from the header fields.
    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::new();
        let mut writer: BitWriter<&mut Vec<u8>, BigEndian> = BitWriter::new(&mut buf);

        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authorities.len() as u16;
        header.arcount = self.resources.len() as u16 + self.edns.is_some() as u16;
        header.write(&mut writer)?;

        for question in &self.questions {
            question.write(&mut writer)?;
        }
        for answer in &self.answers {
            answer.write(&mut writer)?;
        }
        for authority in &self.authorities {
            authority.write(&mut writer)?;
        }
        for resource in &self.resources {
            resource.write(&mut writer)?;
        }

        if let Some(edns) = &self.edns {
            let (udp_payload_size, ttl, rdata) = edns.to_resource_format();
            // Root owner name, then TYPE OPT with the payload size as CLASS
            writer.write_var::<u8>(8, 0)?;
            writer.write_var::<u16>(16, DNSResourceType::OPT.into())?;
            writer.write_var::<u16>(16, udp_payload_size)?;
            writer.write_var::<u32>(32, ttl)?;
            writer.write_var::<u16>(16, rdata.len() as u16)?;
            writer.write_bytes(&rdata)?;
        }

        Ok(buf)
    }

    /// Full response code, including the EDNS extended bits
    pub fn rcode(&self) -> ResponseCode {
        let extended = self.edns.as_ref().map(|e| e.extended_rcode).unwrap_or(0);
        ResponseCode::from_parts(self.header.rcode, extended)
    }

    pub fn set_rcode(&mut self, rcode: ResponseCode) {
        self.header.rcode = rcode.header_bits();
        if rcode.extended_bits() != 0 && self.edns.is_none() {
            self.edns = Some(EdnsOpt::default());
        }
        if let Some(edns) = &mut self.edns {
            edns.extended_rcode = rcode.extended_bits();
        }
    }

    /// Authenticated Data bit, as set by a validating resolver
    pub fn is_authenticated(&self) -> bool {
        self.header.ad
    }

    pub fn authority_sets(&self) -> Vec<RecordSet<'_>> {
        group_record_sets(&self.authorities)
    }

    pub fn add_edns(&mut self, payload_size: u16, do_flag: bool) {
        let mut edns = EdnsOpt::with_payload_size(payload_size);
        edns.set_do_flag(do_flag);
        self.edns = Some(edns);
    }

    pub fn dnssec_requested(&self) -> bool {
        self.edns.as_ref().map(|edns| edns.do_flag()).unwrap_or(false)
    }

    pub fn max_udp_payload_size(&self) -> u16 {
        self.edns
            .as_ref()
            .map(|edns| edns.payload_size())
            .unwrap_or(edns::MIN_UDP_PAYLOAD)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_query_round_trip() {
        let mut query = DNSPacket::query(0x1234, "example.com".parse().unwrap(), DNSResourceType::A);
        query.header.rd = true;
        query.header.ad = true;
        query.add_edns(1420, true);

        let bytes = query.serialize().unwrap();
        let parsed = DNSPacket::parse(&bytes).unwrap();
        assert_eq!(parsed.questions, query.questions);
        assert!(parsed.header.rd && parsed.header.ad);
        assert!(parsed.dnssec_requested());
        assert_eq!(parsed.max_udp_payload_size(), 1420);
        assert!(parsed.resources.is_empty());
    }

    #[test]
    fn test_extended_rcode() {
        let mut packet = DNSPacket::default();
        packet.set_rcode(ResponseCode::BadVers);
        assert_eq!(packet.header.rcode, 0);
        assert_eq!(packet.rcode(), ResponseCode::BadVers);

        packet.set_rcode(ResponseCode::NXDomain);
        assert_eq!(packet.rcode(), ResponseCode::NXDomain);
    }

    #[test]
    fn test_truncated_packet_is_error() {
        let query = DNSPacket::query(1, "example.com".parse().unwrap(), DNSResourceType::A);
        let bytes = query.serialize().unwrap();
        assert!(DNSPacket::parse(&bytes[..bytes.len() - 3]).is_err());
        assert!(matches!(DNSPacket::parse(&bytes[..4]), Err(ParseError::InvalidHeader)));
    }
}
