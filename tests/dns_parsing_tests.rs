mod common;

use blacklies::BlackLiesDetector;
use blacklies::dns::{
    DNSPacket, ParseError,
    enums::{DNSResourceType, ResponseCode},
    rdata::RData,
};
use blacklies::dnssec::{TypeSet, denial::nsec_type_set};
use common::name;

/// Black-lies answer for blahblah.documentforce.com A, with compressed
/// owner names, an NSEC whose next name is `\000.blahblah.documentforce.com`
/// and an OPT record with DO set.
fn black_lie_wire() -> Vec<u8> {
    let mut packet = vec![
        0x12, 0x34, // id
        0x81, 0xA0, // QR RD, RA AD, NOERROR
        0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01,
    ];
    // Question at offset 12; "documentforce" starts at offset 21
    packet.extend_from_slice(b"\x08blahblah\x0ddocumentforce\x03com\x00");
    packet.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);

    // SOA documentforce.com
    packet.extend_from_slice(&[0xC0, 0x15, 0x00, 0x06, 0x00, 0x01]);
    packet.extend_from_slice(&[0x00, 0x00, 0x07, 0x08, 0x00, 0x20]);
    packet.extend_from_slice(b"\x03ns1\xC0\x15\x03dns\xC0\x15");
    for value in [2023110801u32, 10000, 2400, 604800, 1800] {
        packet.extend_from_slice(&value.to_be_bytes());
    }

    // NSEC blahblah.documentforce.com
    packet.extend_from_slice(&[0xC0, 0x0C, 0x00, 0x2F, 0x00, 0x01]);
    packet.extend_from_slice(&[0x00, 0x00, 0x01, 0x2C, 0x00, 0x0C]);
    packet.extend_from_slice(&[0x01, 0x00, 0xC0, 0x0C]);
    packet.extend_from_slice(&[0x00, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03]);

    // OPT, 1232 byte payload, DO
    packet.extend_from_slice(&[0x00, 0x00, 0x29, 0x04, 0xD0]);
    packet.extend_from_slice(&[0x00, 0x00, 0x80, 0x00, 0x00, 0x00]);
    packet
}

#[test]
fn test_parse_black_lie_response() {
    let packet = DNSPacket::parse(&black_lie_wire()).unwrap();

    assert_eq!(packet.header.id, 0x1234);
    assert!(packet.header.qr);
    assert!(packet.is_authenticated());
    assert_eq!(packet.rcode(), ResponseCode::NoError);
    assert!(packet.dnssec_requested());
    assert_eq!(packet.max_udp_payload_size(), 1232);
    // OPT is lifted out of the additional section
    assert!(packet.resources.is_empty());

    let qname = name("blahblah.documentforce.com");
    assert_eq!(packet.questions[0].name, qname);
    assert_eq!(packet.questions[0].qtype, DNSResourceType::A);

    let sets = packet.authority_sets();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].name, &name("documentforce.com"));
    assert_eq!(sets[0].rtype, DNSResourceType::SOA);
    match &sets[0].records[0].rdata {
        RData::SOA(soa) => {
            assert_eq!(soa.mname, name("ns1.documentforce.com"));
            assert_eq!(soa.rname, name("dns.documentforce.com"));
            assert_eq!(soa.minimum, 1800);
        }
        other => panic!("expected SOA, got {:?}", other),
    }

    assert_eq!(sets[1].name, &qname);
    let nsec = sets[1].records[0];
    match &nsec.rdata {
        RData::NSEC(rdata) => {
            assert_eq!(rdata.next_domain.label_count(), 4);
            assert_eq!(rdata.next_domain.labels().next(), Some(&[0u8][..]));
        }
        other => panic!("expected NSEC, got {:?}", other),
    }
    assert_eq!(
        nsec_type_set(&nsec.rdata),
        Some(TypeSet::from([DNSResourceType::NSEC, DNSResourceType::RRSIG]))
    );

    assert_eq!(
        BlackLiesDetector::new().inspect(&qname, DNSResourceType::A, &packet),
        ResponseCode::NXDomain
    );
}

#[test]
fn test_extended_rcode_from_opt() {
    let wire = [
        0xBE, 0xEF, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, // header
        0x00, 0x00, 0x29, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, // OPT
    ];
    let packet = DNSPacket::parse(&wire).unwrap();
    assert_eq!(packet.rcode(), ResponseCode::BadVers);
    assert_eq!(packet.rcode().to_string(), "BADVERS");
}

#[test]
fn test_malformed_packets_rejected() {
    assert_eq!(
        DNSPacket::parse(&[0x12, 0x34, 0x81]),
        Err(ParseError::InvalidHeader)
    );

    // Question name pointing at itself
    let mut looping = vec![0x00, 0x01, 0x81, 0x80, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
    looping.extend_from_slice(&[0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01]);
    assert!(DNSPacket::parse(&looping).is_err());

    // Record data running past the end of the message
    let mut wire = black_lie_wire();
    wire.truncate(wire.len() - 14);
    assert!(DNSPacket::parse(&wire).is_err());
}

#[test]
fn test_built_response_survives_the_wire() {
    let response = common::black_lie("gone.example.net", DNSResourceType::AAAA, "example.net");
    let wire = response.serialize().unwrap();
    let parsed = DNSPacket::parse(&wire).unwrap();

    assert_eq!(parsed.authorities.len(), 4);
    assert!(parsed.is_authenticated());
    assert_eq!(
        BlackLiesDetector::new().inspect(&name("gone.example.net"), DNSResourceType::AAAA, &parsed),
        ResponseCode::NXDomain
    );
}
