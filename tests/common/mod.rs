//! Builders for the responses a validating resolver hands back

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};

use blacklies::dns::{
    DNSPacket,
    enums::{DNSResourceType, ResponseCode},
    name::DomainName,
    rdata::{Nsec, RData, Rrsig, Soa},
    resource::DNSResource,
};
use blacklies::dnssec::TypeBitmap;
use tokio::net::UdpSocket;

pub fn name(s: &str) -> DomainName {
    s.parse().expect("valid test name")
}

/// A response to `qname`/`qtype` with RD, RA and the given AD bit
pub fn response(qname: &str, qtype: DNSResourceType, rcode: ResponseCode, ad: bool) -> DNSPacket {
    let mut packet = DNSPacket::query(0x4242, name(qname), qtype);
    packet.header.qr = true;
    packet.header.rd = true;
    packet.header.ra = true;
    packet.header.ad = ad;
    packet.add_edns(1232, true);
    packet.set_rcode(rcode);
    packet
}

pub fn nsec(owner: &str, next: &str, types: &[DNSResourceType]) -> DNSResource {
    nsec_with_bitmap(owner, next, TypeBitmap::from_types(types.iter().copied()))
}

pub fn nsec_with_bitmap(owner: &str, next: &str, types: TypeBitmap) -> DNSResource {
    DNSResource::new(
        name(owner),
        DNSResourceType::NSEC,
        300,
        RData::NSEC(Nsec {
            next_domain: name(next),
            types,
        }),
    )
}

pub fn rrsig(owner: &str, covered: DNSResourceType, signer: &str) -> DNSResource {
    DNSResource::new(
        name(owner),
        DNSResourceType::RRSIG,
        300,
        RData::RRSIG(Rrsig {
            type_covered: covered,
            algorithm: 13,
            labels: name(owner).label_count() as u8,
            original_ttl: 300,
            expiration: 1_700_086_400,
            inception: 1_699_999_999,
            key_tag: 34505,
            signer_name: name(signer),
            signature: vec![0xAB; 64],
        }),
    )
}

pub fn soa(zone: &str) -> DNSResource {
    DNSResource::new(
        name(zone),
        DNSResourceType::SOA,
        1800,
        RData::SOA(Soa {
            mname: name(&format!("ns1.{zone}")),
            rname: name(&format!("dns.{zone}")),
            serial: 2_023_110_801,
            refresh: 10000,
            retry: 2400,
            expire: 604800,
            minimum: 1800,
        }),
    )
}

pub fn a_record(owner: &str, addr: Ipv4Addr) -> DNSResource {
    DNSResource::new(name(owner), DNSResourceType::A, 300, RData::A(addr))
}

/// Authenticated NODATA for `qname` with an NSEC at `qname` listing `types`,
/// laid out the way online-signing servers answer
pub fn nodata_with_nsec(
    qname: &str,
    qtype: DNSResourceType,
    zone: &str,
    types: &[DNSResourceType],
) -> DNSPacket {
    let mut packet = response(qname, qtype, ResponseCode::NoError, true);
    packet.authorities = vec![
        soa(zone),
        rrsig(zone, DNSResourceType::SOA, zone),
        nsec(qname, &format!("\\000.{qname}"), types),
        rrsig(qname, DNSResourceType::NSEC, zone),
    ];
    packet
}

/// The disguised NXDOMAIN: the NSEC at the query name holds only NSEC and RRSIG
pub fn black_lie(qname: &str, qtype: DNSResourceType, zone: &str) -> DNSPacket {
    nodata_with_nsec(
        qname,
        qtype,
        zone,
        &[DNSResourceType::NSEC, DNSResourceType::RRSIG],
    )
}

/// Echo the query back as a response with `rcode`
pub fn reply_to(query: &DNSPacket, rcode: ResponseCode) -> DNSPacket {
    let mut reply = query.clone();
    reply.header.qr = true;
    reply.header.ra = true;
    reply.header.ad = false;
    reply.set_rcode(rcode);
    reply
}

/// UDP server answering every query with whatever `handler` returns
pub async fn udp_server<F>(handler: F) -> SocketAddr
where
    F: Fn(&DNSPacket) -> Vec<DNSPacket> + Send + Sync + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(serve_udp(socket, handler));
    addr
}

pub async fn udp_server_raw<F>(handler: F) -> SocketAddr
where
    F: Fn(&DNSPacket) -> Vec<Vec<u8>> + Send + Sync + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(serve_udp_raw(socket, handler));
    addr
}

pub async fn serve_udp<F>(socket: UdpSocket, handler: F)
where
    F: Fn(&DNSPacket) -> Vec<DNSPacket> + Send + Sync + 'static,
{
    serve_udp_raw(socket, move |query| {
        handler(query)
            .iter()
            .map(|reply| reply.serialize().unwrap())
            .collect()
    })
    .await
}

/// Like [`serve_udp`], but the handler writes the datagrams itself
pub async fn serve_udp_raw<F>(socket: UdpSocket, handler: F)
where
    F: Fn(&DNSPacket) -> Vec<Vec<u8>> + Send + Sync + 'static,
{
    let mut buf = vec![0u8; 4096];
    while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
        let Ok(query) = DNSPacket::parse(&buf[..len]) else {
            continue;
        };
        for bytes in handler(&query) {
            let _ = socket.send_to(&bytes, peer).await;
        }
    }
}
