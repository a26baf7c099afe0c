use tracing::{debug, trace};

use super::bitmap::TypeSet;
use crate::dns::DNSPacket;
use crate::dns::enums::{DNSResourceType, ResponseCode};
use crate::dns::name::DomainName;
use crate::dns::rdata::RData;
use crate::error::ResolveError;
use crate::resolver::{Resolve, ResolutionOutcome};

/// Recovers NXDOMAIN from "black lies" answers.
///
/// A server using black lies answers a query for a missing name with an
/// authenticated NOERROR/NODATA and an NSEC record at the query name whose
/// bitmap holds only NSEC and RRSIG. A name that really exists always owns
/// at least one other type, so that exact bitmap marks a disguised
/// NXDOMAIN.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackLiesDetector;

impl BlackLiesDetector {
    pub fn new() -> Self {
        Self
    }

    /// Corrected response code for a resolution outcome. Failures are
    /// handed back unchanged.
    pub fn rcode(
        &self,
        qname: &DomainName,
        qtype: DNSResourceType,
        outcome: &ResolutionOutcome,
    ) -> Result<ResponseCode, ResolveError> {
        match outcome {
            ResolutionOutcome::NonExistent => Ok(ResponseCode::NXDomain),
            ResolutionOutcome::Message(response) => Ok(self.inspect(qname, qtype, response)),
            ResolutionOutcome::Failure(e) => Err(e.clone()),
        }
    }

    /// Corrected response code for a received message
    pub fn inspect(
        &self,
        qname: &DomainName,
        qtype: DNSResourceType,
        response: &DNSPacket,
    ) -> ResponseCode {
        let rcode = response.rcode();
        if !response.is_authenticated()
            || rcode != ResponseCode::NoError
            || !response.answers.is_empty()
        {
            return rcode;
        }

        trace!("Authenticated NODATA for {} {}, checking authority", qname, qtype);
        let minimal = TypeSet::from([DNSResourceType::NSEC, DNSResourceType::RRSIG]);
        for rrset in response.authority_sets() {
            if rrset.name != qname {
                continue;
            }
            if rrset.rtype != DNSResourceType::NSEC {
                trace!("Skipping {} set at {}", rrset.rtype, qname);
                continue;
            }

            let Some(rdata) = rrset.rdata().next() else {
                continue;
            };
            return match nsec_type_set(rdata) {
                Some(types) if types == minimal => {
                    debug!("NSEC at {} lists only {}: black lie, NXDOMAIN", qname, types);
                    ResponseCode::NXDomain
                }
                Some(types) => {
                    debug!("NSEC at {} lists {}: genuine NODATA", qname, types);
                    rcode
                }
                None => rcode,
            };
        }

        rcode
    }

    /// Resolve `qname`/`qtype` and return the corrected response code
    pub async fn check<R>(
        &self,
        resolver: &R,
        qname: &DomainName,
        qtype: DNSResourceType,
    ) -> Result<ResponseCode, ResolveError>
    where
        R: Resolve + ?Sized,
    {
        let outcome = resolver.resolve(qname, qtype).await;
        self.rcode(qname, qtype, &outcome)
    }
}

/// Types listed by an NSEC record, or `None` if the record data or its
/// bitmap cannot be decoded
pub fn nsec_type_set(rdata: &RData) -> Option<TypeSet> {
    match rdata {
        RData::NSEC(nsec) => match nsec.types.type_set() {
            Ok(types) => Some(types),
            Err(e) => {
                debug!("Ignoring NSEC record with malformed bitmap: {}", e);
                None
            }
        },
        _ => {
            debug!("Ignoring NSEC record with undecodable data");
            None
        }
    }
}
