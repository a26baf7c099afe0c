use std::fmt;

use super::ParseError;

/// DNSSEC OK bit in the OPT flags (RFC 3225)
pub const DO_FLAG: u16 = 0x8000;

/// Payload size assumed when a peer does not speak EDNS
pub const MIN_UDP_PAYLOAD: u16 = 512;

/// EDNS0 OPT pseudo-record (RFC 6891).
///
/// On the wire the OPT record reuses the fixed RR fields: CLASS carries the
/// requestor's UDP payload size and TTL packs the extended rcode, version
/// and flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdnsOpt {
    pub udp_payload_size: u16,
    /// Upper eight bits of the 12-bit response code
    pub extended_rcode: u8,
    pub version: u8,
    pub flags: u16,
    pub options: Vec<EdnsOption>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdnsOption {
    pub code: u16,
    pub data: Vec<u8>,
}

impl Default for EdnsOpt {
    fn default() -> Self {
        Self::with_payload_size(1232)
    }
}

impl EdnsOpt {
    pub fn with_payload_size(payload_size: u16) -> Self {
        Self {
            udp_payload_size: payload_size,
            extended_rcode: 0,
            version: 0,
            flags: 0,
            options: Vec::new(),
        }
    }

    pub fn do_flag(&self) -> bool {
        (self.flags & DO_FLAG) != 0
    }

    pub fn set_do_flag(&mut self, value: bool) {
        if value {
            self.flags |= DO_FLAG;
        } else {
            self.flags &= !DO_FLAG;
        }
    }

    /// Payload size, never below the classic 512-octet limit
    pub fn payload_size(&self) -> u16 {
        self.udp_payload_size.max(MIN_UDP_PAYLOAD)
    }

    pub fn find_option(&self, code: u16) -> Option<&EdnsOption> {
        self.options.iter().find(|opt| opt.code == code)
    }

    pub fn parse_from_resource(class: u16, ttl: u32, rdata: &[u8]) -> Result<Self, ParseError> {
        let mut options = Vec::new();
        let mut pos = 0;

        while pos < rdata.len() {
            let header = rdata
                .get(pos..pos + 4)
                .ok_or_else(|| ParseError::InvalidRecordData("truncated EDNS option".to_string()))?;
            let code = u16::from_be_bytes([header[0], header[1]]);
            let len = u16::from_be_bytes([header[2], header[3]]) as usize;
            pos += 4;

            let data = rdata.get(pos..pos + len).ok_or_else(|| {
                ParseError::InvalidRecordData(format!("EDNS option {} overruns record", code))
            })?;
            pos += len;

            options.push(EdnsOption {
                code,
                data: data.to_vec(),
            });
        }

        Ok(EdnsOpt {
            udp_payload_size: class,
            extended_rcode: (ttl >> 24) as u8,
            version: (ttl >> 16) as u8,
            flags: ttl as u16,
            options,
        })
    }

    /// CLASS, TTL and RDATA for writing this OPT record
    pub fn to_resource_format(&self) -> (u16, u32, Vec<u8>) {
        let ttl = ((self.extended_rcode as u32) << 24)
            | ((self.version as u32) << 16)
            | (self.flags as u32);

        let mut rdata = Vec::new();
        for option in &self.options {
            rdata.extend_from_slice(&option.code.to_be_bytes());
            rdata.extend_from_slice(&(option.data.len() as u16).to_be_bytes());
            rdata.extend_from_slice(&option.data);
        }

        (self.udp_payload_size, ttl, rdata)
    }
}

impl fmt::Display for EdnsOpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EDNS{}: payload={}, flags=0x{:04x}{}, options={}",
            self.version,
            self.udp_payload_size,
            self.flags,
            if self.do_flag() { " (DO)" } else { "" },
            self.options.len()
        )
    }
}
