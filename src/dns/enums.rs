use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use super::ParseError;

macro_rules! record_types {
    ($($variant:ident = $code:literal),+ $(,)?) => {
        /// Resource record types from the IANA registry. Codes without a
        /// named variant are carried as `Unknown`.
        #[derive(Copy, Clone, Debug, Default)]
        #[allow(clippy::upper_case_acronyms)]
        pub enum DNSResourceType {
            #[default]
            $($variant,)+
            Unknown(u16),
        }

        impl From<u16> for DNSResourceType {
            fn from(value: u16) -> Self {
                match value {
                    $($code => DNSResourceType::$variant,)+
                    x => DNSResourceType::Unknown(x),
                }
            }
        }

        impl From<DNSResourceType> for u16 {
            fn from(rtype: DNSResourceType) -> Self {
                match rtype {
                    $(DNSResourceType::$variant => $code,)+
                    DNSResourceType::Unknown(x) => x,
                }
            }
        }

        impl DNSResourceType {
            fn mnemonic(&self) -> Option<&'static str> {
                match self {
                    $(DNSResourceType::$variant => Some(stringify!($variant)),)+
                    DNSResourceType::Unknown(_) => None,
                }
            }

            fn from_mnemonic(text: &str) -> Option<Self> {
                $(if text.eq_ignore_ascii_case(stringify!($variant)) {
                    return Some(DNSResourceType::$variant);
                })+
                None
            }
        }
    };
}

record_types! {
    A = 1,
    NS = 2,
    MD = 3,
    MF = 4,
    CNAME = 5,
    SOA = 6,
    MB = 7,
    MG = 8,
    MR = 9,
    NULL = 10,
    WKS = 11,
    PTR = 12,
    HINFO = 13,
    MINFO = 14,
    MX = 15,
    TXT = 16,
    RP = 17,
    AFSDB = 18,
    SIG = 24,
    KEY = 25,
    AAAA = 28,
    LOC = 29,
    SRV = 33,
    NAPTR = 35,
    KX = 36,
    CERT = 37,
    DNAME = 39,
    OPT = 41,
    APL = 42,
    DS = 43,
    SSHFP = 44,
    IPSECKEY = 45,
    RRSIG = 46,
    NSEC = 47,
    DNSKEY = 48,
    DHCID = 49,
    NSEC3 = 50,
    NSEC3PARAM = 51,
    TLSA = 52,
    SMIMEA = 53,
    HIP = 55,
    CDS = 59,
    CDNSKEY = 60,
    OPENPGPKEY = 61,
    CSYNC = 62,
    ZONEMD = 63,
    SVCB = 64,
    HTTPS = 65,
    SPF = 99,
    TKEY = 249,
    TSIG = 250,
    IXFR = 251,
    AXFR = 252,
    MAILB = 253,
    MAILA = 254,
    ANY = 255,
    URI = 256,
    CAA = 257,
}

impl DNSResourceType {
    pub fn to_u16(self) -> u16 {
        self.into()
    }
}

// Equality, hashing and order all go by type code, so `Unknown(47)` and
// `NSEC` are the same type.
impl PartialEq for DNSResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.to_u16() == other.to_u16()
    }
}

impl Eq for DNSResourceType {}

impl Hash for DNSResourceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_u16().hash(state);
    }
}

impl Ord for DNSResourceType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_u16().cmp(&other.to_u16())
    }
}

impl PartialOrd for DNSResourceType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DNSResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(name) => f.write_str(name),
            // RFC 3597 generic type notation
            None => write!(f, "TYPE{}", self.to_u16()),
        }
    }
}

impl FromStr for DNSResourceType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if let Some(rtype) = Self::from_mnemonic(text) {
            return Ok(rtype);
        }
        if let Some(prefix) = text.get(..4) {
            if prefix.eq_ignore_ascii_case("TYPE") {
                if let Ok(code) = text[4..].parse::<u16>() {
                    return Ok(code.into());
                }
            }
        }
        Err(ParseError::UnknownType(s.to_string()))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DNSResourceClass {
    #[default]
    IN,
    CS,
    CH,
    HS,
    NONE,
    ANY,
    /// Unassigned class, or the payload size carried by an OPT record
    Unknown(u16),
}

impl From<u16> for DNSResourceClass {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceClass::IN,
            2 => DNSResourceClass::CS,
            3 => DNSResourceClass::CH,
            4 => DNSResourceClass::HS,
            254 => DNSResourceClass::NONE,
            255 => DNSResourceClass::ANY,
            x => DNSResourceClass::Unknown(x),
        }
    }
}

impl From<DNSResourceClass> for u16 {
    fn from(class: DNSResourceClass) -> Self {
        match class {
            DNSResourceClass::IN => 1,
            DNSResourceClass::CS => 2,
            DNSResourceClass::CH => 3,
            DNSResourceClass::HS => 4,
            DNSResourceClass::NONE => 254,
            DNSResourceClass::ANY => 255,
            DNSResourceClass::Unknown(x) => x,
        }
    }
}

/// DNS response codes (RFC 1035, RFC 2136, RFC 6891).
///
/// Values above 15 only occur when the EDNS extended rcode is combined with
/// the header rcode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    #[default]
    NoError,
    FormErr,
    ServFail,
    NXDomain,
    NotImp,
    Refused,
    YXDomain,
    YXRRSet,
    NXRRSet,
    NotAuth,
    NotZone,
    BadVers,
    Unknown(u16),
}

impl ResponseCode {
    pub fn to_u16(self) -> u16 {
        match self {
            ResponseCode::NoError => 0,
            ResponseCode::FormErr => 1,
            ResponseCode::ServFail => 2,
            ResponseCode::NXDomain => 3,
            ResponseCode::NotImp => 4,
            ResponseCode::Refused => 5,
            ResponseCode::YXDomain => 6,
            ResponseCode::YXRRSet => 7,
            ResponseCode::NXRRSet => 8,
            ResponseCode::NotAuth => 9,
            ResponseCode::NotZone => 10,
            ResponseCode::BadVers => 16,
            ResponseCode::Unknown(x) => x,
        }
    }

    /// Combine the 4-bit header rcode with the 8-bit EDNS extended rcode
    pub fn from_parts(header_rcode: u8, extended_rcode: u8) -> Self {
        (((extended_rcode as u16) << 4) | (header_rcode as u16 & 0x0F)).into()
    }

    /// Low four bits, as carried in the message header
    pub fn header_bits(self) -> u8 {
        (self.to_u16() & 0x0F) as u8
    }

    /// High eight bits, as carried in the EDNS OPT record
    pub fn extended_bits(self) -> u8 {
        ((self.to_u16() >> 4) & 0xFF) as u8
    }

    pub fn as_str(&self) -> Option<&'static str> {
        Some(match self {
            ResponseCode::NoError => "NOERROR",
            ResponseCode::FormErr => "FORMERR",
            ResponseCode::ServFail => "SERVFAIL",
            ResponseCode::NXDomain => "NXDOMAIN",
            ResponseCode::NotImp => "NOTIMP",
            ResponseCode::Refused => "REFUSED",
            ResponseCode::YXDomain => "YXDOMAIN",
            ResponseCode::YXRRSet => "YXRRSET",
            ResponseCode::NXRRSet => "NXRRSET",
            ResponseCode::NotAuth => "NOTAUTH",
            ResponseCode::NotZone => "NOTZONE",
            ResponseCode::BadVers => "BADVERS",
            ResponseCode::Unknown(_) => return None,
        })
    }
}

impl From<u16> for ResponseCode {
    fn from(value: u16) -> Self {
        match value {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormErr,
            2 => ResponseCode::ServFail,
            3 => ResponseCode::NXDomain,
            4 => ResponseCode::NotImp,
            5 => ResponseCode::Refused,
            6 => ResponseCode::YXDomain,
            7 => ResponseCode::YXRRSet,
            8 => ResponseCode::NXRRSet,
            9 => ResponseCode::NotAuth,
            10 => ResponseCode::NotZone,
            16 => ResponseCode::BadVers,
            x => ResponseCode::Unknown(x),
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.to_u16()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashSet};

    #[test]
    fn test_unknown_with_known_code_is_same_type() {
        let raw = DNSResourceType::Unknown(47);
        assert_eq!(raw, DNSResourceType::NSEC);
        assert_eq!(raw.cmp(&DNSResourceType::NSEC), Ordering::Equal);
        assert_ne!(DNSResourceType::Unknown(300), DNSResourceType::NSEC);

        let ordered: BTreeSet<_> = [raw, DNSResourceType::NSEC].into_iter().collect();
        assert_eq!(ordered.len(), 1);
        let hashed: HashSet<_> = [raw, DNSResourceType::NSEC].into_iter().collect();
        assert_eq!(hashed.len(), 1);
    }

    #[test]
    fn test_type_text_round_trip() {
        assert_eq!("nsec".parse::<DNSResourceType>().unwrap(), DNSResourceType::NSEC);
        assert_eq!("TYPE47".parse::<DNSResourceType>().unwrap(), DNSResourceType::NSEC);
        assert_eq!(
            "type65280".parse::<DNSResourceType>().unwrap(),
            DNSResourceType::Unknown(65280)
        );
        assert_eq!(DNSResourceType::Unknown(65280).to_string(), "TYPE65280");
        assert_eq!(DNSResourceType::NSEC3PARAM.to_string(), "NSEC3PARAM");
        assert!("BOGUS".parse::<DNSResourceType>().is_err());
        assert!("TYPE".parse::<DNSResourceType>().is_err());
    }

    #[test]
    fn test_type_ordering_is_numeric() {
        assert!(DNSResourceType::RRSIG < DNSResourceType::NSEC);
        assert!(DNSResourceType::NSEC < DNSResourceType::CAA);
        assert!(DNSResourceType::CAA < DNSResourceType::Unknown(300));
        assert!(DNSResourceType::Unknown(20) < DNSResourceType::SIG);
    }

    #[test]
    fn test_rcode_extended_combination() {
        let rcode = ResponseCode::from_parts(0, 1);
        assert_eq!(rcode, ResponseCode::BadVers);
        assert_eq!(rcode.header_bits(), 0);
        assert_eq!(rcode.extended_bits(), 1);
        assert_eq!(ResponseCode::from_parts(3, 0), ResponseCode::NXDomain);
    }

    #[test]
    fn test_rcode_text() {
        assert_eq!(ResponseCode::NXDomain.to_string(), "NXDOMAIN");
        assert_eq!(ResponseCode::NoError.to_string(), "NOERROR");
        assert_eq!(ResponseCode::Unknown(23).to_string(), "23");
    }
}
