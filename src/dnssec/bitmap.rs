//! NSEC type bitmap encoding (RFC 4034 §4.1.2).
//!
//! The type space is split into 256 windows keyed by the high octet of the
//! type code. Each present window is encoded as the window number, a bitmap
//! length from 1 to 32, and the bitmap itself, most significant bit first:
//! bit `j` of octet `i` in window `w` stands for type `w * 256 + i * 8 + j`.
//! Windows appear in increasing order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

use crate::dns::enums::DNSResourceType;

pub const MAX_WINDOW_LEN: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BitmapError {
    #[error("Truncated window header at offset {0}")]
    TruncatedHeader(usize),

    #[error("Window {window} has invalid bitmap length {len}")]
    InvalidLength { window: u8, len: usize },

    #[error("Window {window} declares {declared} octets but {available} remain")]
    TruncatedBitmap {
        window: u8,
        declared: usize,
        available: usize,
    },

    #[error("Window {window} follows window {previous}")]
    OutOfOrder { window: u8, previous: u8 },
}

/// One window block of a type bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<'a> {
    number: u8,
    bitmap: &'a [u8],
}

impl Window<'_> {
    pub fn types(&self) -> impl Iterator<Item = DNSResourceType> + '_ {
        let base = (self.number as u16) << 8;
        self.bitmap.iter().enumerate().flat_map(move |(i, &octet)| {
            (0..8u16)
                .filter(move |j| octet & (0x80u8 >> j) != 0)
                .map(move |j| DNSResourceType::from(base + (i as u16) * 8 + j))
        })
    }
}

/// The raw type bitmap field of an NSEC record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBitmap {
    raw: Vec<u8>,
}

impl TypeBitmap {
    /// Wrap bitmap octets as received. Nothing is validated until the
    /// windows are walked.
    pub fn from_wire(raw: impl Into<Vec<u8>>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn from_types<I>(types: I) -> Self
    where
        I: IntoIterator<Item = DNSResourceType>,
    {
        let mut windows: BTreeMap<u8, Vec<u8>> = BTreeMap::new();
        for rtype in types {
            let code = rtype.to_u16();
            let window = (code >> 8) as u8;
            let low = (code & 0x00FF) as usize;

            let bitmap = windows.entry(window).or_default();
            if bitmap.len() < low / 8 + 1 {
                bitmap.resize(low / 8 + 1, 0);
            }
            bitmap[low / 8] |= 0x80 >> (low % 8);
        }

        let mut raw = Vec::new();
        for (window, bitmap) in windows {
            raw.push(window);
            raw.push(bitmap.len() as u8);
            raw.extend_from_slice(&bitmap);
        }
        Self { raw }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn windows(&self) -> Windows<'_> {
        Windows {
            raw: &self.raw,
            pos: 0,
            previous: None,
            failed: false,
        }
    }

    /// Decode every window into the set of types present at the owner name.
    /// Any malformed window fails the whole bitmap.
    pub fn type_set(&self) -> Result<TypeSet, BitmapError> {
        let mut types = TypeSet::default();
        for window in self.windows() {
            types.0.extend(window?.types());
        }
        Ok(types)
    }
}

/// Iterator over the window blocks of a [`TypeBitmap`]. Stops after the
/// first error.
pub struct Windows<'a> {
    raw: &'a [u8],
    pos: usize,
    previous: Option<u8>,
    failed: bool,
}

impl<'a> Windows<'a> {
    fn next_window(&mut self) -> Result<Window<'a>, BitmapError> {
        let header = self
            .raw
            .get(self.pos..self.pos + 2)
            .ok_or(BitmapError::TruncatedHeader(self.pos))?;
        let (number, len) = (header[0], header[1] as usize);

        if let Some(previous) = self.previous {
            if number <= previous {
                return Err(BitmapError::OutOfOrder {
                    window: number,
                    previous,
                });
            }
        }
        if len == 0 || len > MAX_WINDOW_LEN {
            return Err(BitmapError::InvalidLength {
                window: number,
                len,
            });
        }

        let start = self.pos + 2;
        let bitmap = self
            .raw
            .get(start..start + len)
            .ok_or(BitmapError::TruncatedBitmap {
                window: number,
                declared: len,
                available: self.raw.len() - start,
            })?;

        self.pos = start + len;
        self.previous = Some(number);
        Ok(Window { number, bitmap })
    }
}

impl<'a> Iterator for Windows<'a> {
    type Item = Result<Window<'a>, BitmapError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.raw.len() {
            return None;
        }
        let window = self.next_window();
        self.failed = window.is_err();
        Some(window)
    }
}

/// Record types present at an NSEC owner name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSet(BTreeSet<DNSResourceType>);

impl TypeSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Textual type names, in numeric type order
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|t| t.to_string()).collect()
    }
}

impl FromIterator<DNSResourceType> for TypeSet {
    fn from_iter<I: IntoIterator<Item = DNSResourceType>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[DNSResourceType; N]> for TypeSet {
    fn from(types: [DNSResourceType; N]) -> Self {
        types.into_iter().collect()
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DNSResourceType::*;

    #[test]
    fn test_decode_nsec_rrsig_only() {
        // Window 0, 6 octets: RRSIG (46) and NSEC (47)
        let bitmap = TypeBitmap::from_wire(vec![0x00, 0x06, 0, 0, 0, 0, 0, 0x03]);
        let types = bitmap.type_set().unwrap();
        assert_eq!(types, TypeSet::from([NSEC, RRSIG]));
        assert_eq!(types.names(), vec!["RRSIG", "NSEC"]);
    }

    #[test]
    fn test_decode_msb_first() {
        // A (1), NS (2), SOA (6), MX (15), RRSIG, NSEC, DNSKEY (48)
        let bitmap = TypeBitmap::from_wire(vec![
            0x00, 0x07, 0x62, 0x01, 0x00, 0x00, 0x00, 0x03, 0x80,
        ]);
        let types = bitmap.type_set().unwrap();
        assert_eq!(types, TypeSet::from([A, NS, SOA, MX, RRSIG, NSEC, DNSKEY]));
    }

    #[test]
    fn test_decode_high_window() {
        // CAA is 257: window 1, bit 1 of octet 0
        let bitmap = TypeBitmap::from_wire(vec![0x00, 0x01, 0x40, 0x01, 0x01, 0x40]);
        let types = bitmap.type_set().unwrap();
        assert_eq!(types, TypeSet::from([A, CAA]));
    }

    #[test]
    fn test_encode_matches_decode() {
        let types = TypeSet::from([A, AAAA, RRSIG, NSEC, CAA, Unknown(65280)]);
        let bitmap = TypeBitmap::from_types(types.0.iter().copied());
        assert_eq!(bitmap.type_set().unwrap(), types);

        let windows: Vec<u8> = bitmap.windows().map(|w| w.unwrap().number).collect();
        assert_eq!(windows, vec![0, 1, 255]);
    }

    #[test]
    fn test_empty_bitmap_is_empty_set() {
        let bitmap = TypeBitmap::default();
        assert!(bitmap.type_set().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_bitmaps() {
        let truncated = TypeBitmap::from_wire(vec![0x00, 0x06, 0, 0, 0x03]);
        assert_eq!(
            truncated.type_set(),
            Err(BitmapError::TruncatedBitmap {
                window: 0,
                declared: 6,
                available: 3
            })
        );

        let zero_len = TypeBitmap::from_wire(vec![0x00, 0x00]);
        assert!(matches!(
            zero_len.type_set(),
            Err(BitmapError::InvalidLength { window: 0, len: 0 })
        ));

        let too_long = TypeBitmap::from_wire(vec![0x00, 33]);
        assert!(matches!(too_long.type_set(), Err(BitmapError::InvalidLength { .. })));

        let dangling = TypeBitmap::from_wire(vec![0x00, 0x01, 0x40, 0x01]);
        assert_eq!(dangling.type_set(), Err(BitmapError::TruncatedHeader(3)));

        let unordered = TypeBitmap::from_wire(vec![0x01, 0x01, 0x40, 0x00, 0x01, 0x40]);
        assert_eq!(
            unordered.type_set(),
            Err(BitmapError::OutOfOrder {
                window: 0,
                previous: 1
            })
        );
    }

    #[test]
    fn test_last_window_full_width() {
        let mut raw = vec![0xFF, 32];
        raw.extend_from_slice(&[0u8; 31]);
        raw.push(0x01);
        let types = TypeBitmap::from_wire(raw).type_set().unwrap();
        assert_eq!(types, TypeSet::from([DNSResourceType::Unknown(u16::MAX)]));
        assert_eq!(types.to_string(), "TYPE65535");
    }

    #[test]
    fn test_windows_stop_after_error() {
        let bitmap = TypeBitmap::from_wire(vec![0x00, 0x00, 0x00, 0x01, 0x40]);
        let results: Vec<_> = bitmap.windows().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
