use std::fmt;
use std::str::FromStr;

use super::ParseError;

/// Longest name allowed on the wire, length octets included (RFC 1035 §3.1)
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_LABEL_LEN: usize = 63;

/// A fully qualified domain name.
///
/// Labels are kept as raw octets and compared byte for byte, so
/// `Example.com.` and `example.com.` are different names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DomainName {
    labels: Vec<Vec<u8>>,
}

impl DomainName {
    pub fn root() -> Self {
        Self::default()
    }

    fn push_label(&mut self, label: &[u8]) -> Result<(), ParseError> {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(ParseError::InvalidLabel);
        }
        if self.wire_len() + label.len() + 1 > MAX_NAME_LEN {
            return Err(ParseError::NameTooLong);
        }
        self.labels.push(label.to_vec());
        Ok(())
    }

    pub fn labels(&self) -> impl Iterator<Item = &[u8]> {
        self.labels.iter().map(|l| l.as_slice())
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Uncompressed wire length, including the terminating root label
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }

    pub fn eq_ignore_ascii_case(&self, other: &Self) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(&other.labels)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        for label in &self.labels {
            out.push(label.len() as u8);
            out.extend_from_slice(label);
        }
        out.push(0);
        out
    }

    /// Decode a name starting at `start` in `data`.
    ///
    /// Compression pointers are resolved against `packet`, which is the
    /// whole message `data` was taken from. Returns the name and the number
    /// of octets it occupies in `data`.
    pub fn decode(data: &[u8], start: usize, packet: &[u8]) -> Result<(Self, usize), ParseError> {
        let mut name = Self::root();
        let mut buf = data;
        let mut pos = start;
        let mut consumed = None;
        // Every jump must land before the previous one, which rules out loops.
        let mut jump_limit = usize::MAX;

        loop {
            let len = *buf.get(pos).ok_or(ParseError::InvalidLabel)? as usize;
            match len & 0xC0 {
                0x00 if len == 0 => {
                    consumed.get_or_insert(pos + 1 - start);
                    break;
                }
                0x00 => {
                    let label = buf
                        .get(pos + 1..pos + 1 + len)
                        .ok_or(ParseError::InvalidLabel)?;
                    name.push_label(label)?;
                    pos += len + 1;
                }
                0xC0 => {
                    let low = *buf.get(pos + 1).ok_or(ParseError::InvalidPointer)? as usize;
                    let target = ((len & 0x3F) << 8) | low;
                    consumed.get_or_insert(pos + 2 - start);
                    if target >= jump_limit || target >= packet.len() {
                        return Err(ParseError::InvalidPointer);
                    }
                    jump_limit = target;
                    buf = packet;
                    pos = target;
                }
                _ => return Err(ParseError::InvalidLabel),
            }
        }

        Ok((name, consumed.unwrap_or_default()))
    }
}

impl FromStr for DomainName {
    type Err = ParseError;

    /// Parse presentation format. A trailing dot is optional and `\X` /
    /// `\DDD` escapes are understood.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut name = Self::root();
        if s.is_empty() || s == "." {
            return Ok(name);
        }

        let bytes = s.as_bytes();
        let mut label = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'.' => {
                    name.push_label(&label)?;
                    label.clear();
                    i += 1;
                    if i == bytes.len() {
                        return Ok(name);
                    }
                }
                b'\\' => {
                    let digits = bytes.get(i + 1..i + 4).filter(|d| d.iter().all(u8::is_ascii_digit));
                    if let Some(digits) = digits {
                        let value = digits
                            .iter()
                            .fold(0u16, |acc, d| acc * 10 + (d - b'0') as u16);
                        label.push(u8::try_from(value).map_err(|_| ParseError::InvalidLabel)?);
                        i += 4;
                    } else {
                        label.push(*bytes.get(i + 1).ok_or(ParseError::InvalidLabel)?);
                        i += 2;
                    }
                }
                b => {
                    label.push(b);
                    i += 1;
                }
            }
        }
        name.push_label(&label)?;
        Ok(name)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_str(".");
        }
        for label in &self.labels {
            for &b in label {
                match b {
                    b'.' | b'\\' | b'"' | b'(' | b')' | b';' | b'@' | b'$' => {
                        write!(f, "\\{}", b as char)?
                    }
                    0x21..=0x7E => write!(f, "{}", b as char)?,
                    _ => write!(f, "\\{:03}", b)?,
                }
            }
            f.write_str(".")?;
        }
        Ok(())
    }
}
