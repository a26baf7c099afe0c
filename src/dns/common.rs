use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::ParseError;
use super::name::{DomainName, MAX_NAME_LEN};

pub trait PacketComponent {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError>;

    /// Read the component at the reader's position. `packet` is the whole
    /// message, used to follow compression pointers.
    fn read<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet: &[u8],
    ) -> Result<(), ParseError>;

    fn read_name<E: Endianness>(
        &self,
        reader: &mut BitReader<&[u8], E>,
        packet: &[u8],
    ) -> Result<DomainName, ParseError> {
        // Collect the inline part of the name, up to the root label or the
        // first compression pointer, then decode it against the packet.
        let mut raw = Vec::new();
        loop {
            let len = reader.read_var::<u8>(8)?;
            raw.push(len);
            match len & 0xC0 {
                0x00 if len == 0 => break,
                0x00 => {
                    let mut label = vec![0; len as usize];
                    reader.read_bytes(&mut label)?;
                    raw.extend_from_slice(&label);
                    if raw.len() > MAX_NAME_LEN {
                        return Err(ParseError::NameTooLong);
                    }
                }
                0xC0 => {
                    raw.push(reader.read_var::<u8>(8)?);
                    break;
                }
                _ => return Err(ParseError::InvalidLabel),
            }
        }

        let (name, _) = DomainName::decode(&raw, 0, packet)?;
        Ok(name)
    }

    fn write_name<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
        name: &DomainName,
    ) -> Result<(), ParseError> {
        for label in name.labels() {
            writer.write_var::<u8>(8, label.len() as u8)?;
            writer.write_bytes(label)?;
        }
        writer.write_var::<u8>(8, 0)?;

        Ok(())
    }
}
