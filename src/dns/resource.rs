use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::{
    ParseError,
    common::PacketComponent,
    enums::{DNSResourceClass, DNSResourceType},
    name::DomainName,
    rdata::RData,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSResource {
    pub name: DomainName,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdata: RData,
}

impl DNSResource {
    pub fn new(name: DomainName, rtype: DNSResourceType, ttl: u32, rdata: RData) -> Self {
        Self {
            name,
            rtype,
            rclass: DNSResourceClass::IN,
            ttl,
            rdata,
        }
    }
}

impl PacketComponent for DNSResource {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        let rdata = self.rdata.to_wire();
        let rdlength = u16::try_from(rdata.len())
            .map_err(|_| ParseError::InvalidRecordData("record data too long".to_string()))?;

        self.write_name(writer, &self.name)?;
        writer.write_var::<u16>(16, self.rtype.into())?;
        writer.write_var::<u16>(16, self.rclass.into())?;
        writer.write_var::<u32>(32, self.ttl)?;
        writer.write_var::<u16>(16, rdlength)?;
        writer.write_bytes(&rdata)?;
        Ok(())
    }

    fn read<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet: &[u8],
    ) -> Result<(), ParseError> {
        self.name = self.read_name(reader, packet)?;
        self.rtype = reader.read_var::<u16>(16)?.into();
        self.rclass = reader.read_var::<u16>(16)?.into();
        self.ttl = reader.read_var::<u32>(32)?;
        let rdlength = reader.read_var::<u16>(16)?;
        let mut buf = vec![0_u8; rdlength as usize];
        reader.read_bytes(&mut buf)?;
        self.rdata = RData::decode_lossy(self.rtype, &buf, packet);

        Ok(())
    }
}

/// Records of one section sharing owner name, type and class
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSet<'a> {
    pub name: &'a DomainName,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub records: Vec<&'a DNSResource>,
}

impl RecordSet<'_> {
    pub fn rdata(&self) -> impl Iterator<Item = &RData> {
        self.records.iter().map(|r| &r.rdata)
    }
}

/// Group a section into record sets, ordered by first appearance
pub fn group_record_sets(records: &[DNSResource]) -> Vec<RecordSet<'_>> {
    let mut sets: Vec<RecordSet<'_>> = Vec::new();
    for record in records {
        let existing = sets.iter_mut().find(|set| {
            set.rtype == record.rtype && set.rclass == record.rclass && *set.name == record.name
        });
        match existing {
            Some(set) => set.records.push(record),
            None => sets.push(RecordSet {
                name: &record.name,
                rtype: record.rtype,
                rclass: record.rclass,
                records: vec![record],
            }),
        }
    }
    sets
}
