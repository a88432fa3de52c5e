// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::codec::{ucs2_to_string, ByteReader};
use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::parser::{EventBody, EventParser};
use core::fmt;
use serde::Serialize;

/// Bytes of `EFI_PARTITION_TABLE_HEADER` covered by named fields.
pub const GPT_HEADER_FIELDS_SIZE: u32 = 92;
/// Minimum `SizeOfPartitionEntry`; larger entries carry a reserved tail.
pub const GPT_PARTITION_ENTRY_SIZE: u32 = 128;
const PARTITION_NAME_SIZE: usize = 72;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GptHeader {
    pub signature: u64,
    pub revision: u32,
    pub header_size: u32,
    pub header_crc32: u32,
    pub my_lba: u64,
    pub alternate_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub disk_guid: Guid,
    pub partition_entry_lba: u64,
    pub number_of_partition_entries: u32,
    pub size_of_partition_entry: u32,
    pub partition_entry_array_crc32: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GptPartition {
    pub partition_type_guid: Guid,
    pub unique_partition_guid: Guid,
    pub starting_lba: u64,
    pub ending_lba: u64,
    pub attributes: u64,
    pub partition_name: String,
}

/// `UEFI_GPT_DATA`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GptEvent {
    pub header: GptHeader,
    pub partitions: Vec<GptPartition>,
}

impl GptHeader {
    fn parse(reader: &mut ByteReader) -> Result<Self> {
        let signature = reader.read_u64()?;
        let revision = reader.read_u32()?;
        let header_size = reader.read_u32()?;
        let header_crc32 = reader.read_u32()?;
        let _reserved = reader.read_u32()?;
        let header = GptHeader {
            signature,
            revision,
            header_size,
            header_crc32,
            my_lba: reader.read_u64()?,
            alternate_lba: reader.read_u64()?,
            first_usable_lba: reader.read_u64()?,
            last_usable_lba: reader.read_u64()?,
            disk_guid: reader.read_guid()?,
            partition_entry_lba: reader.read_u64()?,
            number_of_partition_entries: reader.read_u32()?,
            size_of_partition_entry: reader.read_u32()?,
            partition_entry_array_crc32: reader.read_u32()?,
        };

        let reserved_tail = header_size.checked_sub(GPT_HEADER_FIELDS_SIZE).ok_or_else(|| {
            Error::malformed(format!(
                "GPT header size {} is below {}",
                header_size, GPT_HEADER_FIELDS_SIZE
            ))
        })?;
        reader.skip(reserved_tail as usize)?;
        Ok(header)
    }
}

impl GptPartition {
    fn parse(reader: &mut ByteReader) -> Result<Self> {
        Ok(GptPartition {
            partition_type_guid: reader.read_guid()?,
            unique_partition_guid: reader.read_guid()?,
            starting_lba: reader.read_u64()?,
            ending_lba: reader.read_u64()?,
            attributes: reader.read_u64()?,
            partition_name: ucs2_to_string(reader.read_bytes(PARTITION_NAME_SIZE)?),
        })
    }
}

impl fmt::Display for GptEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "disk {} with {} partitions",
            self.header.disk_guid,
            self.partitions.len()
        )?;
        for p in &self.partitions {
            let kind = p
                .partition_type_guid
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| p.partition_type_guid.to_string());
            write!(
                f,
                "\n    {} {:?} [{}..{}] {}",
                p.unique_partition_guid, p.partition_name, p.starting_lba, p.ending_lba, kind
            )?;
        }
        Ok(())
    }
}

pub struct EvGptParser;

impl EventParser for EvGptParser {
    fn parse(&self, data: &[u8], _pcr_index: u32, config: &ParserConfig) -> Result<EventBody> {
        let mut reader = ByteReader::new(data);
        let header = GptHeader::parse(&mut reader)?;

        let count = reader.read_u64()?;
        Error::check_limit("GPT partition count", count, config.max_gpt_partitions)?;
        let entry_size = header.size_of_partition_entry;
        if count > 0 && entry_size < GPT_PARTITION_ENTRY_SIZE {
            return Err(Error::malformed(format!(
                "GPT partition entry size {} is below {}",
                entry_size, GPT_PARTITION_ENTRY_SIZE
            )));
        }
        let needed = (count as usize).saturating_mul(entry_size as usize);
        if needed > reader.remaining() {
            return Err(Error::InsufficientBuffer {
                needed,
                remaining: reader.remaining(),
            });
        }

        let mut partitions = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut entry = reader.sub_reader(entry_size as usize)?;
            partitions.push(GptPartition::parse(&mut entry)?);
        }

        Ok(EventBody::Gpt(GptEvent { header, partitions }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ByteWriter;
    use uuid::uuid;

    fn gpt_event(header_size: u32, entry_size: u32, names: &[&str]) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.put_bytes(b"EFI PART")
            .put_u32(0x0001_0000)
            .put_u32(header_size)
            .put_u32(0xdead_beef)
            .put_u32(0)
            .put_u64(1)
            .put_u64(0x3a38_602f)
            .put_u64(34)
            .put_u64(0x3a38_5fde)
            .put_bytes(&[0x42; 16])
            .put_u64(2)
            .put_u32(128)
            .put_u32(entry_size)
            .put_u32(0x1234_5678);
        w.put_bytes(&vec![0; header_size.saturating_sub(GPT_HEADER_FIELDS_SIZE) as usize]);
        w.put_u64(names.len() as u64);
        let esp = Guid::from_uuid(uuid!("c12a7328-f81f-11d2-ba4b-00a0c93ec93b"));
        for (i, name) in names.iter().enumerate() {
            let mut entry = ByteWriter::new();
            entry
                .put_bytes(esp.as_bytes())
                .put_bytes(&[i as u8; 16])
                .put_u64(2048 * (i as u64 + 1))
                .put_u64(2048 * (i as u64 + 2) - 1)
                .put_u64(0)
                .put_ucs2(name, false);
            let mut entry = entry.into_vec();
            entry.resize(entry_size as usize, 0);
            w.put_bytes(&entry);
        }
        w.into_vec()
    }

    fn parse(data: &[u8]) -> Result<GptEvent> {
        match EvGptParser.parse(data, 5, &ParserConfig::default())? {
            EventBody::Gpt(gpt) => Ok(gpt),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_gpt_event() {
        let gpt = parse(&gpt_event(92, 128, &["EFI System", "root"])).unwrap();
        assert_eq!(gpt.header.signature.to_le_bytes(), *b"EFI PART");
        assert_eq!(gpt.header.disk_guid, Guid::from_bytes([0x42; 16]));
        assert_eq!(gpt.partitions.len(), 2);
        assert_eq!(gpt.partitions[0].partition_name, "EFI System");
        assert_eq!(gpt.partitions[1].starting_lba, 4096);
        assert!(gpt.to_string().contains("EFI System Partition"));
    }

    #[test]
    fn test_gpt_reserved_tail_and_large_entries() {
        let gpt = parse(&gpt_event(512, 256, &["a", "b", "c"])).unwrap();
        assert_eq!(gpt.header.header_size, 512);
        assert_eq!(gpt.partitions[2].partition_name, "c");
    }

    #[test]
    fn test_gpt_malformed() {
        assert!(matches!(
            parse(&gpt_event(91, 128, &[])),
            Err(Error::MalformedLength(_))
        ));
        assert!(matches!(
            parse(&gpt_event(92, 64, &["x"])),
            Err(Error::MalformedLength(_))
        ));

        let mut data = gpt_event(92, 128, &["x"]);
        data[92..100].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            parse(&data),
            Err(Error::AllocationLimitExceeded { .. })
        ));
        data[92..100].copy_from_slice(&2u64.to_le_bytes());
        assert!(matches!(parse(&data), Err(Error::InsufficientBuffer { .. })));
    }
}
