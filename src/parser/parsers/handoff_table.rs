// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::codec::{ByteReader, GUID_SIZE};
use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::parser::{EventBody, EventParser};
use core::fmt;
use serde::Serialize;

/// `UEFI_PLATFORM_FIRMWARE_BLOB`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareBlob {
    pub blob_base: u64,
    pub blob_length: u64,
}

/// `UEFI_PLATFORM_FIRMWARE_BLOB2`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareBlob2 {
    pub blob_description: String,
    pub blob_base: u64,
    pub blob_length: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationTable {
    pub vendor_guid: Guid,
    pub vendor_table: u64,
}

/// `UEFI_HANDOFF_TABLE_POINTERS` and `UEFI_HANDOFF_TABLE_POINTERS2`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoffTables {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_description: Option<String>,
    pub tables: Vec<ConfigurationTable>,
}

fn read_description(reader: &mut ByteReader) -> Result<String> {
    let size = reader.read_u8()?;
    let raw = reader.read_bytes(size as usize)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

impl fmt::Display for FirmwareBlob {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "base 0x{:x} length 0x{:x}", self.blob_base, self.blob_length)
    }
}

impl fmt::Display for FirmwareBlob2 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} base 0x{:x} length 0x{:x}",
            self.blob_description, self.blob_base, self.blob_length
        )
    }
}

impl fmt::Display for HandoffTables {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(desc) = &self.table_description {
            write!(f, "{}: ", desc)?;
        }
        let tables: Vec<String> = self
            .tables
            .iter()
            .map(|t| {
                let name = t
                    .vendor_guid
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| t.vendor_guid.to_string());
                format!("{}@0x{:x}", name, t.vendor_table)
            })
            .collect();
        write!(f, "[{}]", tables.join(", "))
    }
}

pub struct EvFirmwareBlobParser;

impl EventParser for EvFirmwareBlobParser {
    fn parse(&self, data: &[u8], _pcr_index: u32, _config: &ParserConfig) -> Result<EventBody> {
        let mut reader = ByteReader::new(data);
        Ok(EventBody::FirmwareBlob(FirmwareBlob {
            blob_base: reader.read_u64()?,
            blob_length: reader.read_u64()?,
        }))
    }
}

pub struct EvFirmwareBlob2Parser;

impl EventParser for EvFirmwareBlob2Parser {
    fn parse(&self, data: &[u8], _pcr_index: u32, _config: &ParserConfig) -> Result<EventBody> {
        let mut reader = ByteReader::new(data);
        let blob_description = read_description(&mut reader)?;
        Ok(EventBody::FirmwareBlob2(FirmwareBlob2 {
            blob_description,
            blob_base: reader.read_u64()?,
            blob_length: reader.read_u64()?,
        }))
    }
}

/// Handles both table pointer layouts; the second one is prefixed by a description.
pub struct EvHandoffTableParser {
    pub with_description: bool,
}

impl EventParser for EvHandoffTableParser {
    fn parse(&self, data: &[u8], _pcr_index: u32, config: &ParserConfig) -> Result<EventBody> {
        let mut reader = ByteReader::new(data);
        let table_description = if self.with_description {
            Some(read_description(&mut reader)?)
        } else {
            None
        };

        let count = reader.read_u64()?;
        Error::check_limit("handoff table count", count, config.max_handoff_tables)?;
        let needed = count as usize * (GUID_SIZE + 8);
        if needed > reader.remaining() {
            return Err(Error::InsufficientBuffer {
                needed,
                remaining: reader.remaining(),
            });
        }

        let mut tables = Vec::with_capacity(count as usize);
        for _ in 0..count {
            tables.push(ConfigurationTable {
                vendor_guid: reader.read_guid()?,
                vendor_table: reader.read_u64()?,
            });
        }

        let tables = HandoffTables {
            table_description,
            tables,
        };
        Ok(if self.with_description {
            EventBody::HandoffTables2(tables)
        } else {
            EventBody::HandoffTables(tables)
        })
    }
}
