// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! `UEFI_VARIABLE_DATA` bodies and the structures found inside well-known variables.

use crate::codec::{ByteReader, GUID_SIZE};
use crate::config::ParserConfig;
use crate::device_path::DevicePath;
use crate::enums::{authority_kind, variable_kind, VariableKind};
use crate::error::{Error, Result};
use crate::guid::{serialize_hex, Guid};
use crate::parser::{EventBody, EventParser};
use core::fmt;
use log::trace;
use serde::Serialize;

/// Fixed part of `EFI_SIGNATURE_LIST`: type GUID and three u32 sizes.
const SIGNATURE_LIST_HEADER_SIZE: u32 = GUID_SIZE as u32 + 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UefiVariable {
    pub variable_name: Guid,
    pub unicode_name: String,
    #[serde(serialize_with = "serialize_hex")]
    pub variable_data: Vec<u8>,
    pub value: VariableValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VariableValue {
    Boolean(bool),
    BootOrder(Vec<u16>),
    LoadOption(LoadOption),
    SignatureLists(Vec<SignatureList>),
    SignatureData(SignatureData),
    Text(String),
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureData {
    pub signature_owner: Guid,
    #[serde(serialize_with = "serialize_hex")]
    pub signature_data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureList {
    pub signature_type: Guid,
    pub signature_size: u32,
    #[serde(serialize_with = "serialize_hex")]
    pub signature_header: Vec<u8>,
    pub signatures: Vec<SignatureData>,
}

/// `EFI_LOAD_OPTION` as stored in `Boot####`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadOption {
    pub attributes: u32,
    pub description: String,
    pub file_path_list: DevicePath,
    #[serde(serialize_with = "serialize_hex")]
    pub optional_data: Vec<u8>,
}

/// The four fixed fields every variable event starts with.
struct VariableHeader<'a> {
    variable_name: Guid,
    name: &'a [u8],
    data: &'a [u8],
}

fn read_variable_header<'a>(
    reader: &mut ByteReader<'a>,
    config: &ParserConfig,
) -> Result<VariableHeader<'a>> {
    let variable_name = reader.read_guid()?;
    let name_chars = reader.read_u64()?;
    let data_length = reader.read_u64()?;
    Error::check_limit(
        "variable name length",
        name_chars,
        config.max_variable_name_chars,
    )?;
    Error::check_limit(
        "variable data length",
        data_length,
        config.max_variable_data_size,
    )?;
    let name = reader.read_bytes(name_chars as usize * 2)?;
    let data = reader.read_bytes(data_length as usize)?;
    Ok(VariableHeader {
        variable_name,
        name,
        data,
    })
}

/// Returns only the `VariableData` field of a variable event.
pub fn variable_data<'a>(data: &'a [u8], config: &ParserConfig) -> Result<&'a [u8]> {
    Ok(read_variable_header(&mut ByteReader::new(data), config)?.data)
}

impl SignatureList {
    fn parse(reader: &mut ByteReader) -> Result<Self> {
        let signature_type = reader.read_guid()?;
        let list_size = reader.read_u32()?;
        let header_size = reader.read_u32()?;
        let signature_size = reader.read_u32()?;

        let body_size = list_size
            .checked_sub(SIGNATURE_LIST_HEADER_SIZE)
            .and_then(|s| s.checked_sub(header_size))
            .ok_or_else(|| {
                Error::malformed(format!(
                    "signature list size {} smaller than its headers ({} + {})",
                    list_size, SIGNATURE_LIST_HEADER_SIZE, header_size
                ))
            })?;
        if signature_size < GUID_SIZE as u32 {
            return Err(Error::malformed(format!(
                "signature size {} cannot hold an owner GUID",
                signature_size
            )));
        }
        if body_size % signature_size != 0 {
            return Err(Error::malformed(format!(
                "signature list body {} is not a multiple of signature size {}",
                body_size, signature_size
            )));
        }

        let signature_header = reader.read_bytes(header_size as usize)?.to_vec();
        let mut body = reader.sub_reader(body_size as usize)?;
        let count = body_size / signature_size;
        let mut signatures = Vec::with_capacity(count as usize);
        for _ in 0..count {
            signatures.push(SignatureData {
                signature_owner: body.read_guid()?,
                signature_data: body
                    .read_bytes(signature_size as usize - GUID_SIZE)?
                    .to_vec(),
            });
        }
        trace!(
            "signature list {} with {} entries of {} bytes",
            signature_type,
            count,
            signature_size
        );

        Ok(SignatureList {
            signature_type,
            signature_size,
            signature_header,
            signatures,
        })
    }
}

/// Decodes a packed sequence of `EFI_SIGNATURE_LIST`s consuming all of `data`.
pub fn parse_signature_lists(data: &[u8]) -> Result<Vec<SignatureList>> {
    let mut reader = ByteReader::new(data);
    let mut lists = Vec::new();
    while !reader.is_empty() {
        lists.push(SignatureList::parse(&mut reader)?);
    }
    Ok(lists)
}

impl LoadOption {
    pub fn parse(data: &[u8], config: &ParserConfig) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let attributes = reader.read_u32()?;
        let file_path_list_length = reader.read_u16()?;
        Error::check_limit(
            "load option file path length",
            file_path_list_length as u64,
            config.max_device_path_size,
        )?;
        let description = reader.read_ucs2_cstr()?;
        let file_path_list = DevicePath::parse(reader.read_bytes(file_path_list_length as usize)?)?;
        let optional_data = reader.read_rest().to_vec();
        Ok(LoadOption {
            attributes,
            description,
            file_path_list,
            optional_data,
        })
    }

    pub fn is_active(&self) -> bool {
        self.attributes & 0x1 != 0
    }
}

fn parse_boot_order(data: &[u8]) -> Result<Vec<u16>> {
    if data.len() % 2 != 0 {
        return Err(Error::malformed(format!(
            "BootOrder length {} is not a multiple of 2",
            data.len()
        )));
    }
    let mut reader = ByteReader::new(data);
    let mut order = Vec::with_capacity(data.len() / 2);
    while !reader.is_empty() {
        order.push(reader.read_u16()?);
    }
    Ok(order)
}

fn parse_signature_data(data: &[u8]) -> Result<SignatureData> {
    let mut reader = ByteReader::new(data);
    Ok(SignatureData {
        signature_owner: reader.read_guid()?,
        signature_data: reader.read_rest().to_vec(),
    })
}

fn interpret(
    vendor: &Guid,
    name: &str,
    data: &[u8],
    authority: bool,
    config: &ParserConfig,
) -> Result<VariableValue> {
    if data.is_empty() {
        return Ok(VariableValue::Raw);
    }

    let kind = if authority {
        authority_kind(vendor, name)
    } else {
        variable_kind(vendor, name)
    };

    Ok(match kind {
        Some(VariableKind::Boolean) => {
            if data.len() != 1 {
                return Err(Error::malformed(format!(
                    "{} holds {} bytes instead of one boolean",
                    name,
                    data.len()
                )));
            }
            VariableValue::Boolean(data[0] != 0)
        }
        Some(VariableKind::BootOrder) => VariableValue::BootOrder(parse_boot_order(data)?),
        Some(VariableKind::LoadOption) => {
            VariableValue::LoadOption(LoadOption::parse(data, config)?)
        }
        Some(VariableKind::SignatureLists) => {
            VariableValue::SignatureLists(parse_signature_lists(data)?)
        }
        // a bare owner GUID carries no signature
        Some(VariableKind::SignatureData) if data.len() > GUID_SIZE => {
            VariableValue::SignatureData(parse_signature_data(data)?)
        }
        Some(VariableKind::Text) => VariableValue::Text(String::from_utf8_lossy(data).into_owned()),
        Some(VariableKind::SignatureData) | None => VariableValue::Raw,
    })
}

impl UefiVariable {
    pub fn parse(data: &[u8], authority: bool, config: &ParserConfig) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let header = read_variable_header(&mut reader, config)?;
        let unicode_name = crate::codec::ucs2_to_string(header.name);
        let value = interpret(
            &header.variable_name,
            &unicode_name,
            header.data,
            authority,
            config,
        )?;
        Ok(UefiVariable {
            variable_name: header.variable_name,
            unicode_name,
            variable_data: header.data.to_vec(),
            value,
        })
    }
}

fn signature_type_name(guid: &Guid) -> String {
    guid.name()
        .map(str::to_string)
        .unwrap_or_else(|| guid.to_string())
}

impl fmt::Display for SignatureData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "owner {} ({} bytes)",
            self.signature_owner,
            self.signature_data.len()
        )
    }
}

impl fmt::Display for LoadOption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{} {}",
            self.description,
            if self.is_active() { "" } else { " (inactive)" },
            self.file_path_list
        )
    }
}

impl fmt::Display for UefiVariable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.variable_name, self.unicode_name)?;
        match &self.value {
            VariableValue::Boolean(b) => write!(f, " = {}", b),
            VariableValue::BootOrder(order) => {
                let ids: Vec<String> = order.iter().map(|id| format!("Boot{:04X}", id)).collect();
                write!(f, " = [{}]", ids.join(", "))
            }
            VariableValue::LoadOption(option) => write!(f, " = {}", option),
            VariableValue::SignatureLists(lists) => {
                for list in lists {
                    write!(
                        f,
                        "\n    {} x{}",
                        signature_type_name(&list.signature_type),
                        list.signatures.len()
                    )?;
                    for sig in &list.signatures {
                        write!(f, "\n      {}", sig)?;
                    }
                }
                Ok(())
            }
            VariableValue::SignatureData(sig) => write!(f, " = {}", sig),
            VariableValue::Text(text) => write!(f, " = {}", text.trim_end_matches('\0')),
            VariableValue::Raw => {
                if self.variable_data.is_empty() {
                    Ok(())
                } else {
                    write!(f, " = {}", hex::encode(&self.variable_data))
                }
            }
        }
    }
}

/// Variable events; authority events record a single matched signature.
pub struct EvEfiVariableParser {
    pub authority: bool,
}

impl EventParser for EvEfiVariableParser {
    fn parse(&self, data: &[u8], _pcr_index: u32, config: &ParserConfig) -> Result<EventBody> {
        Ok(EventBody::UefiVariable(UefiVariable::parse(
            data,
            self.authority,
            config,
        )?))
    }
}
