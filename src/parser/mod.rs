// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

pub mod parsers;
use crate::config::ParserConfig;
use crate::enums::*;
use crate::error::{Error, Result};
use crate::guid::serialize_hex;
use core::fmt;
use lazy_static::lazy_static;
use parsers::*;
use serde::Serialize;
use std::collections::HashMap;

/// Decodes one event body. Implementations never read past `data`.
pub trait EventParser: Sync + Send {
    fn parse(&self, data: &[u8], pcr_index: u32, config: &ParserConfig) -> Result<EventBody>;
}

/// A decoded event body, one variant per body layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum EventBody {
    NoAction(NoAction),
    GenericBuffer(GenericBuffer),
    Tagged(TaggedEvent),
    UefiVariable(UefiVariable),
    ImageLoad(ImageLoad),
    Gpt(GptEvent),
    FirmwareBlob(FirmwareBlob),
    FirmwareBlob2(FirmwareBlob2),
    HandoffTables(HandoffTables),
    HandoffTables2(HandoffTables),
    /// Kept opaque because the type has no decoder.
    Unsupported {
        #[serde(serialize_with = "serialize_hex")]
        data: Vec<u8>,
    },
}

impl fmt::Display for EventBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventBody::NoAction(e) => write!(f, "{}", e),
            EventBody::GenericBuffer(e) => write!(f, "{}", e),
            EventBody::Tagged(e) => write!(f, "{}", e),
            EventBody::UefiVariable(e) => write!(f, "{}", e),
            EventBody::ImageLoad(e) => write!(f, "{}", e),
            EventBody::Gpt(e) => write!(f, "{}", e),
            EventBody::FirmwareBlob(e) => write!(f, "{}", e),
            EventBody::FirmwareBlob2(e) => write!(f, "{}", e),
            EventBody::HandoffTables(e) | EventBody::HandoffTables2(e) => write!(f, "{}", e),
            EventBody::Unsupported { data } => write!(f, "{}", hex::encode(data)),
        }
    }
}

lazy_static! {
    pub static ref PARSER_MAP: HashMap<u32, Box<dyn EventParser>> = {
        let mut map: HashMap<u32, Box<dyn EventParser>> = HashMap::new();

        map.insert(EV_NO_ACTION, Box::new(EvNoActionParser));
        map.insert(EV_EVENT_TAG, Box::new(EvEventTagParser));
        map.insert(EV_SEPARATOR, Box::new(EvSeparatorParser));

        for tag in [EV_POST_CODE, EV_S_CRTM_CONTENTS] {
            map.insert(tag, Box::new(EvPostCodeParser));
        }

        for tag in [
            EV_EFI_VARIABLE_DRIVER_CONFIG,
            EV_EFI_VARIABLE_BOOT,
            EV_EFI_VARIABLE_BOOT2,
            EV_EFI_SPDM_DEVICE_POLICY,
        ] {
            map.insert(tag, Box::new(EvEfiVariableParser { authority: false }));
        }
        for tag in [EV_EFI_VARIABLE_AUTHORITY, EV_EFI_SPDM_DEVICE_AUTHORITY] {
            map.insert(tag, Box::new(EvEfiVariableParser { authority: true }));
        }

        for tag in [
            EV_EFI_BOOT_SERVICES_APPLICATION,
            EV_EFI_BOOT_SERVICES_DRIVER,
            EV_EFI_RUNTIME_SERVICES_DRIVER,
        ] {
            map.insert(tag, Box::new(EvBootServicesAppParser));
        }

        for tag in [EV_EFI_GPT_EVENT, EV_EFI_GPT_EVENT2] {
            map.insert(tag, Box::new(EvGptParser));
        }

        map.insert(EV_EFI_PLATFORM_FIRMWARE_BLOB, Box::new(EvFirmwareBlobParser));
        map.insert(EV_EFI_PLATFORM_FIRMWARE_BLOB2, Box::new(EvFirmwareBlob2Parser));
        map.insert(
            EV_EFI_HANDOFF_TABLES,
            Box::new(EvHandoffTableParser { with_description: false }),
        );
        map.insert(
            EV_EFI_HANDOFF_TABLES2,
            Box::new(EvHandoffTableParser { with_description: true }),
        );

        for tag in [
            EV_PREBOOT_CERT,
            EV_ACTION,
            EV_S_CRTM_VERSION,
            EV_CPU_MICROCODE,
            EV_PLATFORM_CONFIG_FLAGS,
            EV_TABLE_OF_DEVICES,
            EV_COMPACT_HASH,
            EV_IPL,
            EV_IPL_PARTITION_DATA,
            EV_NONHOST_CODE,
            EV_NONHOST_CONFIG,
            EV_NONHOST_INFO,
            EV_OMIT_BOOT_DEVICE_EVENTS,
            EV_POST_CODE2,
            EV_EFI_ACTION,
            EV_EFI_HCRTM_EVENT,
            EV_EFI_SPDM_FIRMWARE_BLOB,
            EV_EFI_SPDM_FIRMWARE_CONFIG,
        ] {
            map.insert(tag, Box::new(EvSimpleParser));
        }

        map
    };
}

pub fn is_supported(event_type: u32) -> bool {
    PARSER_MAP.contains_key(&event_type)
}

/// Decodes `data` with the parser registered for `event_type`.
///
/// Unknown types are reported as [`Error::UnsupportedType`] so the caller can keep the record
/// opaque; a known type with inconsistent lengths fails with the decoder's error.
pub fn decode(
    event_type: u32,
    data: &[u8],
    pcr_index: u32,
    config: &ParserConfig,
) -> Result<EventBody> {
    match PARSER_MAP.get(&event_type) {
        Some(parser) => parser.parse(data, pcr_index, config),
        None => Err(Error::UnsupportedType(event_type)),
    }
}
