// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::codec::ByteReader;
use crate::config::ParserConfig;
use crate::device_path::DevicePath;
use crate::error::{Error, Result};
use crate::parser::{EventBody, EventParser};
use core::fmt;
use log::debug;
use serde::Serialize;

/// `UEFI_IMAGE_LOAD_EVENT`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageLoad {
    pub image_location_in_memory: u64,
    pub image_length_in_memory: u64,
    pub image_link_time_address: u64,
    pub length_of_device_path: u64,
    pub device_path: DevicePath,
}

impl fmt::Display for ImageLoad {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "image at 0x{:x} length 0x{:x}: {}",
            self.image_location_in_memory, self.image_length_in_memory, self.device_path
        )
    }
}

/// Boot services application/driver and runtime services driver loads.
pub struct EvBootServicesAppParser;

impl EventParser for EvBootServicesAppParser {
    fn parse(&self, data: &[u8], _pcr_index: u32, config: &ParserConfig) -> Result<EventBody> {
        let mut reader = ByteReader::new(data);
        let image_location_in_memory = reader.read_u64()?;
        let image_length_in_memory = reader.read_u64()?;
        let image_link_time_address = reader.read_u64()?;
        let length_of_device_path = reader.read_u64()?;
        Error::check_limit(
            "device path length",
            length_of_device_path,
            config.max_device_path_size,
        )?;

        let device_path = DevicePath::parse(reader.read_bytes(length_of_device_path as usize)?)?;
        if !reader.is_empty() {
            debug!("image load event has {} bytes after its device path", reader.remaining());
        }

        Ok(EventBody::ImageLoad(ImageLoad {
            image_location_in_memory,
            image_length_in_memory,
            image_link_time_address,
            length_of_device_path,
            device_path,
        }))
    }
}
