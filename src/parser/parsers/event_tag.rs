// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::codec::ByteReader;
use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::guid::serialize_hex;
use crate::parser::parsers::simple::{guess_buffer, BufferGuess};
use crate::parser::{EventBody, EventParser};
use core::fmt;
use serde::Serialize;

/// `TCG_PCClientTaggedEvent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedEvent {
    pub tagged_event_id: u32,
    #[serde(serialize_with = "serialize_hex")]
    pub tagged_event_data: Vec<u8>,
}

impl fmt::Display for TaggedEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tag 0x{:08x}: ", self.tagged_event_id)?;
        match guess_buffer(&self.tagged_event_data) {
            BufferGuess::Ascii { text } | BufferGuess::Ucs2 { text } => write!(f, "{}", text),
            _ => write!(f, "{}", hex::encode(&self.tagged_event_data)),
        }
    }
}

pub struct EvEventTagParser;

impl EventParser for EvEventTagParser {
    fn parse(&self, data: &[u8], _pcr_index: u32, config: &ParserConfig) -> Result<EventBody> {
        let mut reader = ByteReader::new(data);
        let tagged_event_id = reader.read_u32()?;
        let size = reader.read_u32()?;
        Error::check_limit(
            "tagged event size",
            size as u64,
            config.max_tagged_event_size as u64,
        )?;
        let tagged_event_data = reader.read_bytes(size as usize)?.to_vec();

        Ok(EventBody::Tagged(TaggedEvent {
            tagged_event_id,
            tagged_event_data,
        }))
    }
}
