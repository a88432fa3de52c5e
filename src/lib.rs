// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Decoder, digest checker and PCR replay engine for TCG/UEFI measured-boot event logs.
//!
//! ```no_run
//! use tcg_eventlog::{read, Eventlog, ParserConfig};
//!
//! let data = read::read_bios_measurements().unwrap();
//! let event_log = Eventlog::parse(&data, &ParserConfig::default()).unwrap();
//! for failure in event_log.hash_failures() {
//!     println!("{}", failure);
//! }
//! println!("{}", event_log.replay().unwrap());
//! ```

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use core::fmt;
use log::{debug, trace, warn};
use serde::Serialize;
use std::convert::TryFrom;

pub mod codec;
pub mod config;
pub mod device_path;
pub mod digest;
pub mod enums;
pub mod error;
pub mod guid;
pub mod header;
pub mod parser;
pub mod read;
pub mod replay;
pub mod verify;

pub use config::{Endian, LogFormat, ParserConfig};
pub use digest::{DigestValue, HashAlgorithm};
pub use error::{Error, Result};
pub use header::SpecIdHeader;
pub use parser::EventBody;
pub use replay::PcrBanks;
pub use verify::HashCheck;

use codec::ByteReader;
use enums::event_type_name;
use guid::serialize_hex;
use header::{
    is_padding, read_agile_record, read_legacy_record, RawRecord, SPEC_ID_EVENT03_SIGNATURE,
};

/// One decoded log entry.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub pcr_index: u32,
    pub event_type: u32,
    pub event_type_name: String,
    pub digests: Vec<DigestValue>,
    #[serde(serialize_with = "serialize_hex")]
    pub event_data: Vec<u8>,
    pub body: EventBody,
    pub hash_check: HashCheck,
}

impl EventRecord {
    fn from_raw(raw: RawRecord, config: &ParserConfig) -> Result<Self> {
        trace!(
            "record PCR {} {} with {} bytes",
            raw.pcr_index,
            event_type_name(raw.event_type),
            raw.body.len()
        );

        let hash_check = if config.verify_digests {
            verify::check(raw.event_type, raw.pcr_index, &raw.digests, raw.body, config)?
        } else {
            HashCheck::Skipped
        };

        let body = match parser::decode(raw.event_type, raw.body, raw.pcr_index, config) {
            Ok(body) => body,
            Err(Error::UnsupportedType(event_type)) if config.skip_unsupported => {
                warn!("keeping {} body opaque", event_type_name(event_type));
                EventBody::Unsupported {
                    data: raw.body.to_vec(),
                }
            }
            Err(e) => return Err(e),
        };

        Ok(EventRecord {
            pcr_index: raw.pcr_index,
            event_type: raw.event_type,
            event_type_name: event_type_name(raw.event_type),
            digests: raw.digests,
            event_data: raw.body.to_vec(),
            body,
            hash_check,
        })
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Event Entry:")?;
        writeln!(f, "\tPCR: {}", self.pcr_index)?;
        writeln!(f, "\tEvent Type id: 0x{:08X}", self.event_type)?;
        writeln!(f, "\tEvent Type: {}", self.event_type_name)?;
        for digest in &self.digests {
            writeln!(f, "\tDigest Algorithm: {}", digest.algorithm)?;
            writeln!(f, "\tDigest: {}", digest.to_hex())?;
        }
        writeln!(f, "\tEvent Desc: {}", self.body)?;
        writeln!(f, "\tHash Check: {}", self.hash_check)
    }
}

/// Streams records out of a log held in memory.
///
/// Header level failures end the stream since record framing is lost. A body that fails to
/// decode only fails its own record.
pub struct EventlogIter<'a> {
    reader: ByteReader<'a>,
    config: &'a ParserConfig,
    format: LogFormat,
    byte_order: Endian,
    spec_id: Option<SpecIdHeader>,
    first: Option<RawRecord<'a>>,
    fused: bool,
}

impl<'a> EventlogIter<'a> {
    /// Reads the first record and settles the log format.
    pub fn new(data: &'a [u8], config: &'a ParserConfig) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let mut iter = EventlogIter {
            reader: reader.clone(),
            config,
            format: LogFormat::Legacy,
            byte_order: Endian::Little,
            spec_id: None,
            first: None,
            fused: true,
        };

        if data.is_empty() || (config.stop_at_padding && is_padding(data)) {
            if config.format == LogFormat::CryptoAgile {
                return Err(Error::InvalidSpecId("log has no Spec ID event".to_string()));
            }
            return Ok(iter);
        }

        let agile = match config.format {
            LogFormat::Legacy => false,
            LogFormat::CryptoAgile => true,
            LogFormat::Auto => {
                let mut probe = reader.clone();
                matches!(
                    read_legacy_record::<LittleEndian>(&mut probe, config),
                    Ok(first) if first.body.starts_with(SPEC_ID_EVENT03_SIGNATURE)
                )
            }
        };

        let first = if agile {
            let first = read_legacy_record::<LittleEndian>(&mut reader, config)?;
            iter.spec_id = Some(SpecIdHeader::parse(first.body)?);
            iter.format = LogFormat::CryptoAgile;
            first
        } else {
            iter.byte_order = legacy_byte_order(data, config);
            match iter.byte_order {
                Endian::Big => read_legacy_record::<BigEndian>(&mut reader, config)?,
                _ => read_legacy_record::<LittleEndian>(&mut reader, config)?,
            }
        };
        debug!(
            "event log format {:?} ({:?}), spec id {:?}",
            iter.format, iter.byte_order, iter.spec_id
        );

        iter.reader = reader;
        iter.first = Some(first);
        iter.fused = false;
        Ok(iter)
    }

    /// Either `Legacy` or `CryptoAgile`, never `Auto`.
    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn spec_id(&self) -> Option<&SpecIdHeader> {
        self.spec_id.as_ref()
    }

    fn read_raw(&mut self) -> Result<RawRecord<'a>> {
        let (reader, config) = (&mut self.reader, self.config);
        match (&self.spec_id, self.byte_order) {
            (Some(spec_id), _) => read_agile_record::<LittleEndian>(reader, spec_id, config),
            (None, Endian::Big) => read_legacy_record::<BigEndian>(reader, config),
            (None, _) => read_legacy_record::<LittleEndian>(reader, config),
        }
    }
}

/// Settles the byte order of a legacy log. `Auto` prefers big-endian and falls back to
/// little-endian when the records do not frame that way.
fn legacy_byte_order(data: &[u8], config: &ParserConfig) -> Endian {
    match config.legacy_byte_order {
        Endian::Auto if frames_cleanly::<BigEndian>(data, config) => Endian::Big,
        Endian::Auto => Endian::Little,
        forced => forced,
    }
}

/// True when `data` splits into whole legacy records, trailing padding aside.
fn frames_cleanly<E: ByteOrder>(data: &[u8], config: &ParserConfig) -> bool {
    let mut reader = ByteReader::new(data);
    while !reader.is_empty() {
        if config.stop_at_padding && is_padding(reader.peek_rest()) {
            break;
        }
        if read_legacy_record::<E>(&mut reader, config).is_err() {
            return false;
        }
    }
    true
}

impl<'a> Iterator for EventlogIter<'a> {
    type Item = Result<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }

        let raw = match self.first.take() {
            Some(raw) => raw,
            None => {
                if self.reader.is_empty() {
                    self.fused = true;
                    return None;
                }
                if self.config.stop_at_padding && is_padding(self.reader.peek_rest()) {
                    debug!(
                        "log ends in {} bytes of padding at offset {}",
                        self.reader.remaining(),
                        self.reader.position()
                    );
                    self.fused = true;
                    return None;
                }
                match self.read_raw() {
                    Ok(raw) => raw,
                    Err(e) => {
                        self.fused = true;
                        return Some(Err(e));
                    }
                }
            }
        };

        Some(EventRecord::from_raw(raw, self.config))
    }
}

/// A fully decoded event log.
#[derive(Debug, Clone, Serialize)]
pub struct Eventlog {
    pub format: LogFormat,
    pub spec_id: Option<SpecIdHeader>,
    pub log: Vec<EventRecord>,
}

impl Eventlog {
    /// Decodes every record, failing on the first record that cannot be decoded.
    pub fn parse(data: &[u8], config: &ParserConfig) -> Result<Self> {
        let mut iter = EventlogIter::new(data, config)?;
        let format = iter.format();
        let spec_id = iter.spec_id().cloned();
        let log = iter.by_ref().collect::<Result<Vec<_>>>()?;
        Ok(Eventlog {
            format,
            spec_id,
            log,
        })
    }

    /// Banks replayed for every algorithm in the log, SHA-1 only for legacy logs.
    pub fn hash_algorithms(&self) -> Vec<HashAlgorithm> {
        match &self.spec_id {
            Some(spec_id) => spec_id.hash_algorithms(),
            None => vec![HashAlgorithm::Sha1],
        }
    }

    /// Replays every record's claimed digests into zeroed PCR banks.
    pub fn replay(&self) -> Result<PcrBanks> {
        let mut banks = PcrBanks::new(&self.hash_algorithms());
        for record in &self.log {
            banks.apply(
                record.pcr_index,
                record.event_type,
                &record.digests,
                &record.event_data,
            )?;
        }
        Ok(banks)
    }

    /// Every per-algorithm digest mismatch in the log.
    pub fn hash_failures(&self) -> Vec<Error> {
        self.log
            .iter()
            .flat_map(|record| record.hash_check.mismatches(record.pcr_index))
            .collect()
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl fmt::Display for Eventlog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.spec_id {
            Some(spec_id) => writeln!(f, "{}", spec_id)?,
            None => writeln!(f, "Legacy SHA-1 event log")?,
        }
        for record in &self.log {
            writeln!(f)?;
            write!(f, "{}", record)?;
        }
        Ok(())
    }
}

impl TryFrom<&[u8]> for Eventlog {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Self> {
        Eventlog::parse(data, &ParserConfig::default())
    }
}

impl TryFrom<Vec<u8>> for Eventlog {
    type Error = Error;

    fn try_from(data: Vec<u8>) -> Result<Self> {
        Eventlog::parse(&data, &ParserConfig::default())
    }
}
