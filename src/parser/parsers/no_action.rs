// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::codec::ByteReader;
use crate::config::ParserConfig;
use crate::error::Result;
use crate::guid::serialize_hex;
use crate::header::{
    SpecIdHeader, SpecIdLegacy, SPEC_ID_EVENT00_SIGNATURE, SPEC_ID_EVENT03_SIGNATURE,
    STARTUP_LOCALITY_SIGNATURE,
};
use crate::parser::{EventBody, EventParser};
use core::fmt;
use serde::Serialize;

/// EV_NO_ACTION events are informational and are never extended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoAction {
    SpecId(SpecIdHeader),
    SpecIdLegacy(SpecIdLegacy),
    StartupLocality {
        locality: u8,
    },
    Unknown {
        signature: String,
        #[serde(serialize_with = "serialize_hex")]
        data: Vec<u8>,
    },
}

impl NoAction {
    pub fn startup_locality(&self) -> Option<u8> {
        match self {
            NoAction::StartupLocality { locality } => Some(*locality),
            _ => None,
        }
    }
}

impl fmt::Display for NoAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NoAction::SpecId(spec) => write!(f, "{}", spec),
            NoAction::SpecIdLegacy(spec) => write!(f, "{}", spec),
            NoAction::StartupLocality { locality } => write!(f, "StartupLocality: {}", locality),
            NoAction::Unknown { signature, data } => {
                write!(f, "{:?}: {}", signature, hex::encode(data))
            }
        }
    }
}

/// Recognises the StartupLocality marker: exactly the 16-byte signature and one locality byte.
pub fn parse_startup_locality(data: &[u8]) -> Option<u8> {
    match data.strip_prefix(STARTUP_LOCALITY_SIGNATURE.as_slice()) {
        Some(&[locality]) => Some(locality),
        _ => None,
    }
}

pub struct EvNoActionParser;

impl EventParser for EvNoActionParser {
    fn parse(&self, data: &[u8], _pcr_index: u32, _config: &ParserConfig) -> Result<EventBody> {
        let mut reader = ByteReader::new(data);
        let signature = reader.read_bytes(SPEC_ID_EVENT03_SIGNATURE.len().min(data.len()))?;

        let event = if signature == SPEC_ID_EVENT03_SIGNATURE {
            NoAction::SpecId(SpecIdHeader::parse_after_signature(&mut reader)?)
        } else if signature == SPEC_ID_EVENT00_SIGNATURE {
            NoAction::SpecIdLegacy(SpecIdLegacy::parse_after_signature(&mut reader)?)
        } else if let Some(locality) = parse_startup_locality(data) {
            NoAction::StartupLocality { locality }
        } else {
            let end = signature.iter().position(|&b| b == 0).unwrap_or(signature.len());
            NoAction::Unknown {
                signature: String::from_utf8_lossy(&signature[..end]).into_owned(),
                data: reader.read_rest().to_vec(),
            }
        };
        Ok(EventBody::NoAction(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::HashAlgorithm;
    use crate::header::tests::spec_id_body;

    fn no_action(data: &[u8]) -> NoAction {
        match EvNoActionParser.parse(data, 0, &ParserConfig::default()).unwrap() {
            EventBody::NoAction(event) => event,
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_startup_locality() {
        let mut data = STARTUP_LOCALITY_SIGNATURE.to_vec();
        data.push(3);
        let event = no_action(&data);
        assert_eq!(event.startup_locality(), Some(3));
        assert_eq!(event.to_string(), "StartupLocality: 3");

        assert_eq!(parse_startup_locality(STARTUP_LOCALITY_SIGNATURE), None);
        assert_eq!(parse_startup_locality(b"StartupLocality"), None);
    }

    #[test]
    fn test_startup_locality_with_trailing_bytes() {
        let mut data = STARTUP_LOCALITY_SIGNATURE.to_vec();
        data.extend_from_slice(&[3, 0xde, 0xad]);
        assert_eq!(parse_startup_locality(&data), None);
        assert_eq!(
            no_action(&data),
            NoAction::Unknown {
                signature: "StartupLocality".to_string(),
                data: vec![3, 0xde, 0xad]
            }
        );
    }

    #[test]
    fn test_spec_id_variants() {
        match no_action(&spec_id_body(&[HashAlgorithm::Sha256])) {
            NoAction::SpecId(spec) => {
                assert_eq!(spec.hash_algorithms(), vec![HashAlgorithm::Sha256])
            }
            other => panic!("unexpected event {:?}", other),
        }

        let mut legacy = SPEC_ID_EVENT00_SIGNATURE.to_vec();
        legacy.extend_from_slice(&[0, 0, 0, 0, 2, 1, 2, 1, 0]);
        match no_action(&legacy) {
            NoAction::SpecIdLegacy(spec) => {
                assert_eq!(spec.spec_version_major, 1);
                assert_eq!(spec.spec_version_minor, 2);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_and_short() {
        let mut data = b"SP800-155 Event\0".to_vec();
        data.extend_from_slice(&[1, 2, 3]);
        assert_eq!(
            no_action(&data),
            NoAction::Unknown {
                signature: "SP800-155 Event".to_string(),
                data: vec![1, 2, 3]
            }
        );
        assert!(matches!(no_action(b"abc"), NoAction::Unknown { .. }));
    }
}
