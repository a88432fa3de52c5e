// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::codec::{ucs2_to_string, ByteReader};
use crate::config::ParserConfig;
use crate::error::Result;
use crate::guid::serialize_hex;
use crate::parser::{EventBody, EventParser};
use core::fmt;
use serde::Serialize;

/// Display-only interpretation of an unstructured body. Digest checks always use the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BufferGuess {
    Ascii { text: String },
    Ucs2 { text: String },
    Separator { value: u32, meaning: SeparatorKind },
    BlobAddress { base: u64, length: u64 },
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparatorKind {
    Normal,
    Bios,
    Error,
    Other,
}

impl SeparatorKind {
    fn classify(value: u32) -> Self {
        match value {
            0x0000_0000 => SeparatorKind::Normal,
            0xFFFF_FFFF => SeparatorKind::Bios,
            0x0000_0001 => SeparatorKind::Error,
            _ => SeparatorKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericBuffer {
    #[serde(serialize_with = "serialize_hex")]
    pub data: Vec<u8>,
    pub guess: BufferGuess,
}

fn is_text_byte(b: u8) -> bool {
    b.is_ascii_graphic() || b == b' ' || b == b'\t' || b == b'\n' || b == b'\r'
}

fn strip_nul_tail(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    &data[..end]
}

fn looks_ascii(data: &[u8]) -> bool {
    let text = strip_nul_tail(data);
    !text.is_empty() && text.iter().all(|&b| is_text_byte(b))
}

fn looks_ucs2(data: &[u8]) -> bool {
    let text = strip_nul_tail(data);
    // a trailing ASCII unit loses its high zero byte to strip_nul_tail
    let len = text.len() + (text.len() % 2);
    if len < 4 || len > data.len() {
        return false;
    }
    data[..len]
        .chunks_exact(2)
        .all(|c| c[1] == 0 && is_text_byte(c[0]))
}

/// Guesses how an opaque body is best shown to a human.
pub fn guess_buffer(data: &[u8]) -> BufferGuess {
    if looks_ucs2(data) {
        BufferGuess::Ucs2 {
            text: ucs2_to_string(data),
        }
    } else if looks_ascii(data) {
        BufferGuess::Ascii {
            text: String::from_utf8_lossy(strip_nul_tail(data)).into_owned(),
        }
    } else {
        BufferGuess::Binary
    }
}

impl fmt::Display for GenericBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.guess {
            BufferGuess::Ascii { text } | BufferGuess::Ucs2 { text } => write!(f, "{}", text),
            BufferGuess::Separator { value, meaning } => {
                write!(f, "separator 0x{:08x} ({:?})", value, meaning)
            }
            BufferGuess::BlobAddress { base, length } => {
                write!(f, "blob base 0x{:x} length 0x{:x}", base, length)
            }
            BufferGuess::Binary => write!(f, "{}", hex::encode(&self.data)),
        }
    }
}

/// Events without fixed structure: the body is kept as is.
pub struct EvSimpleParser;

impl EventParser for EvSimpleParser {
    fn parse(&self, data: &[u8], _pcr_index: u32, _config: &ParserConfig) -> Result<EventBody> {
        Ok(EventBody::GenericBuffer(GenericBuffer {
            data: data.to_vec(),
            guess: guess_buffer(data),
        }))
    }
}

/// EV_SEPARATOR: a four byte value is expected but any size is tolerated.
pub struct EvSeparatorParser;

impl EventParser for EvSeparatorParser {
    fn parse(&self, data: &[u8], _pcr_index: u32, _config: &ParserConfig) -> Result<EventBody> {
        let guess = if data.len() == 4 {
            let value = ByteReader::new(data).read_u32()?;
            BufferGuess::Separator {
                value,
                meaning: SeparatorKind::classify(value),
            }
        } else {
            guess_buffer(data)
        };
        Ok(EventBody::GenericBuffer(GenericBuffer {
            data: data.to_vec(),
            guess,
        }))
    }
}

/// EV_POST_CODE and EV_S_CRTM_CONTENTS: either a label or a `UEFI_PLATFORM_FIRMWARE_BLOB`.
pub struct EvPostCodeParser;

impl EventParser for EvPostCodeParser {
    fn parse(&self, data: &[u8], _pcr_index: u32, _config: &ParserConfig) -> Result<EventBody> {
        let mut guess = guess_buffer(data);
        if guess == BufferGuess::Binary && data.len() == 16 {
            let mut reader = ByteReader::new(data);
            guess = BufferGuess::BlobAddress {
                base: reader.read_u64()?,
                length: reader.read_u64()?,
            };
        }
        Ok(EventBody::GenericBuffer(GenericBuffer {
            data: data.to_vec(),
            guess,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generic(body: EventBody) -> GenericBuffer {
        match body {
            EventBody::GenericBuffer(buffer) => buffer,
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_guess_ascii_and_ucs2() {
        assert_eq!(
            guess_buffer(b"Calling EFI Application from Boot Option"),
            BufferGuess::Ascii {
                text: "Calling EFI Application from Boot Option".to_string()
            }
        );
        assert_eq!(
            guess_buffer(b"ACPI DATA\0"),
            BufferGuess::Ascii {
                text: "ACPI DATA".to_string()
            }
        );
        let ucs2: Vec<u8> = "1.02".encode_utf16().flat_map(|c| c.to_le_bytes()).collect();
        let mut with_nul = ucs2.clone();
        with_nul.extend_from_slice(&[0, 0]);
        for data in [ucs2, with_nul] {
            assert_eq!(
                guess_buffer(&data),
                BufferGuess::Ucs2 {
                    text: "1.02".to_string()
                }
            );
        }
        assert_eq!(guess_buffer(&[0xde, 0xad, 0xbe, 0xef]), BufferGuess::Binary);
        assert_eq!(guess_buffer(&[]), BufferGuess::Binary);
    }

    #[test]
    fn test_separator_classification() {
        let cfg = ParserConfig::default();
        let sep = generic(EvSeparatorParser.parse(&[0xff; 4], 7, &cfg).unwrap());
        assert_eq!(
            sep.guess,
            BufferGuess::Separator {
                value: 0xFFFF_FFFF,
                meaning: SeparatorKind::Bios
            }
        );
        let sep = generic(EvSeparatorParser.parse(&[1, 0, 0, 0], 7, &cfg).unwrap());
        assert_eq!(
            sep.guess,
            BufferGuess::Separator {
                value: 1,
                meaning: SeparatorKind::Error
            }
        );
        assert!(sep.to_string().contains("Error"));
    }

    #[test]
    fn test_post_code_blob() {
        let mut data = 0xFFD0_0000u64.to_le_bytes().to_vec();
        data.extend_from_slice(&0x30_0000u64.to_le_bytes());
        let body = generic(EvPostCodeParser.parse(&data, 0, &ParserConfig::default()).unwrap());
        assert_eq!(
            body.guess,
            BufferGuess::BlobAddress {
                base: 0xFFD0_0000,
                length: 0x30_0000
            }
        );

        let body = generic(
            EvPostCodeParser
                .parse(b"ACPI DATA", 0, &ParserConfig::default())
                .unwrap(),
        );
        assert_eq!(body.to_string(), "ACPI DATA");
    }
}
