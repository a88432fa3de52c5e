// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Record envelopes: the legacy `TCG_PCR_EVENT` (single SHA-1 digest) and the crypto-agile
//! `TCG_PCR_EVENT2` (one digest per algorithm declared by the Spec ID event).
//! Spec: https://trustedcomputinggroup.org/resource/pc-client-specific-platform-firmware-profile-specification/

use crate::codec::ByteReader;
use crate::config::ParserConfig;
use crate::digest::{DigestValue, HashAlgorithm, SHA1_DIGEST_SIZE};
use crate::error::{Error, Result};
use crate::guid::serialize_hex;
use byteorder::ByteOrder;
use core::fmt;
use log::debug;
use serde::Serialize;

pub const SPEC_ID_EVENT03_SIGNATURE: &[u8; 16] = b"Spec ID Event03\0";
pub const SPEC_ID_EVENT00_SIGNATURE: &[u8; 16] = b"Spec ID Event00\0";
pub const STARTUP_LOCALITY_SIGNATURE: &[u8; 16] = b"StartupLocality\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlgorithmSize {
    pub algorithm: HashAlgorithm,
    pub digest_size: u16,
}

/// `TCG_EfiSpecIDEvent`: declares the digest algorithms every later record carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecIdHeader {
    pub platform_class: u32,
    pub spec_version_minor: u8,
    pub spec_version_major: u8,
    pub spec_errata: u8,
    pub uintn_size: u8,
    pub algorithms: Vec<AlgorithmSize>,
    #[serde(serialize_with = "serialize_hex")]
    pub vendor_info: Vec<u8>,
}

impl SpecIdHeader {
    /// Decodes a full Spec ID Event03 body, signature included.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let rest = body.strip_prefix(SPEC_ID_EVENT03_SIGNATURE.as_slice()).ok_or_else(|| {
            let end = body.len().min(SPEC_ID_EVENT03_SIGNATURE.len());
            Error::InvalidSpecId(format!(
                "unexpected signature {:?}",
                String::from_utf8_lossy(&body[..end])
            ))
        })?;
        Self::parse_after_signature(&mut ByteReader::new(rest))
    }

    pub(crate) fn parse_after_signature(reader: &mut ByteReader) -> Result<Self> {
        let platform_class = reader.read_u32()?;
        let spec_version_minor = reader.read_u8()?;
        let spec_version_major = reader.read_u8()?;
        let spec_errata = reader.read_u8()?;
        let uintn_size = reader.read_u8()?;

        let number_of_algorithms = reader.read_u32()? as usize;
        if number_of_algorithms == 0 {
            return Err(Error::InvalidSpecId("no digest algorithms declared".to_string()));
        }
        // each entry is {u16 algorithm id, u16 digest size}
        let needed = number_of_algorithms.saturating_mul(4);
        if needed > reader.remaining() {
            return Err(Error::InsufficientBuffer {
                needed,
                remaining: reader.remaining(),
            });
        }

        let mut algorithms: Vec<AlgorithmSize> = Vec::with_capacity(number_of_algorithms);
        for _ in 0..number_of_algorithms {
            let algorithm_id = reader.read_u16()?;
            let digest_size = reader.read_u16()?;
            let algorithm = HashAlgorithm::from_tcg_id(algorithm_id)
                .ok_or(Error::UnsupportedAlgorithm(algorithm_id))?;
            if digest_size as usize != algorithm.digest_length() {
                return Err(Error::InvalidSpecId(format!(
                    "{} declared with digest size {}",
                    algorithm, digest_size
                )));
            }
            if algorithms.iter().any(|a| a.algorithm == algorithm) {
                return Err(Error::InvalidSpecId(format!("{} declared twice", algorithm)));
            }
            algorithms.push(AlgorithmSize {
                algorithm,
                digest_size,
            });
        }

        let vendor_info_size = reader.read_u8()?;
        let vendor_info = reader.read_bytes(vendor_info_size as usize)?.to_vec();
        if !reader.is_empty() {
            debug!("Spec ID event carries {} trailing bytes", reader.remaining());
        }

        Ok(Self {
            platform_class,
            spec_version_minor,
            spec_version_major,
            spec_errata,
            uintn_size,
            algorithms,
            vendor_info,
        })
    }

    pub fn declares(&self, algorithm: HashAlgorithm) -> bool {
        self.algorithms.iter().any(|a| a.algorithm == algorithm)
    }

    pub fn hash_algorithms(&self) -> Vec<HashAlgorithm> {
        self.algorithms.iter().map(|a| a.algorithm).collect()
    }
}

impl fmt::Display for SpecIdHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let algs: Vec<String> = self
            .algorithms
            .iter()
            .map(|a| format!("{}({})", a.algorithm, a.digest_size))
            .collect();
        write!(
            f,
            "Spec ID Event03: platform class {}, version {}.{} errata {}, uintn size {}, algorithms [{}]",
            self.platform_class,
            self.spec_version_major,
            self.spec_version_minor,
            self.spec_errata,
            self.uintn_size,
            algs.join(", ")
        )?;
        if !self.vendor_info.is_empty() {
            write!(f, ", vendor info {}", hex::encode(&self.vendor_info))?;
        }
        Ok(())
    }
}

/// `TCG_EfiSpecIdEventStruct` of the TCG 1.2 EFI platform specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecIdLegacy {
    pub platform_class: u32,
    pub spec_version_minor: u8,
    pub spec_version_major: u8,
    pub spec_errata: u8,
    pub uintn_size: u8,
    #[serde(serialize_with = "serialize_hex")]
    pub vendor_info: Vec<u8>,
}

impl SpecIdLegacy {
    pub(crate) fn parse_after_signature(reader: &mut ByteReader) -> Result<Self> {
        let platform_class = reader.read_u32()?;
        let spec_version_minor = reader.read_u8()?;
        let spec_version_major = reader.read_u8()?;
        let spec_errata = reader.read_u8()?;
        let uintn_size = reader.read_u8()?;
        let vendor_info_size = reader.read_u8()?;
        let vendor_info = reader.read_bytes(vendor_info_size as usize)?.to_vec();
        Ok(Self {
            platform_class,
            spec_version_minor,
            spec_version_major,
            spec_errata,
            uintn_size,
            vendor_info,
        })
    }
}

impl fmt::Display for SpecIdLegacy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Spec ID Event00: platform class {}, version {}.{} errata {}, uintn size {}",
            self.platform_class,
            self.spec_version_major,
            self.spec_version_minor,
            self.spec_errata,
            self.uintn_size
        )
    }
}

/// One record envelope with its body still undecoded.
#[derive(Debug, Clone)]
pub struct RawRecord<'a> {
    pub pcr_index: u32,
    pub event_type: u32,
    pub digests: Vec<DigestValue>,
    pub body: &'a [u8],
}

fn read_body<'a, E: ByteOrder>(
    reader: &mut ByteReader<'a>,
    config: &ParserConfig,
) -> Result<&'a [u8]> {
    let event_size = reader.read_u32_with::<E>()?;
    Error::check_limit(
        "event size",
        event_size as u64,
        config.max_event_size as u64,
    )?;
    reader.read_bytes(event_size as usize)
}

/// Reads a `TCG_PCR_EVENT`: PCR index, type, one SHA-1 digest, sized body.
pub fn read_legacy_record<'a, E: ByteOrder>(
    reader: &mut ByteReader<'a>,
    config: &ParserConfig,
) -> Result<RawRecord<'a>> {
    let pcr_index = reader.read_u32_with::<E>()?;
    let event_type = reader.read_u32_with::<E>()?;
    let digest = reader.read_bytes(SHA1_DIGEST_SIZE)?.to_vec();
    let body = read_body::<E>(reader, config)?;

    Ok(RawRecord {
        pcr_index,
        event_type,
        digests: vec![DigestValue::new(HashAlgorithm::Sha1, digest)?],
        body,
    })
}

/// Reads a `TCG_PCR_EVENT2`, validating every digest against the Spec ID declaration.
pub fn read_agile_record<'a, E: ByteOrder>(
    reader: &mut ByteReader<'a>,
    spec_id: &SpecIdHeader,
    config: &ParserConfig,
) -> Result<RawRecord<'a>> {
    let pcr_index = reader.read_u32_with::<E>()?;
    let event_type = reader.read_u32_with::<E>()?;

    let digest_count = reader.read_u32_with::<E>()? as usize;
    if digest_count == 0 || digest_count > spec_id.algorithms.len() {
        return Err(Error::malformed(format!(
            "digest count {} outside 1..={} declared algorithms",
            digest_count,
            spec_id.algorithms.len()
        )));
    }

    let mut digests: Vec<DigestValue> = Vec::with_capacity(digest_count);
    for _ in 0..digest_count {
        let algorithm_id = reader.read_u16_with::<E>()?;
        let declared = spec_id
            .algorithms
            .iter()
            .find(|a| a.algorithm.tcg_id() == algorithm_id)
            .ok_or(Error::UnsupportedAlgorithm(algorithm_id))?;
        if digests.iter().any(|d| d.algorithm == declared.algorithm) {
            return Err(Error::malformed(format!(
                "{} digest appears twice in one record",
                declared.algorithm
            )));
        }
        let digest = reader.read_bytes(declared.digest_size as usize)?.to_vec();
        digests.push(DigestValue::new(declared.algorithm, digest)?);
    }

    let body = read_body::<E>(reader, config)?;

    Ok(RawRecord {
        pcr_index,
        event_type,
        digests,
        body,
    })
}

/// Pre-allocated firmware log areas are padded with all-ones or all-zero bytes. Only a tail made
/// up entirely of one fill byte counts: a PCR 0 `EV_PREBOOT_CERT` record also opens with eight
/// zero bytes.
pub fn is_padding(rest: &[u8]) -> bool {
    match rest.first() {
        Some(&fill) if rest.len() >= 8 && (fill == 0 || fill == 0xff) => {
            rest.iter().all(|&b| b == fill)
        }
        _ => false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::codec::ByteWriter;
    use byteorder::{BigEndian, LittleEndian};

    pub(crate) fn spec_id_body(algs: &[HashAlgorithm]) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.put_bytes(SPEC_ID_EVENT03_SIGNATURE)
            .put_u32(0)
            .put_u8(0)
            .put_u8(2)
            .put_u8(0)
            .put_u8(2)
            .put_u32(algs.len() as u32);
        for alg in algs {
            w.put_u16(alg.tcg_id()).put_u16(alg.digest_length() as u16);
        }
        w.put_u8(0);
        w.into_vec()
    }

    #[test]
    fn test_spec_id_roundtrip_fields() {
        let body = spec_id_body(&[HashAlgorithm::Sha1, HashAlgorithm::Sha256]);
        let spec = SpecIdHeader::parse(&body).unwrap();
        assert_eq!(spec.spec_version_major, 2);
        assert_eq!(spec.uintn_size, 2);
        assert_eq!(
            spec.hash_algorithms(),
            vec![HashAlgorithm::Sha1, HashAlgorithm::Sha256]
        );
        assert!(spec.vendor_info.is_empty());
    }

    #[test]
    fn test_spec_id_rejects_bad_declarations() {
        assert!(matches!(
            SpecIdHeader::parse(&spec_id_body(&[])),
            Err(Error::InvalidSpecId(_))
        ));
        assert!(matches!(
            SpecIdHeader::parse(&spec_id_body(&[HashAlgorithm::Sha256, HashAlgorithm::Sha256])),
            Err(Error::InvalidSpecId(_))
        ));

        let mut body = spec_id_body(&[HashAlgorithm::Sha256]);
        // digest size field of the only entry
        body[30] = 20;
        assert!(matches!(
            SpecIdHeader::parse(&body),
            Err(Error::InvalidSpecId(_))
        ));

        let mut body = spec_id_body(&[HashAlgorithm::Sha256]);
        body[28] = 0x99;
        assert!(matches!(
            SpecIdHeader::parse(&body),
            Err(Error::UnsupportedAlgorithm(0x99))
        ));
    }

    #[test]
    fn test_spec_id_huge_algorithm_count() {
        let mut body = spec_id_body(&[HashAlgorithm::Sha256]);
        body[24..28].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            SpecIdHeader::parse(&body),
            Err(Error::InsufficientBuffer { .. })
        ));
    }

    #[test]
    fn test_legacy_record_both_byte_orders() {
        let mut w = ByteWriter::new();
        w.put_u32_with::<BigEndian>(7)
            .put_u32_with::<BigEndian>(4)
            .put_bytes(&[0xAB; 20])
            .put_u32_with::<BigEndian>(4)
            .put_bytes(&[0xff; 4]);
        let data = w.into_vec();
        let cfg = ParserConfig::default();

        let rec = read_legacy_record::<BigEndian>(&mut ByteReader::new(&data), &cfg).unwrap();
        assert_eq!(rec.pcr_index, 7);
        assert_eq!(rec.event_type, 4);
        assert_eq!(rec.body, &[0xff; 4]);
        assert_eq!(rec.digests[0].algorithm, HashAlgorithm::Sha1);

        // read as little-endian the size field is 0x04000000 bytes
        assert!(read_legacy_record::<LittleEndian>(&mut ByteReader::new(&data), &cfg).is_err());
    }

    #[test]
    fn test_agile_digest_count_bounds() {
        let spec = SpecIdHeader::parse(&spec_id_body(&[HashAlgorithm::Sha256])).unwrap();
        let cfg = ParserConfig::default();
        for count in [0u32, 2] {
            let mut w = ByteWriter::new();
            w.put_u32(0).put_u32(4).put_u32(count);
            let data = w.into_vec();
            assert!(matches!(
                read_agile_record::<LittleEndian>(&mut ByteReader::new(&data), &spec, &cfg),
                Err(Error::MalformedLength(_))
            ));
        }
    }

    #[test]
    fn test_agile_undeclared_algorithm() {
        let spec = SpecIdHeader::parse(&spec_id_body(&[HashAlgorithm::Sha256])).unwrap();
        let mut w = ByteWriter::new();
        w.put_u32(0)
            .put_u32(4)
            .put_u32(1)
            .put_u16(HashAlgorithm::Sha1.tcg_id())
            .put_bytes(&[0; 20]);
        let data = w.into_vec();
        assert!(matches!(
            read_agile_record::<LittleEndian>(
                &mut ByteReader::new(&data),
                &spec,
                &ParserConfig::default()
            ),
            Err(Error::UnsupportedAlgorithm(0x4))
        ));
    }

    #[test]
    fn test_event_size_limits() {
        let spec = SpecIdHeader::parse(&spec_id_body(&[HashAlgorithm::Sha256])).unwrap();
        let mut w = ByteWriter::new();
        w.put_u32(0)
            .put_u32(4)
            .put_u32(1)
            .put_u16(HashAlgorithm::Sha256.tcg_id())
            .put_bytes(&[0; 32])
            .put_u32(0xFFFF_FFF0);
        let data = w.into_vec();
        assert!(matches!(
            read_agile_record::<LittleEndian>(
                &mut ByteReader::new(&data),
                &spec,
                &ParserConfig::default()
            ),
            Err(Error::AllocationLimitExceeded { .. })
        ));

        let mut w = ByteWriter::new();
        w.put_u32(0)
            .put_u32(4)
            .put_u32(1)
            .put_u16(HashAlgorithm::Sha256.tcg_id())
            .put_bytes(&[0; 32])
            .put_u32(8)
            .put_bytes(&[0; 4]);
        let data = w.into_vec();
        assert!(matches!(
            read_agile_record::<LittleEndian>(
                &mut ByteReader::new(&data),
                &spec,
                &ParserConfig::default()
            ),
            Err(Error::InsufficientBuffer { .. })
        ));
    }

    #[test]
    fn test_padding_detection() {
        assert!(is_padding(&[0xff; 12]));
        assert!(is_padding(&[0; 8]));
        assert!(!is_padding(&[0xff; 7]));
        assert!(!is_padding(&[0, 0, 0, 0, 4, 0, 0, 0]));

        // PCR 0, EV_PREBOOT_CERT, then a digest
        let mut record = vec![0u8; 8];
        record.extend_from_slice(&[0xab; 20]);
        assert!(!is_padding(&record));
        assert!(!is_padding(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0]));
    }
}
