// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::digest::{DigestValue, HashAlgorithm};
use crate::enums::EV_NO_ACTION;
use crate::error::{Error, Result};
use crate::parser::parsers::no_action::parse_startup_locality;
use core::fmt;
use log::debug;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

pub const PCR_COUNT: usize = 24;

/// Simulated PCR banks, one per hash algorithm, all registers zero at start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcrBanks {
    banks: BTreeMap<HashAlgorithm, Vec<Vec<u8>>>,
}

impl PcrBanks {
    pub fn new(algorithms: &[HashAlgorithm]) -> Self {
        let banks = algorithms
            .iter()
            .map(|alg| (*alg, vec![vec![0u8; alg.digest_length()]; PCR_COUNT]))
            .collect();
        Self { banks }
    }

    pub fn algorithms(&self) -> impl Iterator<Item = HashAlgorithm> + '_ {
        self.banks.keys().copied()
    }

    pub fn get(&self, algorithm: HashAlgorithm, index: u32) -> Option<&[u8]> {
        self.banks
            .get(&algorithm)
            .and_then(|bank| bank.get(index as usize))
            .map(Vec::as_slice)
    }

    /// `pcr = H(pcr || digest)` in the digest's own bank.
    pub fn extend(&mut self, index: u32, digest: &DigestValue) -> Result<()> {
        let algorithm = digest.algorithm;
        let bank = self
            .banks
            .get_mut(&algorithm)
            .ok_or(Error::UnsupportedAlgorithm(algorithm.tcg_id()))?;
        let register = bank
            .get_mut(index as usize)
            .ok_or(Error::PcrIndexOutOfRange(index))?;
        *register = algorithm.hash([register.as_slice(), digest.as_bytes()]);
        Ok(())
    }

    /// Seeds PCR 0 of every bank with the startup locality in its last byte.
    pub fn set_locality(&mut self, locality: u8) {
        for bank in self.banks.values_mut() {
            if let Some(last) = bank.first_mut().and_then(|pcr0| pcr0.last_mut()) {
                *last = locality;
            }
        }
    }

    /// Applies one record: extends every claimed digest, except for EV_NO_ACTION which only
    /// ever seeds the startup locality.
    pub fn apply(
        &mut self,
        pcr_index: u32,
        event_type: u32,
        digests: &[DigestValue],
        body: &[u8],
    ) -> Result<()> {
        if pcr_index as usize >= PCR_COUNT {
            return Err(Error::PcrIndexOutOfRange(pcr_index));
        }
        if event_type == EV_NO_ACTION {
            if pcr_index == 0 {
                if let Some(locality) = parse_startup_locality(body) {
                    debug!("seeding PCR 0 with startup locality {}", locality);
                    self.set_locality(locality);
                }
            }
            return Ok(());
        }
        for digest in digests {
            if self.banks.contains_key(&digest.algorithm) {
                self.extend(pcr_index, digest)?;
            }
        }
        Ok(())
    }

    /// Lists the registers whose replayed value differs from `expected`, e.g. values read off
    /// a TPM. Registers missing from either side are not compared.
    pub fn mismatches(
        &self,
        expected: &BTreeMap<HashAlgorithm, BTreeMap<u32, Vec<u8>>>,
    ) -> Vec<(HashAlgorithm, u32)> {
        let mut diff = Vec::new();
        for (alg, registers) in expected {
            for (index, value) in registers {
                if let Some(replayed) = self.get(*alg, *index) {
                    if replayed != value.as_slice() {
                        diff.push((*alg, *index));
                    }
                }
            }
        }
        diff
    }
}

impl Serialize for PcrBanks {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let hex_banks: BTreeMap<String, Vec<String>> = self
            .banks
            .iter()
            .map(|(alg, bank)| (alg.to_string(), bank.iter().map(hex::encode).collect()))
            .collect();
        hex_banks.serialize(serializer)
    }
}

impl fmt::Display for PcrBanks {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (alg, bank) in &self.banks {
            writeln!(f, "{}:", alg)?;
            for (index, value) in bank.iter().enumerate() {
                writeln!(f, "  {:2}: {}", index, hex::encode(value))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{EV_EFI_ACTION, EV_SEPARATOR};
    use crate::header::STARTUP_LOCALITY_SIGNATURE;

    fn sha256(data: &[u8]) -> DigestValue {
        DigestValue::compute(HashAlgorithm::Sha256, [data])
    }

    #[test]
    fn test_extend_separator() {
        let mut banks = PcrBanks::new(&[HashAlgorithm::Sha256]);
        let digest = sha256(&[0xff; 4]);
        banks.apply(7, EV_SEPARATOR, &[digest.clone()], &[0xff; 4]).unwrap();

        let expected = HashAlgorithm::Sha256.hash([[0u8; 32].as_slice(), digest.as_bytes()]);
        assert_eq!(banks.get(HashAlgorithm::Sha256, 7), Some(expected.as_slice()));
        assert_eq!(banks.get(HashAlgorithm::Sha256, 6), Some([0u8; 32].as_slice()));
    }

    #[test]
    fn test_startup_locality_seeds_pcr0() {
        let mut banks = PcrBanks::new(&[HashAlgorithm::Sha1, HashAlgorithm::Sha256]);
        let mut body = STARTUP_LOCALITY_SIGNATURE.to_vec();
        body.push(3);
        banks.apply(0, EV_NO_ACTION, &[], &body).unwrap();

        let mut seeded = [0u8; 32];
        seeded[31] = 3;
        assert_eq!(banks.get(HashAlgorithm::Sha256, 0), Some(seeded.as_slice()));
        assert_eq!(banks.get(HashAlgorithm::Sha1, 0).unwrap()[19], 3);

        let digest = sha256(b"crtm");
        banks.apply(0, EV_EFI_ACTION, &[digest.clone()], b"crtm").unwrap();
        let expected = HashAlgorithm::Sha256.hash([seeded.as_slice(), digest.as_bytes()]);
        assert_eq!(banks.get(HashAlgorithm::Sha256, 0), Some(expected.as_slice()));
    }

    #[test]
    fn test_no_action_never_extends() {
        let mut banks = PcrBanks::new(&[HashAlgorithm::Sha256]);
        let zeroed = banks.clone();
        let mut body = STARTUP_LOCALITY_SIGNATURE.to_vec();
        body.push(3);
        // locality markers only count on PCR 0
        banks.apply(1, EV_NO_ACTION, &[sha256(b"x")], &body).unwrap();
        banks.apply(0, EV_NO_ACTION, &[sha256(b"x")], b"Spec ID Event03\0").unwrap();
        assert_eq!(banks, zeroed);
    }

    #[test]
    fn test_malformed_locality_marker_is_ignored() {
        let mut banks = PcrBanks::new(&[HashAlgorithm::Sha256]);
        let zeroed = banks.clone();
        let mut body = STARTUP_LOCALITY_SIGNATURE.to_vec();
        body.extend_from_slice(&[3, 0xde, 0xad]);
        banks.apply(0, EV_NO_ACTION, &[], &body).unwrap();
        assert_eq!(banks, zeroed);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let ops: Vec<(u32, DigestValue)> = (0..40u32)
            .map(|i| {
                let digest =
                    DigestValue::compute(HashAlgorithm::Sha384, [i.to_le_bytes().as_slice()]);
                (i % 24, digest)
            })
            .collect();
        let run = || {
            let mut banks = PcrBanks::new(&[HashAlgorithm::Sha384]);
            for (index, digest) in &ops {
                banks.extend(*index, digest).unwrap();
            }
            banks
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_bounds_and_unknown_banks() {
        let mut banks = PcrBanks::new(&[HashAlgorithm::Sha256]);
        assert!(matches!(
            banks.apply(24, EV_SEPARATOR, &[sha256(b"")], b""),
            Err(Error::PcrIndexOutOfRange(24))
        ));
        assert!(matches!(
            banks.extend(0, &DigestValue::compute(HashAlgorithm::Sha1, [b"".as_slice()])),
            Err(Error::UnsupportedAlgorithm(0x4))
        ));
        // digests for banks that are not replayed are ignored by apply
        banks
            .apply(
                0,
                EV_SEPARATOR,
                &[DigestValue::compute(HashAlgorithm::Sha1, [b"".as_slice()])],
                b"",
            )
            .unwrap();
        assert_eq!(banks.get(HashAlgorithm::Sha256, 0), Some([0u8; 32].as_slice()));
    }

    #[test]
    fn test_mismatches() {
        let mut banks = PcrBanks::new(&[HashAlgorithm::Sha256]);
        banks.apply(7, EV_SEPARATOR, &[sha256(&[0; 4])], &[0; 4]).unwrap();

        let mut expected = BTreeMap::new();
        let mut regs = BTreeMap::new();
        regs.insert(0, vec![0u8; 32]);
        regs.insert(7, vec![0u8; 32]);
        expected.insert(HashAlgorithm::Sha256, regs);
        assert_eq!(banks.mismatches(&expected), vec![(HashAlgorithm::Sha256, 7)]);
    }
}
