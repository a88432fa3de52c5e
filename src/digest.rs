// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::error::{Error, Result};
use core::fmt;
use serde::Serialize;
use sha1::Sha1;
use sha2::digest::FixedOutput;
use sha2::{Digest, Sha256, Sha384, Sha512};
use sm3::Sm3;

pub const SHA1_DIGEST_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Sm3_256,
}

impl HashAlgorithm {
    pub fn from_tcg_id(id: u16) -> Option<Self> {
        match id {
            0x0004 => Some(HashAlgorithm::Sha1),
            0x000B => Some(HashAlgorithm::Sha256),
            0x000C => Some(HashAlgorithm::Sha384),
            0x000D => Some(HashAlgorithm::Sha512),
            0x0012 => Some(HashAlgorithm::Sm3_256),
            _ => None,
        }
    }

    pub fn tcg_id(&self) -> u16 {
        match self {
            HashAlgorithm::Sha1 => 0x0004,
            HashAlgorithm::Sha256 => 0x000B,
            HashAlgorithm::Sha384 => 0x000C,
            HashAlgorithm::Sha512 => 0x000D,
            HashAlgorithm::Sm3_256 => 0x0012,
        }
    }

    pub fn digest_length(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => SHA1_DIGEST_SIZE,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
            HashAlgorithm::Sm3_256 => 32,
        }
    }

    /// Hashes the concatenation of every slice yielded by `data`.
    pub fn hash<'a, I>(&self, data: I) -> Vec<u8>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        match self {
            HashAlgorithm::Sha1 => self.accumulate_hash::<Sha1, _>(data),
            HashAlgorithm::Sha256 => self.accumulate_hash::<Sha256, _>(data),
            HashAlgorithm::Sha384 => self.accumulate_hash::<Sha384, _>(data),
            HashAlgorithm::Sha512 => self.accumulate_hash::<Sha512, _>(data),
            HashAlgorithm::Sm3_256 => self.accumulate_hash::<Sm3, _>(data),
        }
    }

    fn accumulate_hash<'a, D: Digest + FixedOutput, I>(&self, data: I) -> Vec<u8>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut hasher = D::new();
        for slice in data {
            Digest::update(&mut hasher, slice);
        }

        hasher.finalize().to_vec()
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Sm3_256 => "sm3_256",
        };
        write!(f, "{name}")
    }
}

/// A digest whose length always matches its algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestValue {
    pub algorithm: HashAlgorithm,
    #[serde(serialize_with = "crate::guid::serialize_hex")]
    digest: Vec<u8>,
}

impl DigestValue {
    pub fn new(algorithm: HashAlgorithm, digest: Vec<u8>) -> Result<Self> {
        if digest.len() != algorithm.digest_length() {
            return Err(Error::malformed(format!(
                "{} digest must be {} bytes, got {}",
                algorithm,
                algorithm.digest_length(),
                digest.len()
            )));
        }
        Ok(Self { algorithm, digest })
    }

    /// Runs the hashing primitive over the concatenated inputs.
    pub fn compute<'a, I>(algorithm: HashAlgorithm, data: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        Self {
            algorithm,
            digest: algorithm.hash(data),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.digest
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.digest)
    }
}

impl fmt::Display for DigestValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(
            hex::encode(HashAlgorithm::Sha1.hash([b"abc".as_slice()])),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            hex::encode(HashAlgorithm::Sha256.hash([b"abc".as_slice()])),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            hex::encode(HashAlgorithm::Sm3_256.hash([b"abc".as_slice()])),
            "66c7f0f462eeedd9d1f2d46bdc10e4e24167c4875cf2f7a2297da02b8f4ba8e0"
        );
    }

    #[test]
    fn test_hash_concatenates_inputs() {
        for alg in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
            HashAlgorithm::Sm3_256,
        ] {
            let split = alg.hash([b"ab".as_slice(), b"c".as_slice()]);
            assert_eq!(split, alg.hash([b"abc".as_slice()]));
            assert_eq!(split.len(), alg.digest_length());
            assert_eq!(HashAlgorithm::from_tcg_id(alg.tcg_id()), Some(alg));
        }
    }

    #[test]
    fn test_digest_length_enforced() {
        assert!(DigestValue::new(HashAlgorithm::Sha256, vec![0; 20]).is_err());
        assert!(DigestValue::new(HashAlgorithm::Sha1, vec![0; 20]).is_ok());
    }
}
