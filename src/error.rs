// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::digest::HashAlgorithm;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while decoding, checking or replaying an event log.
///
/// Only [`Error::UnsupportedType`] is recoverable: the record framing is intact and the caller
/// may keep the opaque body. Everything else is fatal for the record it was raised on.
#[derive(Error, Debug)]
pub enum Error {
    #[error("insufficient buffer: need {needed} bytes but only {remaining} remain")]
    InsufficientBuffer { needed: usize, remaining: usize },

    #[error("malformed length: {0}")]
    MalformedLength(String),

    #[error("unsupported event type 0x{0:08X}")]
    UnsupportedType(u32),

    #[error("unsupported or undeclared hash algorithm 0x{0:04X}")]
    UnsupportedAlgorithm(u16),

    #[error("invalid Spec ID event: {0}")]
    InvalidSpecId(String),

    #[error("{field} declares {declared} which exceeds the limit of {limit}")]
    AllocationLimitExceeded {
        field: &'static str,
        declared: u64,
        limit: u64,
    },

    #[error("{algorithm} digest mismatch on PCR {pcr_index}: claimed {claimed}, computed {computed}")]
    HashMismatch {
        algorithm: HashAlgorithm,
        pcr_index: u32,
        claimed: String,
        computed: String,
    },

    #[error("PCR index {0} is out of range")]
    PcrIndexOutOfRange(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UnsupportedType(_))
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedLength(msg.into())
    }

    /// Rejects `declared` when it exceeds the configured ceiling for `field`.
    pub(crate) fn check_limit(field: &'static str, declared: u64, limit: u64) -> Result<()> {
        if declared > limit {
            return Err(Error::AllocationLimitExceeded {
                field,
                declared,
                limit,
            });
        }
        Ok(())
    }
}
