// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Which bytes of a record were measured, per event type, and whether the claimed digests
//! match them.

use crate::config::ParserConfig;
use crate::digest::{DigestValue, HashAlgorithm};
use crate::enums::*;
use crate::error::{Error, Result};
use crate::parser::parsers::efi_variable::variable_data;
use core::fmt;
use lazy_static::lazy_static;
use log::{trace, warn};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HashPolicy {
    /// The digest covers the whole event body.
    EventHash,
    /// The digest covers only `VariableData` of a `UEFI_VARIABLE_DATA` body.
    VariableDataHash,
    /// Not a measurement of the body; always passes.
    Success,
}

/// Observed firmware deviations, tried only after the primary policy failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorQuirk {
    /// HP extends the whole boot variable event instead of its data.
    WholeVariableEvent,
    /// Supermicro leaves the final body byte out of authority event digests.
    DropLastByte,
}

impl VendorQuirk {
    fn measured_bytes<'a>(&self, body: &'a [u8]) -> Option<&'a [u8]> {
        match self {
            VendorQuirk::WholeVariableEvent => Some(body),
            VendorQuirk::DropLastByte => body.split_last().map(|(_, rest)| rest),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HashCheckEntry {
    policy: HashPolicy,
    fallback: Option<VendorQuirk>,
}

lazy_static! {
    static ref HASH_CHECK_MAP: HashMap<u32, HashCheckEntry> = {
        let mut map = HashMap::new();
        let entry = |policy, fallback| HashCheckEntry { policy, fallback };

        for tag in [
            EV_SEPARATOR,
            EV_ACTION,
            EV_EFI_ACTION,
            EV_PLATFORM_CONFIG_FLAGS,
            EV_TABLE_OF_DEVICES,
            EV_OMIT_BOOT_DEVICE_EVENTS,
            EV_COMPACT_HASH,
            EV_S_CRTM_VERSION,
            EV_EFI_GPT_EVENT,
            EV_EFI_GPT_EVENT2,
            EV_EFI_VARIABLE_DRIVER_CONFIG,
            EV_EFI_VARIABLE_BOOT2,
            EV_EFI_SPDM_DEVICE_POLICY,
            EV_EFI_SPDM_DEVICE_AUTHORITY,
        ] {
            map.insert(tag, entry(HashPolicy::EventHash, None));
        }
        map.insert(
            EV_EFI_VARIABLE_AUTHORITY,
            entry(HashPolicy::EventHash, Some(VendorQuirk::DropLastByte)),
        );
        map.insert(
            EV_EFI_VARIABLE_BOOT,
            entry(HashPolicy::VariableDataHash, Some(VendorQuirk::WholeVariableEvent)),
        );

        for tag in [
            EV_NO_ACTION,
            EV_POST_CODE,
            EV_POST_CODE2,
            EV_S_CRTM_CONTENTS,
            EV_CPU_MICROCODE,
            EV_EFI_PLATFORM_FIRMWARE_BLOB,
            EV_EFI_PLATFORM_FIRMWARE_BLOB2,
            EV_EFI_HANDOFF_TABLES,
            EV_EFI_HANDOFF_TABLES2,
            EV_EFI_BOOT_SERVICES_APPLICATION,
            EV_EFI_BOOT_SERVICES_DRIVER,
            EV_EFI_RUNTIME_SERVICES_DRIVER,
            EV_IPL,
            EV_IPL_PARTITION_DATA,
            EV_EVENT_TAG,
            EV_NONHOST_CODE,
            EV_NONHOST_CONFIG,
            EV_NONHOST_INFO,
            EV_PREBOOT_CERT,
            EV_EFI_HCRTM_EVENT,
            EV_EFI_SPDM_FIRMWARE_BLOB,
            EV_EFI_SPDM_FIRMWARE_CONFIG,
        ] {
            map.insert(tag, entry(HashPolicy::Success, None));
        }

        map
    };
}

pub fn policy(event_type: u32) -> Option<HashPolicy> {
    HASH_CHECK_MAP.get(&event_type).map(|e| e.policy)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    Match,
    QuirkMatch { quirk: VendorQuirk },
    Mismatch { claimed: String, computed: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlgorithmCheck {
    pub algorithm: HashAlgorithm,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

/// Result of checking one record's claimed digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "algorithms", rename_all = "snake_case")]
pub enum HashCheck {
    Checked(Vec<AlgorithmCheck>),
    Success,
    NotImplemented,
    Skipped,
}

impl HashCheck {
    /// False only when at least one algorithm mismatched.
    pub fn passed(&self) -> bool {
        match self {
            HashCheck::Checked(results) => results
                .iter()
                .all(|r| !matches!(r.outcome, CheckOutcome::Mismatch { .. })),
            _ => true,
        }
    }

    /// One [`Error::HashMismatch`] per mismatching algorithm.
    pub fn mismatches(&self, pcr_index: u32) -> Vec<Error> {
        match self {
            HashCheck::Checked(results) => results
                .iter()
                .filter_map(|r| match &r.outcome {
                    CheckOutcome::Mismatch { claimed, computed } => Some(Error::HashMismatch {
                        algorithm: r.algorithm,
                        pcr_index,
                        claimed: claimed.clone(),
                        computed: computed.clone(),
                    }),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Fails with the first mismatch, for callers treating any bank failure as fatal.
    pub fn into_result(self, pcr_index: u32) -> Result<Self> {
        match self.mismatches(pcr_index).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

impl fmt::Display for HashCheck {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HashCheck::Checked(results) => {
                let outcomes: Vec<String> = results
                    .iter()
                    .map(|r| match &r.outcome {
                        CheckOutcome::Match => format!("{} ok", r.algorithm),
                        CheckOutcome::QuirkMatch { quirk } => {
                            format!("{} ok ({:?} quirk)", r.algorithm, quirk)
                        }
                        CheckOutcome::Mismatch { computed, .. } => {
                            format!("{} MISMATCH (computed {})", r.algorithm, computed)
                        }
                    })
                    .collect();
                write!(f, "{}", outcomes.join(", "))
            }
            HashCheck::Success => write!(f, "not a measurement of the event data"),
            HashCheck::NotImplemented => write!(f, "not implemented"),
            HashCheck::Skipped => write!(f, "skipped"),
        }
    }
}

fn check_digest(
    claimed: &DigestValue,
    measured: Option<&[u8]>,
    body: &[u8],
    fallback: Option<VendorQuirk>,
) -> AlgorithmCheck {
    let algorithm = claimed.algorithm;
    let computed = measured.map(|bytes| algorithm.hash([bytes]));
    if computed.as_deref() == Some(claimed.as_bytes()) {
        return AlgorithmCheck {
            algorithm,
            outcome: CheckOutcome::Match,
        };
    }

    if let Some(quirk) = fallback {
        if let Some(bytes) = quirk.measured_bytes(body) {
            if algorithm.hash([bytes]) == claimed.as_bytes() {
                warn!("{} digest matched only with the {:?} vendor quirk", algorithm, quirk);
                return AlgorithmCheck {
                    algorithm,
                    outcome: CheckOutcome::QuirkMatch { quirk },
                };
            }
        }
    }

    AlgorithmCheck {
        algorithm,
        outcome: CheckOutcome::Mismatch {
            claimed: claimed.to_hex(),
            computed: computed.map(hex::encode).unwrap_or_default(),
        },
    }
}

/// Recomputes each claimed digest over the bytes the event type's policy names.
///
/// A body that cannot be decoded for [`HashPolicy::VariableDataHash`] is an error unless the
/// vendor fallback matches.
pub fn check(
    event_type: u32,
    pcr_index: u32,
    digests: &[DigestValue],
    body: &[u8],
    config: &ParserConfig,
) -> Result<HashCheck> {
    let entry = match HASH_CHECK_MAP.get(&event_type) {
        Some(entry) => entry,
        None => return Ok(HashCheck::NotImplemented),
    };
    trace!(
        "checking {} on PCR {} with {:?}",
        event_type_name(event_type),
        pcr_index,
        entry.policy
    );

    let measured = match entry.policy {
        HashPolicy::Success => return Ok(HashCheck::Success),
        HashPolicy::EventHash => Ok(body),
        HashPolicy::VariableDataHash => variable_data(body, config),
    };
    let fallback = entry.fallback.filter(|_| config.vendor_quirks);

    let measured = match (measured, fallback) {
        (Ok(bytes), _) => Some(bytes),
        (Err(_), Some(_)) => None,
        (Err(e), None) => return Err(e),
    };

    Ok(HashCheck::Checked(
        digests
            .iter()
            .map(|claimed| check_digest(claimed, measured, body, fallback))
            .collect(),
    ))
}
