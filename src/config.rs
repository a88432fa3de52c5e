// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Decide from the first record: a `Spec ID Event03` body means crypto-agile.
    #[default]
    Auto,
    /// SHA-1 only `TCG_PCR_EVENT` records.
    Legacy,
    /// `TCG_PCR_EVENT2` records after a mandatory Spec ID header.
    CryptoAgile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endian {
    /// Big-endian, unless the log's records only frame as little-endian.
    #[default]
    Auto,
    Big,
    Little,
}

/// Hard ceilings and switches for one parse session.
///
/// Every length read from firmware data is checked against the matching ceiling before anything
/// is allocated for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub max_event_size: u32,
    pub max_variable_name_chars: u64,
    pub max_variable_data_size: u64,
    pub max_device_path_size: u64,
    pub max_gpt_partitions: u64,
    pub max_handoff_tables: u64,
    pub max_tagged_event_size: u32,
    pub format: LogFormat,
    pub legacy_byte_order: Endian,
    pub verify_digests: bool,
    pub vendor_quirks: bool,
    pub skip_unsupported: bool,
    pub stop_at_padding: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_event_size: 16 * 1024 * 1024,
            max_variable_name_chars: 4096,
            max_variable_data_size: 16 * 1024 * 1024,
            max_device_path_size: 64 * 1024,
            max_gpt_partitions: 1024,
            max_handoff_tables: 1024,
            max_tagged_event_size: 16 * 1024 * 1024,
            format: LogFormat::Auto,
            legacy_byte_order: Endian::Auto,
            verify_digests: true,
            vendor_quirks: true,
            skip_unsupported: true,
            stop_at_padding: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg: ParserConfig =
            serde_json::from_str(r#"{"format": "crypto_agile", "max_gpt_partitions": 8}"#).unwrap();
        assert_eq!(cfg.format, LogFormat::CryptoAgile);
        assert_eq!(cfg.max_gpt_partitions, 8);
        assert_eq!(cfg.max_event_size, ParserConfig::default().max_event_size);
        assert!(cfg.verify_digests);
    }
}
