// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use core::fmt;
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// A UEFI GUID as it appears on the wire (mixed-endian, `EFI_GUID` layout).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid([u8; 16]);

impl Guid {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Guid(bytes)
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Guid(uuid.to_bytes_le())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes_le(self.0)
    }

    /// Symbolic name from the well-known GUID table, if any.
    pub fn name(&self) -> Option<&'static str> {
        crate::enums::KNOWN_GUIDS.get(self).copied()
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_uuid().hyphenated())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Serializes a byte buffer as a lowercase hex string.
pub(crate) fn serialize_hex<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_endian_layout() {
        let global = Guid::from_bytes([
            0x61, 0xDF, 0xE4, 0x8B, 0xCA, 0x93, 0xD2, 0x11, 0xAA, 0x0D, 0x00, 0xE0, 0x98, 0x03,
            0x2B, 0x8C,
        ]);
        assert_eq!(global.to_string(), "8be4df61-93ca-11d2-aa0d-00e098032b8c");
        assert_eq!(global.name(), Some("EFI_GLOBAL_VARIABLE"));
        assert_eq!(Guid::from_uuid(global.to_uuid()), global);
    }

    #[test]
    fn test_serialize_as_string() {
        let v = serde_json::to_value(Guid::default()).unwrap();
        assert_eq!(v, "00000000-0000-0000-0000-000000000000");
    }
}
