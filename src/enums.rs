// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Static lookup tables: event type codes, well-known GUIDs and UEFI variable names.

use crate::guid::Guid;
use lazy_static::lazy_static;
use std::collections::HashMap;
use uuid::uuid;

pub const EV_PREBOOT_CERT: u32 = 0x0;
pub const EV_POST_CODE: u32 = 0x1;
pub const EV_UNUSED: u32 = 0x2;
pub const EV_NO_ACTION: u32 = 0x3;
pub const EV_SEPARATOR: u32 = 0x4;
pub const EV_ACTION: u32 = 0x5;
pub const EV_EVENT_TAG: u32 = 0x6;
pub const EV_S_CRTM_CONTENTS: u32 = 0x7;
pub const EV_S_CRTM_VERSION: u32 = 0x8;
pub const EV_CPU_MICROCODE: u32 = 0x9;
pub const EV_PLATFORM_CONFIG_FLAGS: u32 = 0xa;
pub const EV_TABLE_OF_DEVICES: u32 = 0xb;
pub const EV_COMPACT_HASH: u32 = 0xc;
pub const EV_IPL: u32 = 0xd;
pub const EV_IPL_PARTITION_DATA: u32 = 0xe;
pub const EV_NONHOST_CODE: u32 = 0xf;
pub const EV_NONHOST_CONFIG: u32 = 0x10;
pub const EV_NONHOST_INFO: u32 = 0x11;
pub const EV_OMIT_BOOT_DEVICE_EVENTS: u32 = 0x12;
pub const EV_POST_CODE2: u32 = 0x13;

pub const EV_EFI_EVENT_BASE: u32 = 0x80000000;
pub const EV_EFI_VARIABLE_DRIVER_CONFIG: u32 = 0x80000001;
pub const EV_EFI_VARIABLE_BOOT: u32 = 0x80000002;
pub const EV_EFI_BOOT_SERVICES_APPLICATION: u32 = 0x80000003;
pub const EV_EFI_BOOT_SERVICES_DRIVER: u32 = 0x80000004;
pub const EV_EFI_RUNTIME_SERVICES_DRIVER: u32 = 0x80000005;
pub const EV_EFI_GPT_EVENT: u32 = 0x80000006;
pub const EV_EFI_ACTION: u32 = 0x80000007;
pub const EV_EFI_PLATFORM_FIRMWARE_BLOB: u32 = 0x80000008;
pub const EV_EFI_HANDOFF_TABLES: u32 = 0x80000009;
pub const EV_EFI_PLATFORM_FIRMWARE_BLOB2: u32 = 0x8000000a;
pub const EV_EFI_HANDOFF_TABLES2: u32 = 0x8000000b;
pub const EV_EFI_VARIABLE_BOOT2: u32 = 0x8000000c;
pub const EV_EFI_GPT_EVENT2: u32 = 0x8000000d;
pub const EV_EFI_HCRTM_EVENT: u32 = 0x80000010;
pub const EV_EFI_VARIABLE_AUTHORITY: u32 = 0x800000e0;
pub const EV_EFI_SPDM_FIRMWARE_BLOB: u32 = 0x800000e1;
pub const EV_EFI_SPDM_FIRMWARE_CONFIG: u32 = 0x800000e2;
pub const EV_EFI_SPDM_DEVICE_POLICY: u32 = 0x800000e3;
pub const EV_EFI_SPDM_DEVICE_AUTHORITY: u32 = 0x800000e4;

lazy_static! {
    pub static ref EVENTLOG_TYPES: HashMap<u32, &'static str> = HashMap::from(
        [
            (EV_PREBOOT_CERT, "EV_PREBOOT_CERT"),
            (EV_POST_CODE, "EV_POST_CODE"),
            (EV_UNUSED, "EV_UNUSED"),
            (EV_NO_ACTION, "EV_NO_ACTION"),
            (EV_SEPARATOR, "EV_SEPARATOR"),
            (EV_ACTION, "EV_ACTION"),
            (EV_EVENT_TAG, "EV_EVENT_TAG"),
            (EV_S_CRTM_CONTENTS, "EV_S_CRTM_CONTENTS"),
            (EV_S_CRTM_VERSION, "EV_S_CRTM_VERSION"),
            (EV_CPU_MICROCODE, "EV_CPU_MICROCODE"),
            (EV_PLATFORM_CONFIG_FLAGS, "EV_PLATFORM_CONFIG_FLAGS"),
            (EV_TABLE_OF_DEVICES, "EV_TABLE_OF_DEVICES"),
            (EV_COMPACT_HASH, "EV_COMPACT_HASH"),
            (EV_IPL, "EV_IPL"),
            (EV_IPL_PARTITION_DATA, "EV_IPL_PARTITION_DATA"),
            (EV_NONHOST_CODE, "EV_NONHOST_CODE"),
            (EV_NONHOST_CONFIG, "EV_NONHOST_CONFIG"),
            (EV_NONHOST_INFO, "EV_NONHOST_INFO"),
            (EV_OMIT_BOOT_DEVICE_EVENTS, "EV_OMIT_BOOT_DEVICE_EVENTS"),
            (EV_POST_CODE2, "EV_POST_CODE2"),

            // TCG EFI Platform Specification For TPM Family 1.1 or 1.2
            (EV_EFI_EVENT_BASE, "EV_EFI_EVENT_BASE"),
            (EV_EFI_VARIABLE_DRIVER_CONFIG, "EV_EFI_VARIABLE_DRIVER_CONFIG"),
            (EV_EFI_VARIABLE_BOOT, "EV_EFI_VARIABLE_BOOT"),
            (EV_EFI_BOOT_SERVICES_APPLICATION, "EV_EFI_BOOT_SERVICES_APPLICATION"),
            (EV_EFI_BOOT_SERVICES_DRIVER, "EV_EFI_BOOT_SERVICES_DRIVER"),
            (EV_EFI_RUNTIME_SERVICES_DRIVER, "EV_EFI_RUNTIME_SERVICES_DRIVER"),
            (EV_EFI_GPT_EVENT, "EV_EFI_GPT_EVENT"),
            (EV_EFI_ACTION, "EV_EFI_ACTION"),
            (EV_EFI_PLATFORM_FIRMWARE_BLOB, "EV_EFI_PLATFORM_FIRMWARE_BLOB"),
            (EV_EFI_HANDOFF_TABLES, "EV_EFI_HANDOFF_TABLES"),
            (EV_EFI_PLATFORM_FIRMWARE_BLOB2, "EV_EFI_PLATFORM_FIRMWARE_BLOB2"),
            (EV_EFI_HANDOFF_TABLES2, "EV_EFI_HANDOFF_TABLES2"),
            (EV_EFI_VARIABLE_BOOT2, "EV_EFI_VARIABLE_BOOT2"),
            (EV_EFI_GPT_EVENT2, "EV_EFI_GPT_EVENT2"),
            (EV_EFI_HCRTM_EVENT, "EV_EFI_HCRTM_EVENT"),
            (EV_EFI_VARIABLE_AUTHORITY, "EV_EFI_VARIABLE_AUTHORITY"),
            (EV_EFI_SPDM_FIRMWARE_BLOB, "EV_EFI_SPDM_FIRMWARE_BLOB"),
            (EV_EFI_SPDM_FIRMWARE_CONFIG, "EV_EFI_SPDM_FIRMWARE_CONFIG"),
            (EV_EFI_SPDM_DEVICE_POLICY, "EV_EFI_SPDM_DEVICE_POLICY"),
            (EV_EFI_SPDM_DEVICE_AUTHORITY, "EV_EFI_SPDM_DEVICE_AUTHORITY"),
        ]
    );
}

pub fn event_type_name(event_type: u32) -> String {
    match EVENTLOG_TYPES.get(&event_type) {
        Some(type_name) => type_name.to_string(),
        None => format!("UNKNOWN_TYPE: {:x}", event_type),
    }
}

pub const EFI_GLOBAL_VARIABLE: Guid = Guid::from_bytes([
    0x61, 0xdf, 0xe4, 0x8b, 0xca, 0x93, 0xd2, 0x11, 0xaa, 0x0d, 0x00, 0xe0, 0x98, 0x03, 0x2b, 0x8c,
]);

/// d719b2cb-3d3a-4596-a3bc-dad00e67656f, home of db, dbx, dbt and dbr.
pub const EFI_IMAGE_SECURITY_DATABASE: Guid = Guid::from_bytes([
    0xcb, 0xb2, 0x19, 0xd7, 0x3a, 0x3d, 0x96, 0x45, 0xa3, 0xbc, 0xda, 0xd0, 0x0e, 0x67, 0x65, 0x6f,
]);

/// 605dab50-e046-4300-abb6-3dd810dd8b23, shim's MOK and SBAT variables.
pub const SHIM_LOCK: Guid = Guid::from_bytes([
    0x50, 0xab, 0x5d, 0x60, 0x46, 0xe0, 0x00, 0x43, 0xab, 0xb6, 0x3d, 0xd8, 0x10, 0xdd, 0x8b, 0x23,
]);

lazy_static! {
    pub static ref KNOWN_GUIDS: HashMap<Guid, &'static str> = HashMap::from([
        (EFI_GLOBAL_VARIABLE, "EFI_GLOBAL_VARIABLE"),
        (EFI_IMAGE_SECURITY_DATABASE, "EFI_IMAGE_SECURITY_DATABASE"),
        (SHIM_LOCK, "SHIM_LOCK"),

        // Signature types
        (Guid::from_uuid(uuid!("c1c41626-504c-4092-aca9-41f936934328")), "EFI_CERT_SHA256"),
        (Guid::from_uuid(uuid!("3c5766e8-269c-4e34-aa14-ed776e85b3b6")), "EFI_CERT_RSA2048"),
        (Guid::from_uuid(uuid!("e2b36190-879b-4a3d-ad8d-f2e7bba32784")), "EFI_CERT_RSA2048_SHA256"),
        (Guid::from_uuid(uuid!("826ca512-cf10-4ac9-b187-be01496631bd")), "EFI_CERT_SHA1"),
        (Guid::from_uuid(uuid!("67f8444f-8743-48f1-a328-1eaab8736080")), "EFI_CERT_RSA2048_SHA1"),
        (Guid::from_uuid(uuid!("a5c059a1-94e4-4aa7-87b5-ab155c2bf072")), "EFI_CERT_X509"),
        (Guid::from_uuid(uuid!("0b6e5233-a65c-44c9-9407-d9ab83bfc8bd")), "EFI_CERT_SHA224"),
        (Guid::from_uuid(uuid!("ff3e5307-9fd0-48c9-85f1-8ad56c701e01")), "EFI_CERT_SHA384"),
        (Guid::from_uuid(uuid!("093e0fae-a6c4-4f50-9f1b-d41e2b89c19a")), "EFI_CERT_SHA512"),
        (Guid::from_uuid(uuid!("3bd2a492-96c0-4079-b420-fcf98ef103ed")), "EFI_CERT_X509_SHA256"),
        (Guid::from_uuid(uuid!("7076876e-80c2-4ee6-aad2-28b349a6865b")), "EFI_CERT_X509_SHA384"),
        (Guid::from_uuid(uuid!("446dbf63-2502-4cda-bcfa-2465d2b0fe9d")), "EFI_CERT_X509_SHA512"),

        // Configuration tables
        (Guid::from_uuid(uuid!("eb9d2d30-2d88-11d3-9a16-0090273fc14d")), "ACPI_TABLE"),
        (Guid::from_uuid(uuid!("8868e871-e4f1-11d3-bc22-0080c73c8881")), "EFI_ACPI_20_TABLE"),
        (Guid::from_uuid(uuid!("eb9d2d31-2d88-11d3-9a16-0090273fc14d")), "SMBIOS_TABLE"),
        (Guid::from_uuid(uuid!("f2fd1544-9794-4a2c-992e-e5bbcf20e394")), "SMBIOS3_TABLE"),

        // GPT partition types
        (Guid::from_uuid(uuid!("c12a7328-f81f-11d2-ba4b-00a0c93ec93b")), "EFI System Partition"),
        (Guid::from_uuid(uuid!("21686148-6449-6e6f-744e-656564454649")), "BIOS boot partition"),
        (Guid::from_uuid(uuid!("0fc63daf-8483-4772-8e79-3d69d8477de4")), "Linux filesystem"),
        (Guid::from_uuid(uuid!("0657fd6d-a4ab-43c4-84e5-0933c84b4f4f")), "Linux swap"),
        (Guid::from_uuid(uuid!("e6d6d379-f507-44c2-a23c-238f2a3df928")), "Linux LVM"),
        (Guid::from_uuid(uuid!("ebd0a0a2-b9e5-4433-87c0-68b6b72699c7")), "Microsoft basic data"),
        (Guid::from_uuid(uuid!("e3c9e316-0b5c-4db8-817d-f92df00215ae")), "Microsoft reserved"),
    ]);
}

/// Second-level interpretation selected by a UEFI variable's namespace and name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Boolean,
    BootOrder,
    LoadOption,
    SignatureLists,
    SignatureData,
    Text,
}

const GLOBAL: &[Guid] = &[EFI_GLOBAL_VARIABLE];
// some firmware measures the signature databases under the global namespace
const SECURITY_DATABASE: &[Guid] = &[EFI_IMAGE_SECURITY_DATABASE, EFI_GLOBAL_VARIABLE];
const SHIM: &[Guid] = &[SHIM_LOCK];

lazy_static! {
    /// Variable name to interpretation and the vendor namespaces it is defined in.
    pub static ref KNOWN_VARIABLES: HashMap<&'static str, (VariableKind, &'static [Guid])> =
        HashMap::from([
            ("SecureBoot", (VariableKind::Boolean, GLOBAL)),
            ("SetupMode", (VariableKind::Boolean, GLOBAL)),
            ("AuditMode", (VariableKind::Boolean, GLOBAL)),
            ("DeployedMode", (VariableKind::Boolean, GLOBAL)),
            ("MokListTrusted", (VariableKind::Boolean, SHIM)),
            ("BootOrder", (VariableKind::BootOrder, GLOBAL)),
            ("PK", (VariableKind::SignatureLists, GLOBAL)),
            ("KEK", (VariableKind::SignatureLists, GLOBAL)),
            ("db", (VariableKind::SignatureLists, SECURITY_DATABASE)),
            ("dbx", (VariableKind::SignatureLists, SECURITY_DATABASE)),
            ("dbt", (VariableKind::SignatureLists, SECURITY_DATABASE)),
            ("dbr", (VariableKind::SignatureLists, SECURITY_DATABASE)),
            ("MokList", (VariableKind::SignatureLists, SHIM)),
            ("MokListX", (VariableKind::SignatureLists, SHIM)),
            ("SbatLevel", (VariableKind::Text, SHIM)),
        ]);
}

/// Looks a variable up by vendor namespace and name, recognising `Boot####` load options.
/// A well-known name under a foreign namespace is not interpreted.
pub fn variable_kind(vendor: &Guid, name: &str) -> Option<VariableKind> {
    if let Some((kind, namespaces)) = KNOWN_VARIABLES.get(name) {
        return namespaces.contains(vendor).then_some(*kind);
    }
    match name.strip_prefix("Boot") {
        Some(num)
            if *vendor == EFI_GLOBAL_VARIABLE
                && num.len() == 4
                && num.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            Some(VariableKind::LoadOption)
        }
        _ => None,
    }
}

/// Interpretation of an `EV_EFI_VARIABLE_AUTHORITY` body, which holds the single signature
/// that authorised an image rather than the whole variable.
pub fn authority_kind(vendor: &Guid, name: &str) -> Option<VariableKind> {
    match name {
        "db" if SECURITY_DATABASE.contains(vendor) => Some(VariableKind::SignatureData),
        "MokList" | "MokListRT" | "Shim" if *vendor == SHIM_LOCK => {
            Some(VariableKind::SignatureData)
        }
        "SbatLevel" if *vendor == SHIM_LOCK => Some(VariableKind::Text),
        _ => None,
    }
}
