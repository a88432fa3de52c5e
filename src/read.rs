// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::Error;

use std::{
    fs,
    io::{Read, Seek},
    path::Path,
};

/// Event log the kernel exports for the TPM it drives.
pub const BIOS_MEASUREMENTS_PATH: &str = "/sys/kernel/security/tpm0/binary_bios_measurements";

pub const CCEL_PATH: &str = "/sys/firmware/acpi/tables/data/CCEL";

pub const CCEL_ACPI_DESCRIPTION: &str = "/sys/firmware/acpi/tables/CCEL";

pub const GUEST_MEMORY: &str = "/dev/mem";

pub const CCEL_SIGNATURE: &[u8] = b"CCEL";

/// Size of the CCEL ACPI table up to and including `lasa`.
const CCEL_TABLE_SIZE: usize = 56;

/// Ceiling on the log area length taken from the CCEL table before it is allocated.
pub const MAX_CCEL_LOG_SIZE: u64 = 64 * 1024 * 1024;

/// Reads a whole event log file.
pub fn read_log_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("read event log {}", path.display()))?;
    if data.is_empty() {
        bail!("event log {} is empty", path.display());
    }
    Ok(data)
}

/// Reads the TPM event log from securityfs.
pub fn read_bios_measurements() -> Result<Vec<u8>> {
    read_log_file(BIOS_MEASUREMENTS_PATH)
}

/// Reads the confidential computing event log.
///
/// Prefers the ACPI data table the kernel exports. Otherwise the log area address (`lasa`) and
/// length (`laml`) come from the CCEL ACPI table, a 36-byte description header followed by
/// `u32` reserved, `u64` laml and `u64` lasa, and the log is read from guest memory.
pub fn read_ccel() -> Result<Vec<u8>> {
    if Path::new(CCEL_PATH).exists() {
        return read_log_file(CCEL_PATH);
    }

    let efi_acpi_description =
        fs::read(CCEL_ACPI_DESCRIPTION).context("ccel description does not exist")?;
    let (laml, lasa) = parse_ccel_table(&efi_acpi_description)?;

    let mut guest_memory = fs::OpenOptions::new()
        .read(true)
        .open(GUEST_MEMORY)
        .with_context(|| format!("open {}", GUEST_MEMORY))?;
    guest_memory.seek(std::io::SeekFrom::Start(lasa))?;
    let mut ccel = vec![0; laml as usize];
    let read_size = guest_memory.read(&mut ccel)?;
    if read_size == 0 {
        bail!("read CCEL failed");
    }
    ccel.truncate(read_size);

    Ok(ccel)
}

/// Validates the CCEL ACPI table and returns its log area length and address.
fn parse_ccel_table(table: &[u8]) -> Result<(u64, u64)> {
    if table.len() < CCEL_TABLE_SIZE {
        bail!("invalid CCEL ACPI description");
    }

    let mut cursor = table;
    let signature = cursor.read_u32::<LittleEndian>()?;
    let length = cursor.read_u32::<LittleEndian>()?;
    // rest of the ACPI description header
    cursor = &cursor[28..];
    let rsv = cursor.read_u32::<LittleEndian>()?;
    let laml = cursor.read_u64::<LittleEndian>()?;
    let lasa = cursor.read_u64::<LittleEndian>()?;

    let ccel_signature = u32::from_le_bytes(CCEL_SIGNATURE.try_into()?);
    if signature != ccel_signature {
        bail!("invalid CCEL ACPI table: wrong CCEL signature");
    }

    if rsv != 0 {
        bail!("invalid CCEL ACPI table: RSV must be 0");
    }

    if length != table.len() as u32 {
        bail!("invalid CCEL ACPI table: header length not match");
    }

    Error::check_limit("CCEL log area length", laml, MAX_CCEL_LOG_SIZE)?;

    Ok((laml, lasa))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ccel_table(signature: &[u8], rsv: u32) -> Vec<u8> {
        ccel_table_with_laml(signature, rsv, 0x1_0000)
    }

    fn ccel_table_with_laml(signature: &[u8], rsv: u32, laml: u64) -> Vec<u8> {
        let mut table = signature.to_vec();
        table.extend_from_slice(&56u32.to_le_bytes());
        table.extend_from_slice(&[0; 28]);
        table.extend_from_slice(&rsv.to_le_bytes());
        table.extend_from_slice(&laml.to_le_bytes());
        table.extend_from_slice(&0x7fbd_0000u64.to_le_bytes());
        table
    }

    #[test]
    fn test_parse_ccel_table() {
        assert_eq!(
            parse_ccel_table(&ccel_table(b"CCEL", 0)).unwrap(),
            (0x1_0000, 0x7fbd_0000)
        );
        assert!(parse_ccel_table(&ccel_table(b"TCPA", 0)).is_err());
        assert!(parse_ccel_table(&ccel_table(b"CCEL", 1)).is_err());
        assert!(parse_ccel_table(&ccel_table(b"CCEL", 0)[..40]).is_err());
    }

    #[test]
    fn test_ccel_log_area_limit() {
        let table = ccel_table_with_laml(b"CCEL", 0, MAX_CCEL_LOG_SIZE);
        assert_eq!(parse_ccel_table(&table).unwrap().0, MAX_CCEL_LOG_SIZE);

        let table = ccel_table_with_laml(b"CCEL", 0, u64::MAX);
        let err = parse_ccel_table(&table).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::AllocationLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_read_log_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0, 0, 0, 0, 3, 0, 0, 0]).unwrap();
        assert_eq!(read_log_file(file.path()).unwrap().len(), 8);

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(read_log_file(empty.path()).is_err());
        assert!(read_log_file("/nonexistent/binary_bios_measurements").is_err());
    }

    #[ignore]
    #[test]
    fn test_read_ccel() {
        let _ccel = read_ccel().unwrap();
    }

    #[ignore]
    #[test]
    fn test_read_bios_measurements() {
        let data = read_bios_measurements().unwrap();
        crate::Eventlog::parse(&data, &crate::ParserConfig::default()).unwrap();
    }
}
