// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! UEFI device path decoding.
//!
//! A device path is a packed list of `{type, subtype, length}` nodes. Known nodes get their
//! fixed fields decoded; whatever follows the fixed fields inside the node (vendor data, or the
//! whole payload of an unknown node) is kept verbatim in `trailing`, so the node lengths always
//! add up to the size of the decoded range.
//! Spec: https://uefi.org/specs/UEFI/2.10/10_Protocols_Device_Path_Protocol.html

use crate::codec::{ucs2_to_string, ByteReader};
use crate::error::{Error, Result};
use crate::guid::{serialize_hex, Guid};
use core::fmt;
use log::{trace, warn};
use serde::Serialize;

pub const HARDWARE_DEVICE_PATH: u8 = 0x01;
pub const ACPI_DEVICE_PATH: u8 = 0x02;
pub const MESSAGING_DEVICE_PATH: u8 = 0x03;
pub const MEDIA_DEVICE_PATH: u8 = 0x04;
pub const BBS_DEVICE_PATH: u8 = 0x05;
pub const END_DEVICE_PATH: u8 = 0x7f;

pub const END_INSTANCE_SUBTYPE: u8 = 0x01;
pub const END_ENTIRE_SUBTYPE: u8 = 0xff;

const NODE_HEADER_SIZE: u16 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DevicePathInfo {
    // Hardware
    Pci {
        function: u8,
        device: u8,
    },
    PcCard {
        function: u8,
    },
    MemoryMapped {
        memory_type: u32,
        start_address: u64,
        end_address: u64,
    },
    Vendor {
        guid: Guid,
    },
    Controller {
        number: u32,
    },
    Bmc {
        interface_type: u8,
        base_address: u64,
    },

    // ACPI
    Acpi {
        hid: u32,
        uid: u32,
    },
    AcpiExpanded {
        hid: u32,
        uid: u32,
        cid: u32,
        hid_str: String,
        uid_str: String,
        cid_str: String,
    },
    AcpiAdr {
        adr: Vec<u32>,
    },

    // Messaging
    Atapi {
        primary_secondary: u8,
        slave_master: u8,
        lun: u16,
    },
    Scsi {
        target: u16,
        lun: u16,
    },
    FibreChannel {
        wwn: u64,
        lun: u64,
    },
    Usb {
        parent_port: u8,
        interface: u8,
    },
    UsbClass {
        vendor_id: u16,
        product_id: u16,
        class: u8,
        subclass: u8,
        protocol: u8,
    },
    Lun {
        lun: u8,
    },
    Sata {
        hba_port: u16,
        port_multiplier_port: u16,
        lun: u16,
    },
    MacAddress {
        #[serde(serialize_with = "serialize_hex")]
        address: Vec<u8>,
        if_type: u8,
    },
    Ipv4 {
        local: [u8; 4],
        remote: [u8; 4],
        local_port: u16,
        remote_port: u16,
        protocol: u16,
        static_address: bool,
        gateway: [u8; 4],
        subnet_mask: [u8; 4],
    },
    Ipv6 {
        local: [u8; 16],
        remote: [u8; 16],
        local_port: u16,
        remote_port: u16,
        protocol: u16,
        origin: u8,
        prefix_length: u8,
        gateway: [u8; 16],
    },
    NvmeNamespace {
        namespace_id: u32,
        eui64: u64,
    },
    Uri {
        uri: String,
    },

    // Media
    HardDrive {
        partition_number: u32,
        partition_start: u64,
        partition_size: u64,
        #[serde(serialize_with = "serialize_hex")]
        signature: Vec<u8>,
        partition_format: u8,
        signature_type: u8,
    },
    CdRom {
        boot_entry: u32,
        partition_start: u64,
        partition_size: u64,
    },
    FilePath {
        path: String,
    },
    MediaProtocol {
        guid: Guid,
    },
    FirmwareFile {
        guid: Guid,
    },
    FirmwareVolume {
        guid: Guid,
    },
    RelativeOffsetRange {
        starting_offset: u64,
        ending_offset: u64,
    },
    RamDisk {
        starting_address: u64,
        ending_address: u64,
        disk_type: Guid,
        instance: u16,
    },

    // BIOS boot specification
    BiosBootSpec {
        device_type: u16,
        status_flag: u16,
        description: String,
    },

    EndInstance,
    EndEntire,

    /// Type/subtype not decoded; the payload sits in `trailing`.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevicePathNode {
    pub node_type: u8,
    pub subtype: u8,
    pub length: u16,
    pub info: DevicePathInfo,
    #[serde(serialize_with = "serialize_hex", skip_serializing_if = "Vec::is_empty")]
    pub trailing: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DevicePath {
    pub nodes: Vec<DevicePathNode>,
}

fn read_ascii_cstr(payload: &mut ByteReader) -> Result<String> {
    let rest = payload.peek_rest();
    let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    let text = String::from_utf8_lossy(&rest[..end]).to_string();
    // skip the terminator too when there is one
    let consumed = if end < rest.len() { end + 1 } else { end };
    payload.skip(consumed)?;
    Ok(text)
}

impl DevicePathInfo {
    fn parse(node_type: u8, subtype: u8, p: &mut ByteReader) -> Result<Self> {
        let info = match (node_type, subtype) {
            (END_DEVICE_PATH, END_INSTANCE_SUBTYPE) => DevicePathInfo::EndInstance,
            (END_DEVICE_PATH, END_ENTIRE_SUBTYPE) => DevicePathInfo::EndEntire,

            (HARDWARE_DEVICE_PATH, 0x01) => DevicePathInfo::Pci {
                function: p.read_u8()?,
                device: p.read_u8()?,
            },
            (HARDWARE_DEVICE_PATH, 0x02) => DevicePathInfo::PcCard {
                function: p.read_u8()?,
            },
            (HARDWARE_DEVICE_PATH, 0x03) => DevicePathInfo::MemoryMapped {
                memory_type: p.read_u32()?,
                start_address: p.read_u64()?,
                end_address: p.read_u64()?,
            },
            (HARDWARE_DEVICE_PATH, 0x04)
            | (MESSAGING_DEVICE_PATH, 0x0a)
            | (MEDIA_DEVICE_PATH, 0x03) => DevicePathInfo::Vendor {
                guid: p.read_guid()?,
            },
            (HARDWARE_DEVICE_PATH, 0x05) => DevicePathInfo::Controller {
                number: p.read_u32()?,
            },
            (HARDWARE_DEVICE_PATH, 0x06) => DevicePathInfo::Bmc {
                interface_type: p.read_u8()?,
                base_address: p.read_u64()?,
            },

            (ACPI_DEVICE_PATH, 0x01) => DevicePathInfo::Acpi {
                hid: p.read_u32()?,
                uid: p.read_u32()?,
            },
            (ACPI_DEVICE_PATH, 0x02) => DevicePathInfo::AcpiExpanded {
                hid: p.read_u32()?,
                uid: p.read_u32()?,
                cid: p.read_u32()?,
                hid_str: read_ascii_cstr(p)?,
                uid_str: read_ascii_cstr(p)?,
                cid_str: read_ascii_cstr(p)?,
            },
            (ACPI_DEVICE_PATH, 0x03) => {
                let mut adr = Vec::with_capacity(p.remaining() / 4);
                while p.remaining() >= 4 {
                    adr.push(p.read_u32()?);
                }
                DevicePathInfo::AcpiAdr { adr }
            }

            (MESSAGING_DEVICE_PATH, 0x01) => DevicePathInfo::Atapi {
                primary_secondary: p.read_u8()?,
                slave_master: p.read_u8()?,
                lun: p.read_u16()?,
            },
            (MESSAGING_DEVICE_PATH, 0x02) => DevicePathInfo::Scsi {
                target: p.read_u16()?,
                lun: p.read_u16()?,
            },
            (MESSAGING_DEVICE_PATH, 0x03) => {
                p.skip(4)?; // reserved
                DevicePathInfo::FibreChannel {
                    wwn: p.read_u64()?,
                    lun: p.read_u64()?,
                }
            }
            (MESSAGING_DEVICE_PATH, 0x05) => DevicePathInfo::Usb {
                parent_port: p.read_u8()?,
                interface: p.read_u8()?,
            },
            (MESSAGING_DEVICE_PATH, 0x0b) => DevicePathInfo::MacAddress {
                address: p.read_bytes(32)?.to_vec(),
                if_type: p.read_u8()?,
            },
            (MESSAGING_DEVICE_PATH, 0x0c) => DevicePathInfo::Ipv4 {
                local: p.read_array()?,
                remote: p.read_array()?,
                local_port: p.read_u16()?,
                remote_port: p.read_u16()?,
                protocol: p.read_u16()?,
                static_address: p.read_u8()? != 0,
                gateway: p.read_array()?,
                subnet_mask: p.read_array()?,
            },
            (MESSAGING_DEVICE_PATH, 0x0d) => DevicePathInfo::Ipv6 {
                local: p.read_array()?,
                remote: p.read_array()?,
                local_port: p.read_u16()?,
                remote_port: p.read_u16()?,
                protocol: p.read_u16()?,
                origin: p.read_u8()?,
                prefix_length: p.read_u8()?,
                gateway: p.read_array()?,
            },
            (MESSAGING_DEVICE_PATH, 0x0f) => DevicePathInfo::UsbClass {
                vendor_id: p.read_u16()?,
                product_id: p.read_u16()?,
                class: p.read_u8()?,
                subclass: p.read_u8()?,
                protocol: p.read_u8()?,
            },
            (MESSAGING_DEVICE_PATH, 0x11) => DevicePathInfo::Lun { lun: p.read_u8()? },
            (MESSAGING_DEVICE_PATH, 0x12) => DevicePathInfo::Sata {
                hba_port: p.read_u16()?,
                port_multiplier_port: p.read_u16()?,
                lun: p.read_u16()?,
            },
            (MESSAGING_DEVICE_PATH, 0x17) => DevicePathInfo::NvmeNamespace {
                namespace_id: p.read_u32()?,
                eui64: p.read_u64()?,
            },
            (MESSAGING_DEVICE_PATH, 0x18) => DevicePathInfo::Uri {
                uri: String::from_utf8_lossy(p.read_rest()).to_string(),
            },

            (MEDIA_DEVICE_PATH, 0x01) => DevicePathInfo::HardDrive {
                partition_number: p.read_u32()?,
                partition_start: p.read_u64()?,
                partition_size: p.read_u64()?,
                signature: p.read_bytes(16)?.to_vec(),
                partition_format: p.read_u8()?,
                signature_type: p.read_u8()?,
            },
            (MEDIA_DEVICE_PATH, 0x02) => DevicePathInfo::CdRom {
                boot_entry: p.read_u32()?,
                partition_start: p.read_u64()?,
                partition_size: p.read_u64()?,
            },
            (MEDIA_DEVICE_PATH, 0x04) => DevicePathInfo::FilePath {
                path: ucs2_to_string(p.read_rest()),
            },
            (MEDIA_DEVICE_PATH, 0x05) => DevicePathInfo::MediaProtocol {
                guid: p.read_guid()?,
            },
            (MEDIA_DEVICE_PATH, 0x06) => DevicePathInfo::FirmwareFile {
                guid: p.read_guid()?,
            },
            (MEDIA_DEVICE_PATH, 0x07) => DevicePathInfo::FirmwareVolume {
                guid: p.read_guid()?,
            },
            (MEDIA_DEVICE_PATH, 0x08) => {
                p.skip(4)?; // reserved
                DevicePathInfo::RelativeOffsetRange {
                    starting_offset: p.read_u64()?,
                    ending_offset: p.read_u64()?,
                }
            }
            (MEDIA_DEVICE_PATH, 0x09) => DevicePathInfo::RamDisk {
                starting_address: p.read_u64()?,
                ending_address: p.read_u64()?,
                disk_type: p.read_guid()?,
                instance: p.read_u16()?,
            },

            (BBS_DEVICE_PATH, 0x01) => DevicePathInfo::BiosBootSpec {
                device_type: p.read_u16()?,
                status_flag: p.read_u16()?,
                description: read_ascii_cstr(p)?,
            },

            _ => DevicePathInfo::Unknown,
        };
        Ok(info)
    }
}

impl DevicePath {
    /// Decodes `data` completely as a sequence of device path nodes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let mut nodes = Vec::new();

        while !reader.is_empty() {
            let node_type = reader.read_u8()?;
            let subtype = reader.read_u8()?;
            let length = reader.read_u16()?;
            if length < NODE_HEADER_SIZE {
                return Err(Error::malformed(format!(
                    "device path node {:#x}/{:#x} has length {} below its header size",
                    node_type, subtype, length
                )));
            }
            let mut payload = reader.sub_reader((length - NODE_HEADER_SIZE) as usize)?;

            let info = DevicePathInfo::parse(node_type, subtype, &mut payload).map_err(|e| match e {
                Error::InsufficientBuffer { .. } => Error::malformed(format!(
                    "device path node {:#x}/{:#x} of length {} is too short for its fields",
                    node_type, subtype, length
                )),
                other => other,
            })?;
            trace!("device path node {:#x}/{:#x} len {}: {:?}", node_type, subtype, length, info);

            nodes.push(DevicePathNode {
                node_type,
                subtype,
                length,
                info,
                trailing: payload.read_rest().to_vec(),
            });
        }

        let path = DevicePath { nodes };
        if !path.nodes.is_empty() && !path.has_end_marker() {
            warn!("device path is not terminated by an end-of-path node");
        }
        Ok(path)
    }

    pub fn has_end_marker(&self) -> bool {
        self.nodes
            .iter()
            .any(|n| matches!(n.info, DevicePathInfo::EndEntire))
    }

    /// Sum of the node lengths; equals the decoded range for every successful parse.
    pub fn encoded_len(&self) -> usize {
        self.nodes.iter().map(|n| n.length as usize).sum()
    }

    /// The last file path component, which is what a reader usually wants to see.
    pub fn file_path(&self) -> Option<&str> {
        self.nodes.iter().rev().find_map(|n| match &n.info {
            DevicePathInfo::FilePath { path } => Some(path.as_str()),
            _ => None,
        })
    }
}

fn eisa_id(id: u32) -> String {
    if id & 0xffff == 0x41d0 {
        format!("PNP{:04X}", id >> 16)
    } else {
        format!("0x{:08x}", id)
    }
}

fn fmt_ipv4(a: &[u8; 4]) -> String {
    format!("{}.{}.{}.{}", a[0], a[1], a[2], a[3])
}

fn fmt_ipv6(a: &[u8; 16]) -> String {
    a.chunks(2)
        .map(|c| format!("{:x}", u16::from_be_bytes([c[0], c[1]])))
        .collect::<Vec<_>>()
        .join(":")
}

impl fmt::Display for DevicePathNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.info {
            DevicePathInfo::Pci { function, device } => {
                write!(f, "Pci(0x{:x},0x{:x})", device, function)
            }
            DevicePathInfo::PcCard { function } => write!(f, "PcCard(0x{:x})", function),
            DevicePathInfo::MemoryMapped {
                memory_type,
                start_address,
                end_address,
            } => write!(
                f,
                "MemoryMapped(0x{:x},0x{:x},0x{:x})",
                memory_type, start_address, end_address
            ),
            DevicePathInfo::Vendor { guid } => {
                let prefix = match self.node_type {
                    HARDWARE_DEVICE_PATH => "VenHw",
                    MESSAGING_DEVICE_PATH => "VenMsg",
                    _ => "VenMedia",
                };
                if self.trailing.is_empty() {
                    write!(f, "{}({})", prefix, guid)
                } else {
                    write!(f, "{}({},{})", prefix, guid, hex::encode(&self.trailing))
                }
            }
            DevicePathInfo::Controller { number } => write!(f, "Ctrl(0x{:x})", number),
            DevicePathInfo::Bmc {
                interface_type,
                base_address,
            } => write!(f, "BMC(0x{:x},0x{:x})", interface_type, base_address),
            DevicePathInfo::Acpi { hid, uid } => match hid {
                0x0a0341d0 => write!(f, "PciRoot(0x{:x})", uid),
                0x0a0841d0 => write!(f, "PcieRoot(0x{:x})", uid),
                _ => write!(f, "Acpi({},0x{:x})", eisa_id(*hid), uid),
            },
            DevicePathInfo::AcpiExpanded {
                hid,
                uid,
                cid,
                hid_str,
                uid_str,
                cid_str,
            } => write!(
                f,
                "AcpiEx({},{},0x{:x},{},{},{})",
                eisa_id(*hid),
                eisa_id(*cid),
                uid,
                hid_str,
                cid_str,
                uid_str
            ),
            DevicePathInfo::AcpiAdr { adr } => {
                let list: Vec<String> = adr.iter().map(|a| format!("0x{:x}", a)).collect();
                write!(f, "AcpiAdr({})", list.join(","))
            }
            DevicePathInfo::Atapi {
                primary_secondary,
                slave_master,
                lun,
            } => write!(f, "Ata({},{},{})", primary_secondary, slave_master, lun),
            DevicePathInfo::Scsi { target, lun } => write!(f, "Scsi(0x{:x},0x{:x})", target, lun),
            DevicePathInfo::FibreChannel { wwn, lun } => {
                write!(f, "Fibre(0x{:x},0x{:x})", wwn, lun)
            }
            DevicePathInfo::Usb {
                parent_port,
                interface,
            } => write!(f, "USB(0x{:x},0x{:x})", parent_port, interface),
            DevicePathInfo::UsbClass {
                vendor_id,
                product_id,
                class,
                subclass,
                protocol,
            } => write!(
                f,
                "UsbClass(0x{:x},0x{:x},0x{:x},0x{:x},0x{:x})",
                vendor_id, product_id, class, subclass, protocol
            ),
            DevicePathInfo::Lun { lun } => write!(f, "Unit(0x{:x})", lun),
            DevicePathInfo::Sata {
                hba_port,
                port_multiplier_port,
                lun,
            } => write!(
                f,
                "Sata(0x{:x},0x{:x},0x{:x})",
                hba_port, port_multiplier_port, lun
            ),
            DevicePathInfo::MacAddress { address, if_type } => {
                // Ethernet-class interfaces use the first six bytes only
                let len = if *if_type <= 1 { 6 } else { address.len() };
                write!(f, "MAC({},0x{:x})", hex::encode(&address[..len]), if_type)
            }
            DevicePathInfo::Ipv4 {
                local,
                remote,
                protocol,
                static_address,
                ..
            } => write!(
                f,
                "IPv4({},{},{},{})",
                fmt_ipv4(remote),
                if *protocol == 6 { "TCP" } else { "UDP" },
                if *static_address { "Static" } else { "DHCP" },
                fmt_ipv4(local)
            ),
            DevicePathInfo::Ipv6 {
                local,
                remote,
                protocol,
                ..
            } => write!(
                f,
                "IPv6({},{},{})",
                fmt_ipv6(remote),
                if *protocol == 6 { "TCP" } else { "UDP" },
                fmt_ipv6(local)
            ),
            DevicePathInfo::NvmeNamespace {
                namespace_id,
                eui64,
            } => write!(f, "NVMe(0x{:x},{:016x})", namespace_id, eui64),
            DevicePathInfo::Uri { uri } => write!(f, "Uri({})", uri),
            DevicePathInfo::HardDrive {
                partition_number,
                partition_start,
                partition_size,
                signature,
                partition_format,
                signature_type,
            } => {
                let sig = match (*signature_type, signature.as_slice()) {
                    (0x02, s) if s.len() == 16 => {
                        let mut raw = [0u8; 16];
                        raw.copy_from_slice(s);
                        Guid::from_bytes(raw).to_string()
                    }
                    (0x01, s) if s.len() >= 4 => {
                        format!("0x{:08x}", u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
                    }
                    _ => "0".to_string(),
                };
                let format = match partition_format {
                    0x01 => "MBR",
                    0x02 => "GPT",
                    _ => "?",
                };
                write!(
                    f,
                    "HD({},{},{},0x{:x},0x{:x})",
                    partition_number, format, sig, partition_start, partition_size
                )
            }
            DevicePathInfo::CdRom {
                boot_entry,
                partition_start,
                partition_size,
            } => write!(
                f,
                "CDROM(0x{:x},0x{:x},0x{:x})",
                boot_entry, partition_start, partition_size
            ),
            DevicePathInfo::FilePath { path } => write!(f, "{}", path),
            DevicePathInfo::MediaProtocol { guid } => write!(f, "Media({})", guid),
            DevicePathInfo::FirmwareFile { guid } => write!(f, "FvFile({})", guid),
            DevicePathInfo::FirmwareVolume { guid } => write!(f, "Fv({})", guid),
            DevicePathInfo::RelativeOffsetRange {
                starting_offset,
                ending_offset,
            } => write!(f, "Offset(0x{:x},0x{:x})", starting_offset, ending_offset),
            DevicePathInfo::RamDisk {
                starting_address,
                ending_address,
                disk_type,
                instance,
            } => write!(
                f,
                "RamDisk(0x{:x},0x{:x},{},{})",
                starting_address, ending_address, instance, disk_type
            ),
            DevicePathInfo::BiosBootSpec {
                device_type,
                status_flag,
                description,
            } => write!(
                f,
                "BBS(0x{:x},{},0x{:x})",
                device_type, description, status_flag
            ),
            DevicePathInfo::EndInstance => write!(f, ","),
            DevicePathInfo::EndEntire => Ok(()),
            DevicePathInfo::Unknown => write!(
                f,
                "Path({},{},{})",
                self.node_type,
                self.subtype,
                hex::encode(&self.trailing)
            ),
        }
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for node in &self.nodes {
            match node.info {
                DevicePathInfo::EndEntire => continue,
                DevicePathInfo::EndInstance => {
                    write!(f, ",")?;
                    first = true;
                    continue;
                }
                _ => {}
            }
            if !first {
                write!(f, "/")?;
            }
            write!(f, "{}", node)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::codec::ByteWriter;

    pub(crate) fn node(w: &mut ByteWriter, t: u8, s: u8, payload: &[u8]) {
        w.put_u8(t)
            .put_u8(s)
            .put_u16(payload.len() as u16 + 4)
            .put_bytes(payload);
    }

    /// PciRoot(0x0)/Pci(0x1,0x1)/HD(1,GPT,...)/\EFI\BOOT\BOOTX64.EFI
    pub(crate) fn boot_path() -> Vec<u8> {
        let mut w = ByteWriter::new();
        let mut acpi = ByteWriter::new();
        acpi.put_u32(0x0a0341d0).put_u32(0);
        node(&mut w, ACPI_DEVICE_PATH, 0x01, &acpi.into_vec());
        node(&mut w, HARDWARE_DEVICE_PATH, 0x01, &[0x01, 0x01]);
        let mut hd = ByteWriter::new();
        hd.put_u32(1)
            .put_u64(0x800)
            .put_u64(0x100000)
            .put_bytes(&[0x11; 16])
            .put_u8(0x02)
            .put_u8(0x02);
        node(&mut w, MEDIA_DEVICE_PATH, 0x01, &hd.into_vec());
        let mut file = ByteWriter::new();
        file.put_ucs2("\\EFI\\BOOT\\BOOTX64.EFI", true);
        node(&mut w, MEDIA_DEVICE_PATH, 0x04, &file.into_vec());
        node(&mut w, END_DEVICE_PATH, END_ENTIRE_SUBTYPE, &[]);
        w.into_vec()
    }

    #[test]
    fn test_parse_boot_path() {
        let data = boot_path();
        let path = DevicePath::parse(&data).unwrap();
        assert_eq!(path.nodes.len(), 5);
        assert_eq!(path.encoded_len(), data.len());
        assert!(path.has_end_marker());
        assert_eq!(path.file_path(), Some("\\EFI\\BOOT\\BOOTX64.EFI"));
        assert_eq!(
            path.to_string(),
            "PciRoot(0x0)/Pci(0x1,0x1)/HD(1,GPT,11111111-1111-1111-1111-111111111111,0x800,0x100000)/\\EFI\\BOOT\\BOOTX64.EFI"
        );
    }

    #[test]
    fn test_unknown_node_kept_raw() {
        let mut w = ByteWriter::new();
        node(&mut w, 0x03, 0x7e, &[1, 2, 3]);
        node(&mut w, END_DEVICE_PATH, END_ENTIRE_SUBTYPE, &[]);
        let data = w.into_vec();
        let path = DevicePath::parse(&data).unwrap();
        assert_eq!(path.nodes[0].info, DevicePathInfo::Unknown);
        assert_eq!(path.nodes[0].trailing, vec![1, 2, 3]);
        assert_eq!(path.encoded_len(), data.len());
        assert_eq!(path.to_string(), "Path(3,126,010203)");
    }

    #[test]
    fn test_vendor_data_is_trailing() {
        let mut w = ByteWriter::new();
        let mut payload = vec![0x22; 16];
        payload.extend_from_slice(&[0xde, 0xad]);
        node(&mut w, MEDIA_DEVICE_PATH, 0x03, &payload);
        let data = w.into_vec();
        let path = DevicePath::parse(&data).unwrap();
        assert_eq!(path.nodes[0].trailing, vec![0xde, 0xad]);
        assert!(path.to_string().starts_with("VenMedia("));
        assert_eq!(path.encoded_len(), data.len());
    }

    #[test]
    fn test_length_below_header_is_malformed() {
        let data = [0x01u8, 0x01, 0x02, 0x00];
        assert!(matches!(
            DevicePath::parse(&data),
            Err(Error::MalformedLength(_))
        ));
    }

    #[test]
    fn test_short_fixed_node_is_malformed() {
        let mut w = ByteWriter::new();
        node(&mut w, ACPI_DEVICE_PATH, 0x01, &[0, 0, 0]);
        assert!(matches!(
            DevicePath::parse(&w.into_vec()),
            Err(Error::MalformedLength(_))
        ));
    }

    #[test]
    fn test_node_overrunning_range() {
        let mut data = boot_path();
        data.truncate(data.len() - 2);
        assert!(matches!(
            DevicePath::parse(&data),
            Err(Error::InsufficientBuffer { .. })
        ));
    }

    #[test]
    fn test_length_conservation_over_mixed_nodes() {
        let mut w = ByteWriter::new();
        let mut sata = ByteWriter::new();
        sata.put_u16(1).put_u16(0xffff).put_u16(0);
        node(&mut w, MESSAGING_DEVICE_PATH, 0x12, &sata.into_vec());
        let mut nvme = ByteWriter::new();
        nvme.put_u32(1).put_u64(0x0102030405060708).put_bytes(&[9, 9]);
        node(&mut w, MESSAGING_DEVICE_PATH, 0x17, &nvme.into_vec());
        node(&mut w, MESSAGING_DEVICE_PATH, 0x18, b"http://boot/x.efi");
        node(&mut w, END_DEVICE_PATH, END_INSTANCE_SUBTYPE, &[]);
        node(&mut w, MEDIA_DEVICE_PATH, 0x07, &[0x33; 16]);
        node(&mut w, END_DEVICE_PATH, END_ENTIRE_SUBTYPE, &[]);
        let data = w.into_vec();
        let path = DevicePath::parse(&data).unwrap();
        assert_eq!(path.encoded_len(), data.len());
        assert_eq!(path.nodes[1].trailing, vec![9, 9]);
        assert!(path.to_string().contains("Uri(http://boot/x.efi)"));
        assert!(path.to_string().contains(",Fv("));
    }
}
