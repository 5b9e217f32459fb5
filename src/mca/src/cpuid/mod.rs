// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Decoding of the CPUID leaves that identify an Intel processor.
//!
//! The decoder consumes raw register words for leaves 01H, 80000000H,
//! 80000001H and 80000008H and produces a feature record plus the canonical
//! Processor Signature (`DisplayFamily_DisplayModelH`) that drives
//! family-specific machine-check decoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bit_helper::*;

mod brand;
pub use crate::cpuid::brand::brand_string;

pub mod cpu_leaf;
use crate::cpuid::cpu_leaf::*;

/// Raw output of one CPUID leaf.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    /// EAX register.
    pub eax: u32,
    /// EBX register.
    pub ebx: u32,
    /// ECX register.
    pub ecx: u32,
    /// EDX register.
    pub edx: u32,
}

/// The CPUID leaves consumed by the decoder. Leaves the source could not
/// supply are simply absent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuidLeaves {
    /// Basic CPUID information (leaf 01H).
    #[serde(default)]
    pub leaf_01h: Option<Leaf>,
    /// Maximum extended function input value (leaf 80000000H).
    #[serde(default)]
    pub leaf_80000000h: Option<Leaf>,
    /// Extended processor info and feature bits (leaf 80000001H).
    #[serde(default)]
    pub leaf_80000001h: Option<Leaf>,
    /// Physical and linear address sizes (leaf 80000008H).
    #[serde(default)]
    pub leaf_80000008h: Option<Leaf>,
}

/// Processor type from CPUID.01H EAX[13:12].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorType {
    /// Original OEM Processor.
    OriginalOem,
    /// Intel OverDrive Processor.
    IntelOverdrive,
    /// Dual processor.
    DualProcessor,
    /// Intel reserved.
    IntelReserved,
}

impl ProcessorType {
    fn from_bits(bits: u32) -> Self {
        match bits {
            0b00 => ProcessorType::OriginalOem,
            0b01 => ProcessorType::IntelOverdrive,
            0b10 => ProcessorType::DualProcessor,
            _ => ProcessorType::IntelReserved,
        }
    }
}

impl fmt::Display for ProcessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ProcessorType::OriginalOem => "Original OEM",
            ProcessorType::IntelOverdrive => "Intel OverDrive",
            ProcessorType::DualProcessor => "Dual processor",
            ProcessorType::IntelReserved => "Intel reserved",
        };
        write!(f, "{text}")
    }
}

/// Model, family and stepping information from CPUID.01H EAX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Stepping ID, EAX[3:0].
    pub stepping_id: u8,
    /// Model, EAX[7:4].
    pub model_id: u8,
    /// Family ID, EAX[11:8].
    pub family_id: u8,
    /// Processor type, EAX[13:12].
    pub processor_type: ProcessorType,
    /// Extended Model ID, EAX[19:16].
    pub extended_model_id: u8,
    /// Extended Family ID, EAX[27:20].
    pub extended_family_id: u8,
}

/// Miscellaneous information from CPUID.01H EBX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiscInfo {
    /// Brand index, EBX[7:0].
    pub brand_index: u8,
    /// Brand string resolved through the brand table.
    pub brand: String,
    /// CLFLUSH line size in bytes (EBX[15:8] * 8).
    pub clflush_line_size: u32,
    /// Maximum number of addressable IDs for logical processors, EBX[23:16].
    pub max_addressable_ids: u8,
    /// Whether `max_addressable_ids` is valid (CPUID.01H EDX.HTT).
    pub max_addressable_ids_valid: bool,
    /// Initial APIC ID, EBX[31:24].
    pub initial_apic_id: u8,
}

/// One feature flag from CPUID.01H ECX/EDX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature mnemonic.
    pub name: String,
    /// Whether the feature bit is set.
    pub supported: bool,
}

/// Extended feature flags from CPUID.80000001H.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedFeatures {
    /// LAHF/SAHF available in 64-bit mode, ECX[0].
    pub lahf_sahf: bool,
    /// LZCNT, ECX[5].
    pub lzcnt: bool,
    /// PREFETCHW, ECX[8].
    pub prefetchw: bool,
    /// SYSCALL/SYSRET, EDX[11].
    pub syscall_sysret: bool,
    /// Execute Disable bit, EDX[20].
    pub xd: bool,
    /// 1-GByte pages, EDX[26].
    pub gbpage: bool,
    /// RDTSCP and IA32_TSC_AUX, EDX[27].
    pub rdtscp: bool,
    /// Intel 64 architecture, EDX[29].
    pub intel64: bool,
}

/// Address sizes from CPUID.80000008H EAX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSizes {
    /// Physical address bits, EAX[7:0].
    pub physical_address_bits: u8,
    /// Linear address bits, EAX[15:8].
    pub linear_address_bits: u8,
}

/// The complete decoded CPUID record.
///
/// Sub-records for absent input leaves are left unset.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuidInfo {
    /// Model/family/stepping, from leaf 01H EAX.
    pub version: Option<VersionInfo>,
    /// Brand/CLFLUSH/APIC details, from leaf 01H EBX.
    pub misc: Option<MiscInfo>,
    /// Feature flags, from leaf 01H ECX and EDX, in bit order per register.
    pub features: Option<Vec<Feature>>,
    /// Maximum input value for extended functions, from leaf 80000000H EAX.
    pub max_extended_function: Option<u32>,
    /// Extended feature flags, from leaf 80000001H.
    pub extended_features: Option<ExtendedFeatures>,
    /// Address sizes, from leaf 80000008H.
    pub address_sizes: Option<AddressSizes>,
    /// Canonical Processor Signature, derived from leaf 01H EAX only.
    pub processor_signature: Option<String>,
}

const LEAF1_ECX_FEATURES: &[(u32, &str)] = &[
    (0, "SSE3"),
    (1, "PCLMULQDQ"),
    (2, "DTES64"),
    (3, "MONITOR"),
    (4, "DS-CPL"),
    (5, "VMX"),
    (6, "SMX"),
    (7, "EIST"),
    (8, "TM2"),
    (9, "SSSE3"),
    (10, "CNXT-ID"),
    (11, "SDBG"),
    (12, "FMA"),
    (13, "CMPXCHG16B"),
    (14, "xTPR Update Control"),
    (15, "PDCM"),
    (17, "PCID"),
    (18, "DCA"),
    (19, "SSE4.1"),
    (20, "SSE4.2"),
    (21, "x2APIC"),
    (22, "MOVBE"),
    (23, "POPCNT"),
    (24, "TSC-Deadline"),
    (25, "AESNI"),
    (26, "XSAVE"),
    (27, "OSXSAVE"),
    (28, "AVX"),
    (29, "F16C"),
    (30, "RDRAND"),
];

const LEAF1_EDX_FEATURES: &[(u32, &str)] = &[
    (0, "FPU"),
    (1, "VME"),
    (2, "DE"),
    (3, "PSE"),
    (4, "TSC"),
    (5, "MSR"),
    (6, "PAE"),
    (7, "MCE"),
    (8, "CX8"),
    (9, "APIC"),
    (11, "SEP"),
    (12, "MTRR"),
    (13, "PGE"),
    (14, "MCA"),
    (15, "CMOV"),
    (16, "PAT"),
    (17, "PSE-36"),
    (18, "PSN"),
    (19, "CLFSH"),
    (21, "DS"),
    (22, "ACPI"),
    (23, "MMX"),
    (24, "FXSR"),
    (25, "SSE"),
    (26, "SSE2"),
    (27, "SS"),
    (28, "HTT"),
    (29, "TM"),
    (31, "PBE"),
];

/// Derives the canonical Processor Signature string from CPUID.01H EAX.
///
/// `DisplayFamily` is the base Family ID unless that is 0FH, in which case
/// the extended family is folded in; `DisplayModel` folds in the extended
/// model for families 06H and 0FH. Both render as two hex digits, which is
/// exactly the width the composed values occupy.
pub fn processor_signature(eax: u32) -> String {
    let family_id = eax.read_bits_in_range(&leaf_0x1::eax::PROCESSOR_FAMILY);
    let model_id = eax.read_bits_in_range(&leaf_0x1::eax::PROCESSOR_MODEL);
    let extended_model_id = eax.read_bits_in_range(&leaf_0x1::eax::EXTENDED_PROCESSOR_MODEL);
    let extended_family_id = eax.read_bits_in_range(&leaf_0x1::eax::EXTENDED_FAMILY_ID);

    let display_family = if family_id == 0x0F {
        (extended_family_id << 4) + family_id
    } else {
        family_id
    };
    let display_model = if family_id == 0x06 || family_id == 0x0F {
        (extended_model_id << 4) | model_id
    } else {
        model_id
    };

    format!("{display_family:02X}_{display_model:02X}H")
}

/// Decodes the supplied CPUID leaves.
pub fn decode(leaves: &CpuidLeaves) -> CpuidInfo {
    let mut info = CpuidInfo::default();

    if let Some(leaf_1) = leaves.leaf_01h {
        let eax = leaf_1.eax;
        info.version = Some(VersionInfo {
            stepping_id: eax.read_bits_in_range(&leaf_0x1::eax::STEPPING_ID) as u8,
            model_id: eax.read_bits_in_range(&leaf_0x1::eax::PROCESSOR_MODEL) as u8,
            family_id: eax.read_bits_in_range(&leaf_0x1::eax::PROCESSOR_FAMILY) as u8,
            processor_type: ProcessorType::from_bits(
                eax.read_bits_in_range(&leaf_0x1::eax::PROCESSOR_TYPE),
            ),
            extended_model_id: eax.read_bits_in_range(&leaf_0x1::eax::EXTENDED_PROCESSOR_MODEL)
                as u8,
            extended_family_id: eax.read_bits_in_range(&leaf_0x1::eax::EXTENDED_FAMILY_ID) as u8,
        });
        info.processor_signature = Some(processor_signature(eax));

        let ebx = leaf_1.ebx;
        let brand_index = ebx.read_bits_in_range(&leaf_0x1::ebx::BRAND_INDEX) as u8;
        info.misc = Some(MiscInfo {
            brand_index,
            brand: brand_string(brand_index, eax).to_string(),
            clflush_line_size: ebx.read_bits_in_range(&leaf_0x1::ebx::CLFLUSH_SIZE) * 8,
            max_addressable_ids: ebx.read_bits_in_range(&leaf_0x1::ebx::MAX_ADDRESSABLE_IDS) as u8,
            max_addressable_ids_valid: leaf_1.edx.read_bit(leaf_0x1::edx::HTT_SHIFT),
            initial_apic_id: ebx.read_bits_in_range(&leaf_0x1::ebx::INITIAL_APIC_ID) as u8,
        });

        let mut features = Vec::with_capacity(LEAF1_ECX_FEATURES.len() + LEAF1_EDX_FEATURES.len());
        for &(bit, name) in LEAF1_ECX_FEATURES {
            features.push(Feature {
                name: name.to_string(),
                supported: leaf_1.ecx.read_bit(bit),
            });
        }
        for &(bit, name) in LEAF1_EDX_FEATURES {
            features.push(Feature {
                name: name.to_string(),
                supported: leaf_1.edx.read_bit(bit),
            });
        }
        info.features = Some(features);
    }

    if let Some(leaf) = leaves.leaf_80000000h {
        info.max_extended_function = Some(leaf.eax);
    }

    if let Some(leaf) = leaves.leaf_80000001h {
        info.extended_features = Some(ExtendedFeatures {
            lahf_sahf: leaf.ecx.read_bit(leaf_0x80000001::ecx::LAHF_SAHF_SHIFT),
            lzcnt: leaf.ecx.read_bit(leaf_0x80000001::ecx::LZCNT_SHIFT),
            prefetchw: leaf.ecx.read_bit(leaf_0x80000001::ecx::PREFETCHW_SHIFT),
            syscall_sysret: leaf.edx.read_bit(leaf_0x80000001::edx::SYSCALL_SYSRET_SHIFT),
            xd: leaf.edx.read_bit(leaf_0x80000001::edx::XD_SHIFT),
            gbpage: leaf.edx.read_bit(leaf_0x80000001::edx::GBPAGE_SHIFT),
            rdtscp: leaf.edx.read_bit(leaf_0x80000001::edx::RDTSCP_SHIFT),
            intel64: leaf.edx.read_bit(leaf_0x80000001::edx::INTEL64_SHIFT),
        });
    }

    if let Some(leaf) = leaves.leaf_80000008h {
        info.address_sizes = Some(AddressSizes {
            physical_address_bits: leaf
                .eax
                .read_bits_in_range(&leaf_0x80000008::eax::PHYSICAL_ADDRESS_BITS)
                as u8,
            linear_address_bits: leaf
                .eax
                .read_bits_in_range(&leaf_0x80000008::eax::LINEAR_ADDRESS_BITS)
                as u8,
        });
    }

    info
}

/// Error type for [`ProcessorSignature::from_str`].
#[derive(Debug, PartialEq, Eq, thiserror::Error, displaydoc::Display)]
pub enum SignatureParseError {
    /// Signature `{0}` is not of the form `FF_MMH`.
    Malformed(String),
    /// Signature `{0}` contains a non-hexadecimal family or model.
    NotHex(String),
}

/// A parsed Processor Signature, e.g. `06_1AH`.
///
/// The canonical textual form is produced by [`processor_signature`]; this
/// type is the bridge from that string to the numeric family/model pair the
/// machine-check decoder dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessorSignature {
    /// DisplayFamily.
    pub family: u32,
    /// DisplayModel.
    pub model: u32,
}

impl FromStr for ProcessorSignature {
    type Err = SignatureParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s
            .strip_suffix('H')
            .or_else(|| s.strip_suffix('h'))
            .ok_or_else(|| SignatureParseError::Malformed(s.to_string()))?;
        let (family, model) = trimmed
            .split_once('_')
            .ok_or_else(|| SignatureParseError::Malformed(s.to_string()))?;
        Ok(ProcessorSignature {
            family: u32::from_str_radix(family, 16)
                .map_err(|_| SignatureParseError::NotHex(s.to_string()))?,
            model: u32::from_str_radix(model, 16)
                .map_err(|_| SignatureParseError::NotHex(s.to_string()))?,
        })
    }
}

impl fmt::Display for ProcessorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}_{:02X}H", self.family, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn leaf(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Leaf {
        Leaf { eax, ebx, ecx, edx }
    }

    #[test]
    fn test_signature_core2() {
        // Core 2 (Merom): family 6, model F, stepping 6.
        assert_eq!(processor_signature(0x0000_06F6), "06_0FH");
    }

    #[test]
    fn test_signature_extended_model() {
        // Nehalem-EP: family 6, model A, extended model 1.
        assert_eq!(processor_signature(0x0001_06A5), "06_1AH");
        // Skylake-SP: family 6, model 5, extended model 5.
        assert_eq!(processor_signature(0x0005_0654), "06_55H");
    }

    #[test]
    fn test_signature_family_f() {
        // NetBurst: family F composes the extended family.
        assert_eq!(processor_signature(0x0000_0F12), "0F_01H");
        assert_eq!(processor_signature(0x0010_0F12), "1F_01H");
        // Extended model ignored for DisplayFamily, used for DisplayModel.
        assert_eq!(processor_signature(0x0001_0F62), "0F_16H");
    }

    #[test]
    fn test_signature_other_family() {
        // Family 5: neither extension is folded in.
        assert_eq!(processor_signature(0x0001_0543), "05_04H");
    }

    #[test]
    fn test_signature_depends_only_on_eax() {
        let a = decode(&CpuidLeaves {
            leaf_01h: Some(leaf(0x0001_06A5, 0, 0, 0)),
            ..Default::default()
        });
        let b = decode(&CpuidLeaves {
            leaf_01h: Some(leaf(0x0001_06A5, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF)),
            ..Default::default()
        });
        assert_eq!(a.processor_signature, b.processor_signature);
    }

    #[test]
    fn test_decode_version_info() {
        let info = decode(&CpuidLeaves {
            leaf_01h: Some(leaf(0x0001_06A5, 0, 0, 0)),
            ..Default::default()
        });
        let version = info.version.unwrap();
        assert_eq!(version.stepping_id, 5);
        assert_eq!(version.model_id, 0xA);
        assert_eq!(version.family_id, 6);
        assert_eq!(version.processor_type, ProcessorType::OriginalOem);
        assert_eq!(version.extended_model_id, 1);
        assert_eq!(version.extended_family_id, 0);
    }

    #[test]
    fn test_decode_misc_info_htt_gates_validity() {
        let ebx = 0x1008_0840_u32; // APIC 0x10, max IDs 8, CLFLUSH 8 units, brand index 0x40
        let with_htt = decode(&CpuidLeaves {
            leaf_01h: Some(leaf(0x0001_06A5, ebx, 0, 1 << 28)),
            ..Default::default()
        });
        let misc = with_htt.misc.unwrap();
        assert_eq!(misc.clflush_line_size, 64);
        assert_eq!(misc.max_addressable_ids, 8);
        assert!(misc.max_addressable_ids_valid);
        assert_eq!(misc.initial_apic_id, 0x10);

        let without_htt = decode(&CpuidLeaves {
            leaf_01h: Some(leaf(0x0001_06A5, ebx, 0, 0)),
            ..Default::default()
        });
        assert!(!without_htt.misc.unwrap().max_addressable_ids_valid);
    }

    #[test]
    fn test_decode_features() {
        let info = decode(&CpuidLeaves {
            // ECX: SSE3 + RDRAND, EDX: FPU + MCA + HTT.
            leaf_01h: Some(leaf(
                0x0001_06A5,
                0,
                (1 << 0) | (1 << 30),
                (1 << 0) | (1 << 14) | (1 << 28),
            )),
            ..Default::default()
        });
        let features = info.features.unwrap();
        let get = |name: &str| features.iter().find(|f| f.name == name).unwrap().supported;
        assert!(get("SSE3"));
        assert!(get("RDRAND"));
        assert!(!get("AVX"));
        assert!(get("FPU"));
        assert!(get("MCA"));
        assert!(get("HTT"));
        assert!(!get("PBE"));
    }

    #[test]
    fn test_decode_extended_leaves() {
        let info = decode(&CpuidLeaves {
            leaf_80000000h: Some(leaf(0x8000_0008, 0, 0, 0)),
            leaf_80000001h: Some(leaf(
                0,
                0,
                (1 << 0) | (1 << 5),
                (1 << 11) | (1 << 20) | (1 << 29),
            )),
            leaf_80000008h: Some(leaf(0x0000_302E, 0, 0, 0)),
            ..Default::default()
        });
        assert_eq!(info.max_extended_function, Some(0x8000_0008));
        let extended = info.extended_features.unwrap();
        assert!(extended.lahf_sahf);
        assert!(extended.lzcnt);
        assert!(!extended.prefetchw);
        assert!(extended.syscall_sysret);
        assert!(extended.xd);
        assert!(!extended.gbpage);
        assert!(extended.intel64);
        let sizes = info.address_sizes.unwrap();
        assert_eq!(sizes.physical_address_bits, 46);
        assert_eq!(sizes.linear_address_bits, 48);
    }

    #[test]
    fn test_absent_leaves_stay_unset() {
        let info = decode(&CpuidLeaves::default());
        assert_eq!(info, CpuidInfo::default());
    }

    #[test]
    fn test_signature_round_trip() {
        for text in ["06_0FH", "06_1AH", "06_55H", "0F_06H", "1F_01H"] {
            let parsed: ProcessorSignature = text.parse().unwrap();
            assert_eq!(parsed.to_string(), text);
        }
    }

    #[test]
    fn test_signature_parse_errors() {
        assert!(matches!(
            "06-1A".parse::<ProcessorSignature>(),
            Err(SignatureParseError::Malformed(_))
        ));
        assert!(matches!(
            "0G_1AH".parse::<ProcessorSignature>(),
            Err(SignatureParseError::NotHex(_))
        ));
    }
}
