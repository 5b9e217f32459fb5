// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Human-readable rendering of decoded records.

use std::fmt::Write;

use mca::cpuid::CpuidInfo;
use mca::mce::DecodedMcaEvent;

/// Renders one decoded event as an indented listing.
pub fn render_event(event: &DecodedMcaEvent) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "MCE {} at {} (cpu {}, bank {})",
        event.id, event.timestamp, event.cpu, event.bank
    );
    let _ = writeln!(
        out,
        "  status {:#018x}  misc {:#018x}  addr {:#018x}",
        event.status, event.misc, event.addr
    );

    if let Some(flags) = event.flags {
        let _ = writeln!(
            out,
            "  VAL={} OVER={} UC={} EN={} MISCV={} ADDRV={} PCC={}",
            flags.val, flags.over, flags.uc, flags.en, flags.miscv, flags.addrv, flags.pcc
        );
    }
    if let (Some(s), Some(ar)) = (event.s, event.ar) {
        let _ = writeln!(out, "  S={s} AR={ar}");
    }

    if let Some(mca_error) = &event.mca_error {
        let _ = writeln!(
            out,
            "  MCA error ({:?}, code {:#06x}): {}",
            mca_error.kind, mca_error.code, mca_error.interpretation
        );
        let _ = writeln!(out, "  Meaning: {}", mca_error.meaning);
        if let Some(filtering) = &mca_error.correction_report_filtering {
            let _ = writeln!(out, "  Correction Report Filtering: {filtering}");
        }
    }
    if let Some(class) = event.ucr_classification {
        let _ = writeln!(out, "  UCR classification: {class}");
    }

    if !event.model_specific_errors.is_empty() {
        let _ = writeln!(out, "  Model Specific Errors:");
        for field in &event.model_specific_errors {
            let _ = writeln!(out, "    {}: {}", field.name, field.value);
        }
    }
    if !event.reserved_error_status_other_information.is_empty() {
        let _ = writeln!(out, "  Reserved / Error Status / Other Information:");
        for field in &event.reserved_error_status_other_information {
            let _ = writeln!(out, "    {}: {}", field.name, field.value);
        }
    }

    if let Some(mode) = event.address_mode {
        let _ = writeln!(out, "  Address mode: {mode}");
    }
    if let Some(lsb) = event.recoverable_address_lsb {
        let _ = writeln!(out, "  Recoverable address LSB: {lsb}");
    }
    if let Some(address) = event.address_valid {
        let _ = writeln!(out, "  Address valid: {address:#x}");
    }
    if let Some(gib) = &event.address_gib {
        let _ = writeln!(out, "  Address (GiB): {gib}");
    }
    let _ = writeln!(
        out,
        "  Incremental Decoding Information: {}",
        event.incremental_decoded
    );
    for warning in &event.warnings {
        let _ = writeln!(out, "  warning: {warning}");
    }

    out
}

fn yes_no(supported: bool) -> &'static str {
    if supported {
        "Yes"
    } else {
        "No"
    }
}

/// Renders the decoded CPUID record.
pub fn render_cpuid(info: &CpuidInfo) -> String {
    let mut out = String::new();

    if let Some(signature) = &info.processor_signature {
        let _ = writeln!(out, "Processor Signature: {signature}");
    }
    if let Some(version) = &info.version {
        let _ = writeln!(
            out,
            "Family {:#04x}, Model {:#04x}, Stepping {} ({})",
            version.family_id, version.model_id, version.stepping_id, version.processor_type
        );
        let _ = writeln!(
            out,
            "Extended Family {:#04x}, Extended Model {:#04x}",
            version.extended_family_id, version.extended_model_id
        );
    }
    if let Some(misc) = &info.misc {
        let _ = writeln!(out, "Brand: {} (index {:#04x})", misc.brand, misc.brand_index);
        let _ = writeln!(out, "CLFLUSH line size: {} bytes", misc.clflush_line_size);
        let _ = writeln!(
            out,
            "Maximum addressable logical IDs: {} ({})",
            misc.max_addressable_ids,
            if misc.max_addressable_ids_valid {
                "valid"
            } else {
                "invalid"
            }
        );
        let _ = writeln!(out, "Initial APIC ID: {}", misc.initial_apic_id);
    }
    if let Some(features) = &info.features {
        let _ = writeln!(out, "Features:");
        for feature in features {
            let _ = writeln!(out, "  {}: {}", feature.name, yes_no(feature.supported));
        }
    }
    if let Some(max) = info.max_extended_function {
        let _ = writeln!(out, "Maximum Input Value for Extended Function: {max:08X}");
    }
    if let Some(extended) = &info.extended_features {
        let _ = writeln!(out, "Extended features:");
        let _ = writeln!(out, "  LAHF/SAHF: {}", yes_no(extended.lahf_sahf));
        let _ = writeln!(out, "  LZCNT: {}", yes_no(extended.lzcnt));
        let _ = writeln!(out, "  PREFETCHW: {}", yes_no(extended.prefetchw));
        let _ = writeln!(out, "  SYSCALL/SYSRET: {}", yes_no(extended.syscall_sysret));
        let _ = writeln!(out, "  XD: {}", yes_no(extended.xd));
        let _ = writeln!(out, "  GBPAGE: {}", yes_no(extended.gbpage));
        let _ = writeln!(out, "  RDTSCP/IA32_TSC_AUX: {}", yes_no(extended.rdtscp));
        let _ = writeln!(out, "  INTEL64: {}", yes_no(extended.intel64));
    }
    if let Some(sizes) = &info.address_sizes {
        let _ = writeln!(
            out,
            "Physical Address Bits: {}, Linear Address Bits: {}",
            sizes.physical_address_bits, sizes.linear_address_bits
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mca::mce::{decode_event, DecodeContext, EventInput};
    use mca::McgCap;

    #[test]
    fn test_render_event_sections() {
        let ctx = DecodeContext::new(McgCap::decode(0x1C09), Some("06_0FH".parse().unwrap()));
        let event = decode_event(
            &ctx,
            &EventInput {
                id: 190,
                timestamp: "2017-07-07T18:25:27.441Z".to_string(),
                cpu: 1,
                bank: 3,
                status: 0x9020_000F_0120_100E,
                addr: 0,
                misc: 0,
            },
        );
        let text = render_event(&event);
        assert!(text.contains("MCE 190 at 2017-07-07T18:25:27.441Z (cpu 1, bank 3)"));
        assert!(text.contains("Meaning: Generic Cache Hierarchy / Level 2"));
        assert!(text.contains("Correction Report Filtering: corrected"));
        assert!(text.contains("Threshold-Based_Error_Status: Green"));
        assert!(text.contains("Incremental Decoding Information: false"));
    }

    #[test]
    fn test_render_cpuid_yes_no() {
        use mca::cpuid::{CpuidLeaves, Leaf};
        let info = mca::cpuid::decode(&CpuidLeaves {
            leaf_01h: Some(Leaf {
                eax: 0x0000_06F6,
                ebx: 0,
                ecx: 1,
                edx: 0,
            }),
            leaf_80000000h: Some(Leaf {
                eax: 0x8000_0008,
                ebx: 0,
                ecx: 0,
                edx: 0,
            }),
            ..Default::default()
        });
        let text = render_cpuid(&info);
        assert!(text.contains("Processor Signature: 06_0FH"));
        assert!(text.contains("SSE3: Yes"));
        assert!(text.contains("PCLMULQDQ: No"));
        assert!(text.contains("Maximum Input Value for Extended Function: 80000008"));
    }
}
