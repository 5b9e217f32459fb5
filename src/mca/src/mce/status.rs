// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Capability-gated architectural fields of IA32_MCi_STATUS above bit 52.

use crate::bit_helper::*;
use crate::mce::event::{DecodedField, DecodedMcaEvent, UcrClassification, WarningKind};
use crate::mcg_cap::McgCap;

/// Decodes the threshold, corrected-count and firmware-status fields whose
/// presence depends on IA32_MCG_CAP, appending them to the event's
/// reserved/other-information section in register order.
pub(crate) fn decode_architectural(cap: &McgCap, event: &mut DecodedMcaEvent) {
    let status = event.status;
    let uc = event.flags.map_or(0, |f| f.uc);

    if cap.tes_p {
        if cap.ser_p {
            event.s = Some(status.read_bits_in_range(&bit_range!(56, 56)) as u8);
            event.ar = Some(status.read_bits_in_range(&bit_range!(55, 55)) as u8);
        }
        // With UC set, bits [54:53] revert to model-specific meaning and are
        // left to the incremental decoders.
        if uc == 0 {
            let threshold = match status.read_bits_in_range(&bit_range!(54, 53)) {
                0b00 => "No hardware status tracking",
                0b01 => "Green",
                0b10 => "Yellow",
                _ => "Reserved",
            };
            event
                .reserved_error_status_other_information
                .push(DecodedField::new("Threshold-Based_Error_Status", threshold));
        }
    }

    if cap.cmci_p && uc == 0 {
        let value = if status.read_bit(52) {
            "Overflow".to_string()
        } else {
            status.read_bits_in_range(&bit_range!(51, 38)).to_string()
        };
        event
            .reserved_error_status_other_information
            .push(DecodedField::new("Corrected_Error_Count", value));
    }

    if cap.emc_p {
        event
            .reserved_error_status_other_information
            .push(DecodedField::new(
                "Firmware_updated_error_status_indicator",
                (status.read_bit(37) as u8).to_string(),
            ));
    } else {
        event
            .reserved_error_status_other_information
            .push(DecodedField::new(
                "Other_Information",
                format!("{:#x}", status.read_bits_in_range(&bit_range!(37, 32))),
            ));
    }
}

/// Classifies an event against the UCR taxonomy from the five-bit
/// `UC|EN|PCC|S|AR` pattern. Only meaningful with SER_P set.
pub(crate) fn classify_ucr(event: &mut DecodedMcaEvent) {
    let Some(flags) = event.flags else {
        return;
    };
    let s = event.s.unwrap_or(0);
    let ar = event.ar.unwrap_or(0);

    let class = match (flags.uc, flags.en, flags.pcc, s, ar) {
        (0, _, _, _, _) => Some(UcrClassification::Ce),
        (1, 1, 1, _, _) => Some(UcrClassification::Uc),
        (1, 1, 0, 1, 1) => Some(UcrClassification::Srar),
        (1, 1, 0, 1, 0) => Some(UcrClassification::Srao),
        (1, _, 0, 0, 0) => Some(UcrClassification::SraoUcna),
        _ => None,
    };

    match class {
        Some(class) => event.ucr_classification = Some(class),
        None => event.warn(
            WarningKind::UcrClassNotIdentified,
            format!(
                "UC={} EN={} PCC={} S={s} AR={ar}",
                flags.uc, flags.en, flags.pcc
            ),
        ),
    }
}
