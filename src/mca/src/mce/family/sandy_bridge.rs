// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental decoding for Sandy Bridge-EP (06_2DH).
//!
//! Bank 4 is the power control unit with a two-dimensional model-specific
//! code, banks 6 and 7 the QPI links, banks 8 and 11 the integrated memory
//! controller. The iMC can log failing-device detail, but only when the
//! platform ran with MSR_ERROR_CONTROL[1] set; the decoder takes that as a
//! virtual capability input because the MSR itself never reaches the log.

use crate::bit_helper::*;
use crate::mce::event::{DecodedField, DecodedMcaEvent};
use crate::mce::family::{
    lookup_code, mscod, redefine_error, replace_model_specific, FamilyCtx, FamilyDecoder,
};

/// PCU internal error type, IA32_MC4_STATUS[19:16].
const PCU_INTERNAL_ERRORS: &[(u16, &str)] = &[
    (0b0000, "No error"),
    (0b0001, "Non_IMem_Sel"),
    (0b0010, "I_Parity_Error"),
    (0b0011, "Bad_OpCode"),
    (0b0100, "I_Stack_Underflow"),
    (0b0101, "I_Stack_Overflow"),
    (0b0110, "D_Stack_Underflow"),
    (0b0111, "D_Stack_Overflow"),
    (0b1000, "Non_DMem_Sel"),
    (0b1001, "D_Parity_Error"),
];

/// PCU firmware subsystem error type, IA32_MC4_STATUS[23:20].
const PCU_FIRMWARE_ERRORS: &[(u16, &str)] = &[
    (0b0000, "No error"),
    (0b0001, "PCU internal timeout"),
    (0b0010, "Hardware assertion"),
    (0b0011, "Register access timeout"),
    (0b0100, "Voltage regulator fault"),
    (0b0101, "Package C-state exit hang"),
];

/// QPI model-specific error codes, IA32_MCi_STATUS[31:16].
const QPI_ERROR_CODES: &[(u16, &str)] = &[
    (0x02, "Phy detected drift buffer alarm"),
    (0x03, "Phy detected latency buffer rollover"),
    (0x10, "LL detected control error from R3QPI"),
    (0x11, "Rx entered LLR abort state on CRC error"),
    (0x12, "Unsupported or undefined packet"),
    (0x13, "LL control error"),
    (0x20, "Phy detected in-band reset but aborted initialization"),
    (0x21, "Link failover data self-healing"),
    (0x30, "Rx detected CRC error, successful LLR after Phy re-init"),
];

/// iMC model-specific error codes, IA32_MCi_STATUS[31:16].
pub(super) const IMC_ERROR_CODES: &[(u16, &str)] = &[
    (0x0001, "Address parity error"),
    (0x0002, "HA write data parity error"),
    (0x0004, "HA write byte enable parity error"),
    (0x0008, "Corrected patrol scrub error"),
    (0x0010, "Uncorrected patrol scrub error"),
    (0x0020, "Corrected spare error"),
    (0x0040, "Uncorrected spare error"),
];

pub(super) struct SandyBridgeDecoder;

impl FamilyDecoder for SandyBridgeDecoder {
    fn decode(&self, ctx: &FamilyCtx, event: &mut DecodedMcaEvent) -> bool {
        match event.bank {
            4 => {
                decode_pcu(event);
                true
            }
            6 | 7 => {
                decode_qpi(event);
                true
            }
            8 | 11 => {
                decode_imc(ctx, event, IMC_ERROR_CODES);
                true
            }
            _ => false,
        }
    }
}

pub(super) fn decode_pcu(event: &mut DecodedMcaEvent) {
    let status = event.status;
    if status & 0xFFFF == 0x0402 {
        redefine_error(event, "Internal Error", "Internal Error / PCU".to_string());
    }

    let mut fields = Vec::new();
    let internal = status.read_bits_in_range(&bit_range!(19, 16)) as u16;
    if let Some(name) = lookup_code(PCU_INTERNAL_ERRORS, internal, "PCU internal error", event) {
        fields.push(DecodedField::new("PCU_internal_error", name));
    }
    let firmware = status.read_bits_in_range(&bit_range!(23, 20)) as u16;
    if let Some(name) = lookup_code(PCU_FIRMWARE_ERRORS, firmware, "PCU firmware error", event) {
        fields.push(DecodedField::new("PCU_firmware_error", name));
    }
    replace_model_specific(event, fields);
}

fn decode_qpi(event: &mut DecodedMcaEvent) {
    let code = mscod(event.status);
    if let Some(name) = lookup_code(QPI_ERROR_CODES, code, "QPI error", event) {
        replace_model_specific(event, vec![DecodedField::new("QPI_error", name)]);
    }
}

/// Decodes an iMC bank against a family's model-specific table; shared by
/// the later big-core families, which only grow the table.
pub(super) fn decode_imc(
    ctx: &FamilyCtx,
    event: &mut DecodedMcaEvent,
    table: &[(u16, &'static str)],
) {
    let code = mscod(event.status);
    let mut fields = Vec::new();
    if let Some(name) = lookup_code(table, code, "iMC error", event) {
        fields.push(DecodedField::new("iMC_error", name));
    }

    if ctx.error_control_ddr {
        let misc = event.misc;
        fields.push(DecodedField::new(
            "1stErrDev",
            misc.read_bits_in_range(&bit_range!(13, 9)).to_string(),
        ));
        fields.push(DecodedField::new(
            "2ndErrDev",
            misc.read_bits_in_range(&bit_range!(18, 14)).to_string(),
        ));
        fields.push(DecodedField::new(
            "FailRank",
            misc.read_bits_in_range(&bit_range!(50, 46)).to_string(),
        ));
    }
    replace_model_specific(event, fields);
}
