// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental decoding for Haswell-E (06_3FH).

use crate::mce::event::{DecodedField, DecodedMcaEvent};
use crate::mce::family::sandy_bridge;
use crate::mce::family::{
    lookup_code, mscod, redefine_error, replace_model_specific, FamilyCtx, FamilyDecoder,
};

/// Internal (bank 4) error codes, matched against IA32_MC4_STATUS[15:0].
const INTERNAL_ERROR_CODES: &[(u16, &str)] = &[
    (0x0402, "PCU hardware error"),
    (0x0403, "PCU firmware error"),
    (0x0406, "Intel TXT error"),
    (0x0407, "Other UBOX error"),
];

/// QPI model-specific error codes, IA32_MCi_STATUS[31:16].
const QPI_ERROR_CODES: &[(u16, &str)] = &[
    (0x02, "Phy detected drift buffer alarm"),
    (0x03, "Phy detected latency buffer rollover"),
    (0x10, "LL detected control error from R3QPI"),
    (0x11, "Rx entered LLR abort state on CRC error"),
    (0x12, "Unsupported or undefined packet"),
    (0x13, "LL control error"),
    (0x15, "RBT used un-initialized value"),
    (0x20, "Phy detected in-band reset but aborted initialization"),
    (0x21, "Link failover data self-healing"),
    (0x22, "Phy detected in-band reset, no width change"),
    (0x23, "Link failover clock failover"),
    (0x30, "Rx detected CRC error, successful LLR after Phy re-init"),
];

/// iMC model-specific error codes (DDR3 and DDR4), IA32_MCi_STATUS[31:16].
pub(super) const IMC_ERROR_CODES: &[(u16, &str)] = &[
    (0x0001, "DDR3 address parity error"),
    (0x0002, "Uncorrected HA write data error"),
    (0x0004, "Uncorrected HA data byte enable error"),
    (0x0008, "Corrected patrol scrub error"),
    (0x0010, "Uncorrected patrol scrub error"),
    (0x0020, "Corrected spare error"),
    (0x0040, "Uncorrected spare error"),
    (0x0080, "Corrected memory read error"),
    (0x0100, "iMC write data buffer parity error"),
    (0x0200, "DDR4 command address parity error"),
];

pub(super) struct HaswellDecoder;

impl FamilyDecoder for HaswellDecoder {
    fn decode(&self, ctx: &FamilyCtx, event: &mut DecodedMcaEvent) -> bool {
        match event.bank {
            4 => {
                decode_internal(event);
                true
            }
            5 | 20 | 21 => {
                decode_qpi(event);
                true
            }
            9..=16 => {
                sandy_bridge::decode_imc(ctx, event, IMC_ERROR_CODES);
                true
            }
            _ => false,
        }
    }
}

/// Bank 4 carries a small set of fixed internal codes; shared with the
/// Broadwell and Skylake server parts.
pub(super) fn decode_internal(event: &mut DecodedMcaEvent) {
    let code = (event.status & 0xFFFF) as u16;
    if let Some(name) = lookup_code(INTERNAL_ERROR_CODES, code, "internal error", event) {
        redefine_error(event, "Internal Error", format!("Internal Error / {name}"));
        replace_model_specific(event, vec![DecodedField::new("Internal_error", name)]);
    }
}

fn decode_qpi(event: &mut DecodedMcaEvent) {
    let code = mscod(event.status);
    if let Some(name) = lookup_code(QPI_ERROR_CODES, code, "QPI error", event) {
        replace_model_specific(event, vec![DecodedField::new("QPI_error", name)]);
    }
}
