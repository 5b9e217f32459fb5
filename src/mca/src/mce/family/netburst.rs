// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental decoding for the NetBurst family (0F_xxH).
//!
//! All NetBurst parts share the type-A (cache hierarchy) and type-B (bus
//! and interconnect) model-specific layouts. The Invalid PIC Request flag
//! exists only on 0F_04H, and the Xeon MP 0F_06H reports internal errors
//! through bank 4 with its own code table.

use crate::bit_helper::*;
use crate::mce::error_code::{CompoundErrorCode, McaErrorCode};
use crate::mce::event::{DecodedField, DecodedMcaEvent};
use crate::mce::family::{
    bit_field, lookup_code, redefine_error, replace_model_specific, FamilyCtx, FamilyDecoder,
};

/// Tag error code, IA32_MCi_STATUS[17:16].
const TAG_ERROR_CODES: [&str; 4] = [
    "No error detected",
    "Parity error on tag miss with a clean line",
    "Parity/multiple tag match on tag hit",
    "Parity/multiple tag match on tag miss",
];

/// Data error code, IA32_MCi_STATUS[19:18].
const DATA_ERROR_CODES: [&str; 4] = [
    "No error detected",
    "Single bit error",
    "Double bit error on a clean line",
    "Double bit error on a modified line",
];

/// Bank 4 internal error codes of the Xeon MP (0F_06H),
/// IA32_MC4_STATUS[15:0].
const XEON_MP_MC4_CODES: &[(u16, &str)] = &[
    (0x0001, "Front-end tracker parity error"),
    (0x0002, "Allocation tracker parity error"),
    (0x0004, "Retirement queue parity error"),
    (0x0008, "Trace cache data array parity error"),
    (0x0010, "Microcode sequencer error"),
    (0x0020, "Watchdog timeout"),
];

pub(super) struct NetburstDecoder;

impl FamilyDecoder for NetburstDecoder {
    fn decode(&self, ctx: &FamilyCtx, event: &mut DecodedMcaEvent) -> bool {
        if ctx.signature.model == 0x06 && event.bank == 4 {
            decode_xeon_mp_internal(event);
            return true;
        }
        match ctx.code {
            Some(McaErrorCode::Compound {
                compound: CompoundErrorCode::BusInterconnect { .. },
                ..
            }) => {
                decode_bus(ctx, event);
                true
            }
            Some(McaErrorCode::Compound {
                compound: CompoundErrorCode::CacheHierarchy { .. },
                ..
            }) => {
                decode_cache(event);
                true
            }
            _ => false,
        }
    }
}

fn decode_bus(ctx: &FamilyCtx, event: &mut DecodedMcaEvent) {
    let status = event.status;
    let mut fields = vec![
        bit_field(status, 16, "FSB_address_parity"),
        bit_field(status, 17, "Response_hard_fail"),
        bit_field(status, 18, "Response_parity"),
        bit_field(status, 19, "PIC_and_FSB_data_parity"),
    ];
    if ctx.signature.model == 0x04 {
        fields.push(bit_field(status, 20, "Invalid_PIC_request"));
    }
    fields.push(bit_field(status, 21, "Pad_state_machine"));
    fields.push(bit_field(status, 22, "Pad_strobe_glitch"));
    replace_model_specific(event, fields);
}

fn decode_cache(event: &mut DecodedMcaEvent) {
    let status = event.status;
    let tag = status.read_bits_in_range(&bit_range!(17, 16)) as usize;
    let data = status.read_bits_in_range(&bit_range!(19, 18)) as usize;
    replace_model_specific(
        event,
        vec![
            DecodedField::new("Tag_Error_Code", TAG_ERROR_CODES[tag]),
            DecodedField::new("Data_Error_Code", DATA_ERROR_CODES[data]),
            bit_field(status, 20, "L3_Error"),
        ],
    );
}

fn decode_xeon_mp_internal(event: &mut DecodedMcaEvent) {
    let code = (event.status & 0xFFFF) as u16;
    if let Some(name) = lookup_code(XEON_MP_MC4_CODES, code, "internal error", event) {
        redefine_error(event, "Internal Error", format!("Internal Error / {name}"));
        replace_model_specific(event, vec![DecodedField::new("Internal_error", name)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mce::error_code;
    use crate::mce::event::EventInput;

    fn decode(signature: &str, bank: u32, status: u64) -> (bool, DecodedMcaEvent) {
        let (code, _) = error_code::parse((status & 0xFFFF) as u16);
        let mut event = DecodedMcaEvent::new(&EventInput {
            bank,
            status,
            ..Default::default()
        });
        let ctx = FamilyCtx {
            signature: signature.parse().unwrap(),
            code,
            error_control_ddr: true,
        };
        let claimed = NetburstDecoder.decode(&ctx, &mut event);
        (claimed, event)
    }

    fn field<'a>(fields: &'a [DecodedField], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    #[test]
    fn test_bus_flags() {
        let (claimed, event) = decode("0F_02H", 0, 0x0800 | (1 << 16) | (1 << 22));
        assert!(claimed);
        let model = &event.model_specific_errors;
        assert_eq!(field(model, "FSB_address_parity"), Some("1"));
        assert_eq!(field(model, "Pad_strobe_glitch"), Some("1"));
        assert_eq!(field(model, "Response_parity"), Some("0"));
        // Not an 0F_04H part: no Invalid PIC Request field.
        assert_eq!(field(model, "Invalid_PIC_request"), None);
    }

    #[test]
    fn test_invalid_pic_request_only_on_0f04() {
        let (claimed, event) = decode("0F_04H", 0, 0x0800 | (1 << 20));
        assert!(claimed);
        assert_eq!(
            field(&event.model_specific_errors, "Invalid_PIC_request"),
            Some("1")
        );
    }

    #[test]
    fn test_cache_hierarchy_codes() {
        // Cache hierarchy compound code with tag code 01, data code 10, L3.
        let status = 0x0110 | (0b01_u64 << 16) | (0b10 << 18) | (1 << 20);
        let (claimed, event) = decode("0F_02H", 0, status);
        assert!(claimed);
        let model = &event.model_specific_errors;
        assert_eq!(
            field(model, "Tag_Error_Code"),
            Some("Parity error on tag miss with a clean line")
        );
        assert_eq!(
            field(model, "Data_Error_Code"),
            Some("Double bit error on a clean line")
        );
        assert_eq!(field(model, "L3_Error"), Some("1"));
    }

    #[test]
    fn test_xeon_mp_bank4_internal() {
        let (claimed, event) = decode("0F_06H", 4, 0x0010);
        assert!(claimed);
        let mca_error = event.mca_error.unwrap();
        assert_eq!(
            mca_error.meaning,
            "Internal Error / Microcode sequencer error"
        );
    }

    #[test]
    fn test_simple_code_not_claimed() {
        let (claimed, _) = decode("0F_02H", 0, 0x0400);
        assert!(!claimed);
    }
}
