// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental decoding for Nehalem-EP (06_1AH).
//!
//! Banks 0 and 1 front the Intel QPI links, bank 7 the uncore, bank 8 the
//! integrated memory controller. Bank 8 spreads its detail across STATUS
//! (error flags, corrected-error count) and MISC (RTId, DIMM, channel,
//! ECC syndrome).

use crate::bit_helper::*;
use crate::mce::event::{DecodedField, DecodedMcaEvent};
use crate::mce::family::{
    bit_field, lookup_code, mscod, replace_model_specific, replace_other_information, FamilyCtx,
    FamilyDecoder,
};

/// Uncore (bank 7) model-specific error codes, IA32_MC7_STATUS[31:16].
const UNCORE_ERROR_CODES: &[(u16, &str)] = &[
    (0x0000, "Internal error, no additional information"),
    (0x0010, "Front-end tracker parity error"),
    (0x0020, "Allocation tracker parity error"),
    (0x0030, "Retirement tracker parity error"),
    (0x0040, "Global queue parity error"),
    (0x0050, "Snoop queue overflow"),
    (0x0060, "Uncore watchdog timeout"),
];

pub(super) struct NehalemDecoder;

impl FamilyDecoder for NehalemDecoder {
    fn decode(&self, _ctx: &FamilyCtx, event: &mut DecodedMcaEvent) -> bool {
        match event.bank {
            0 | 1 => {
                decode_qpi(event);
                true
            }
            7 => {
                decode_uncore(event);
                true
            }
            8 => {
                decode_memory_controller(event);
                true
            }
            _ => false,
        }
    }
}

fn decode_qpi(event: &mut DecodedMcaEvent) {
    let status = event.status;
    replace_model_specific(
        event,
        vec![
            bit_field(status, 16, "Header_parity_error"),
            bit_field(status, 17, "Data_parity_error"),
            bit_field(status, 18, "Retries_exceeded"),
            bit_field(status, 19, "Received_poisoned_data"),
        ],
    );
}

fn decode_uncore(event: &mut DecodedMcaEvent) {
    let code = mscod(event.status);
    if let Some(description) = lookup_code(UNCORE_ERROR_CODES, code, "uncore error", event) {
        replace_model_specific(
            event,
            vec![DecodedField::new("Internal_error", description)],
        );
    }
}

fn decode_memory_controller(event: &mut DecodedMcaEvent) {
    let status = event.status;
    let misc = event.misc;

    replace_model_specific(
        event,
        vec![
            bit_field(status, 16, "Read_ECC_error"),
            bit_field(status, 17, "RAS_ECC_error"),
            bit_field(status, 18, "Write_parity_error"),
            bit_field(status, 19, "Redundancy_loss"),
            bit_field(status, 21, "Memory_range_error"),
            bit_field(status, 22, "RTID_out_of_range"),
            bit_field(status, 23, "Address_parity_error"),
            bit_field(status, 24, "Byte_enable_parity_error"),
        ],
    );

    replace_other_information(
        event,
        vec![
            DecodedField::new(
                "CORE_ERR_CNT",
                status.read_bits_in_range(&bit_range!(52, 38)).to_string(),
            ),
            DecodedField::new(
                "RTId",
                misc.read_bits_in_range(&bit_range!(7, 0)).to_string(),
            ),
            DecodedField::new(
                "DIMM",
                misc.read_bits_in_range(&bit_range!(17, 16)).to_string(),
            ),
            DecodedField::new(
                "Channel",
                misc.read_bits_in_range(&bit_range!(19, 18)).to_string(),
            ),
            DecodedField::new(
                "ECC_syndrome",
                format!("{:#010x}", misc.read_bits_in_range(&bit_range!(63, 32))),
            ),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mce::event::{EventInput, WarningKind};

    fn decode(bank: u32, status: u64, misc: u64) -> DecodedMcaEvent {
        let mut event = DecodedMcaEvent::new(&EventInput {
            bank,
            status,
            misc,
            ..Default::default()
        });
        let ctx = FamilyCtx {
            signature: "06_1AH".parse().unwrap(),
            code: None,
            error_control_ddr: true,
        };
        assert!(NehalemDecoder.decode(&ctx, &mut event));
        event
    }

    fn field<'a>(fields: &'a [DecodedField], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    #[test]
    fn test_qpi_flags() {
        let event = decode(0, (1 << 16) | (1 << 19), 0);
        let model = &event.model_specific_errors;
        assert_eq!(field(model, "Header_parity_error"), Some("1"));
        assert_eq!(field(model, "Data_parity_error"), Some("0"));
        assert_eq!(field(model, "Received_poisoned_data"), Some("1"));
    }

    #[test]
    fn test_uncore_table() {
        let event = decode(7, 0x0020 << 16, 0);
        assert_eq!(
            field(&event.model_specific_errors, "Internal_error"),
            Some("Allocation tracker parity error")
        );
    }

    #[test]
    fn test_uncore_unknown_code_warns() {
        let event = decode(7, 0xBEEF << 16, 0);
        assert!(event.has_warning(WarningKind::ModelSpecificSubCodeNotFound));
    }

    #[test]
    fn test_memory_controller_sections() {
        let status = (1 << 16) | (1 << 23) | (0x17_u64 << 38);
        let misc = 0x2A | (0b10 << 16) | (0b11 << 18) | (0xDEADBEEF_u64 << 32);
        let event = decode(8, status, misc);

        let model = &event.model_specific_errors;
        assert_eq!(field(model, "Read_ECC_error"), Some("1"));
        assert_eq!(field(model, "Address_parity_error"), Some("1"));
        assert_eq!(field(model, "Write_parity_error"), Some("0"));

        let other = &event.reserved_error_status_other_information;
        assert_eq!(field(other, "CORE_ERR_CNT"), Some("23"));
        assert_eq!(field(other, "RTId"), Some("42"));
        assert_eq!(field(other, "DIMM"), Some("2"));
        assert_eq!(field(other, "Channel"), Some("3"));
        assert_eq!(field(other, "ECC_syndrome"), Some("0xdeadbeef"));
    }
}
