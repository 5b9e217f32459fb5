// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental decoding for the P6 family
//! (06_01H through 06_0EH).

use crate::bit_helper::*;
use crate::mce::error_code::{CompoundErrorCode, McaErrorCode};
use crate::mce::event::{DecodedField, DecodedMcaEvent, WarningKind};
use crate::mce::family::{bit_field, FamilyCtx, FamilyDecoder};

/// Bus-queue request types, IA32_MCi_STATUS[24:19].
const BUS_QUEUE_REQUEST_TYPES: &[(u16, &str)] = &[
    (0b000000, "BQ_DCU_READ_TYPE"),
    (0b000010, "BQ_IFU_DEMAND_TYPE"),
    (0b000011, "BQ_IFU_DEMAND_NC_TYPE"),
    (0b000100, "BQ_DCU_RFO_TYPE"),
    (0b000101, "BQ_DCU_RFO_LOCK_TYPE"),
    (0b000110, "BQ_DCU_ITOM_TYPE"),
    (0b001000, "BQ_DCU_WB_TYPE"),
    (0b001010, "BQ_DCU_WCEVICT_TYPE"),
    (0b001011, "BQ_DCU_WCLINE_TYPE"),
    (0b001100, "BQ_DCU_BTM_TYPE"),
    (0b001101, "BQ_DCU_INTACK_TYPE"),
    (0b001110, "BQ_DCU_INVALL2_TYPE"),
    (0b001111, "BQ_DCU_FLUSHL2_TYPE"),
    (0b010000, "BQ_DCU_PART_RD_TYPE"),
    (0b010010, "BQ_DCU_PART_WR_TYPE"),
    (0b010100, "BQ_DCU_SPEC_CYC_TYPE"),
    (0b011000, "BQ_DCU_IO_RD_TYPE"),
    (0b011001, "BQ_DCU_IO_WR_TYPE"),
    (0b011100, "BQ_DCU_LOCK_RD_TYPE"),
    (0b011101, "BQ_DCU_LOCK_WR_TYPE"),
    (0b011110, "BQ_DCU_SPLOCK_RD_TYPE"),
];

/// Bus-queue error types, IA32_MCi_STATUS[27:25].
const BUS_QUEUE_ERROR_TYPES: &[(u16, &str)] = &[
    (0b000, "BQ_ERR_HARD_TYPE"),
    (0b001, "BQ_ERR_DOUBLE_TYPE"),
    (0b010, "BQ_ERR_AERR2_TYPE"),
];

pub(super) struct P6Decoder;

impl FamilyDecoder for P6Decoder {
    fn decode(&self, ctx: &FamilyCtx, event: &mut DecodedMcaEvent) -> bool {
        if !matches!(
            ctx.code,
            Some(McaErrorCode::Compound {
                compound: CompoundErrorCode::BusInterconnect { .. },
                ..
            })
        ) {
            return false;
        }
        decode_bus(event);
        true
    }
}

/// Decodes the P6-compatible external-bus error layout. Shared with the
/// Core 2 families, which kept it unchanged.
pub(super) fn decode_bus(event: &mut DecodedMcaEvent) {
    let status = event.status;

    let mut fields = Vec::new();
    let request = status.read_bits_in_range(&bit_range!(24, 19)) as u16;
    match BUS_QUEUE_REQUEST_TYPES
        .iter()
        .find(|(code, _)| *code == request)
    {
        Some((_, name)) => fields.push(DecodedField::new("Bus_queue_request_type", *name)),
        None => event.warn(
            WarningKind::ModelSpecificSubCodeNotFound,
            format!("bus queue request type {request:#08b}"),
        ),
    }
    let error_type = status.read_bits_in_range(&bit_range!(27, 25)) as u16;
    match BUS_QUEUE_ERROR_TYPES
        .iter()
        .find(|(code, _)| *code == error_type)
    {
        Some((_, name)) => fields.push(DecodedField::new("Bus_queue_error_type", *name)),
        None => event.warn(
            WarningKind::ModelSpecificSubCodeNotFound,
            format!("bus queue error type {error_type:#05b}"),
        ),
    }
    fields.push(bit_field(status, 28, "FRC_error"));
    fields.push(bit_field(status, 29, "BERR"));
    fields.push(bit_field(status, 30, "Internal_BINIT"));
    event.model_specific_errors = fields;

    // UECC and CECC occupy adjacent bits of the other-information word; the
    // syndrome is only meaningful when one of them is set.
    event.reserved_error_status_other_information = vec![
        bit_field(status, 35, "External_BINIT"),
        bit_field(status, 36, "Response_parity_error"),
        bit_field(status, 37, "Bus_BINIT"),
        bit_field(status, 38, "Timeout_BINIT"),
        bit_field(status, 42, "Hard_error"),
        bit_field(status, 43, "IERR"),
        bit_field(status, 44, "AERR"),
        bit_field(status, 45, "UECC"),
        bit_field(status, 46, "CECC"),
        DecodedField::new(
            "ECC_syndrome",
            format!("{:#04x}", status.read_bits_in_range(&bit_range!(54, 47))),
        ),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mce::error_code;
    use crate::mce::event::EventInput;

    fn bus_event(status: u64) -> (FamilyCtx, DecodedMcaEvent) {
        let (code, _) = error_code::parse((status & 0xFFFF) as u16);
        let ctx = FamilyCtx {
            signature: "06_0EH".parse().unwrap(),
            code,
            error_control_ddr: true,
        };
        (
            ctx,
            DecodedMcaEvent::new(&EventInput {
                status,
                ..Default::default()
            }),
        )
    }

    fn field<'a>(fields: &'a [DecodedField], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    #[test]
    fn test_bus_error_decode() {
        // Bus/interconnect code with BQ_DCU_WB_TYPE, BQ_ERR_DOUBLE_TYPE,
        // BERR, AERR, UECC and a syndrome of 0x5A.
        let status: u64 = 0x0800
            | (0b001000 << 19)
            | (0b001 << 25)
            | (1 << 29)
            | (1 << 44)
            | (1 << 45)
            | (0x5A << 47);
        let (ctx, mut event) = bus_event(status);
        assert!(P6Decoder.decode(&ctx, &mut event));

        let model = &event.model_specific_errors;
        assert_eq!(field(model, "Bus_queue_request_type"), Some("BQ_DCU_WB_TYPE"));
        assert_eq!(
            field(model, "Bus_queue_error_type"),
            Some("BQ_ERR_DOUBLE_TYPE")
        );
        assert_eq!(field(model, "BERR"), Some("1"));
        assert_eq!(field(model, "FRC_error"), Some("0"));

        let other = &event.reserved_error_status_other_information;
        assert_eq!(field(other, "AERR"), Some("1"));
        assert_eq!(field(other, "UECC"), Some("1"));
        assert_eq!(field(other, "CECC"), Some("0"));
        assert_eq!(field(other, "ECC_syndrome"), Some("0x5a"));
    }

    #[test]
    fn test_unknown_request_type_warns() {
        let status: u64 = 0x0800 | (0b111111 << 19);
        let (ctx, mut event) = bus_event(status);
        assert!(P6Decoder.decode(&ctx, &mut event));
        assert!(event.has_warning(WarningKind::ModelSpecificSubCodeNotFound));
        assert!(field(&event.model_specific_errors, "Bus_queue_request_type").is_none());
    }

    #[test]
    fn test_non_bus_error_not_claimed() {
        let (ctx, mut event) = bus_event(0x0001);
        assert!(!P6Decoder.decode(&ctx, &mut event));
        assert!(event.model_specific_errors.is_empty());
    }
}
