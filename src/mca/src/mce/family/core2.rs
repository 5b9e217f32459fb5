// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental decoding for the Core 2 families (06_0FH, 06_17H, 06_1DH).
//!
//! Core 2 kept the P6 external-bus layout. The Xeon 7400 (06_1DH)
//! additionally reports last-level-cache controller errors through bank 6
//! with a model-specific 16-bit error-code table.

use crate::mce::error_code::{CompoundErrorCode, McaErrorCode};
use crate::mce::event::{DecodedField, DecodedMcaEvent};
use crate::mce::family::{lookup_code, redefine_error, FamilyCtx, FamilyDecoder};
use crate::mce::family::p6;

/// Bank 6 error codes of the Xeon 7400 series, IA32_MC6_STATUS[15:0].
const XEON7400_MC6_CODES: &[(u16, &str)] = &[
    (0x0001, "Inclusion error from core 0"),
    (0x0002, "Inclusion error from core 1"),
    (0x0003, "Inclusion error from core 2"),
    (0x0004, "Inclusion error from core 3"),
    (0x0005, "Write exclusive error from core 0"),
    (0x0006, "Write exclusive error from core 1"),
    (0x0007, "Write exclusive error from core 2"),
    (0x0008, "Write exclusive error from core 3"),
    (0x0009, "Inclusion error from FSB"),
    (0x000A, "Write exclusive error from FSB"),
    (0x000B, "Inclusion error from central port"),
    (0x000C, "Write exclusive error from central port"),
    (0x000D, "Read miss timeout"),
    (0x000E, "Write miss timeout"),
    (0x0021, "Uncorrected ECC event on outgoing core 0 data"),
    (0x0022, "Uncorrected ECC event on outgoing core 1 data"),
    (0x0023, "Uncorrected ECC event on outgoing core 2 data"),
    (0x0024, "Uncorrected ECC event on outgoing core 3 data"),
    (0x0025, "Uncorrected ECC event on outgoing FSB data"),
    (0x0026, "Uncorrected ECC event on outgoing central-port data"),
    (0x0027, "Corrected ECC event on outgoing data"),
];

pub(super) struct Core2Decoder;

impl FamilyDecoder for Core2Decoder {
    fn decode(&self, ctx: &FamilyCtx, event: &mut DecodedMcaEvent) -> bool {
        if ctx.signature.model == 0x1D && event.bank == 6 {
            decode_mc6(event);
            return true;
        }
        if matches!(
            ctx.code,
            Some(McaErrorCode::Compound {
                compound: CompoundErrorCode::BusInterconnect { .. },
                ..
            })
        ) {
            p6::decode_bus(event);
            return true;
        }
        false
    }
}

fn decode_mc6(event: &mut DecodedMcaEvent) {
    let code = (event.status & 0xFFFF) as u16;
    let decoded = lookup_code(XEON7400_MC6_CODES, code, "cache controller error", event);
    if let Some(description) = decoded {
        // Bank 6 reports its own encoding in the architectural code field,
        // so the generic reading is replaced outright.
        redefine_error(
            event,
            "Internal Error",
            format!("Cache and Bus Controller / {description}"),
        );
        event.model_specific_errors =
            vec![DecodedField::new("Cache_controller_error", description)];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mce::error_code;
    use crate::mce::event::{EventInput, McaErrorInfo, McaErrorKind, WarningKind};

    fn decode(signature: &str, bank: u32, status: u64) -> DecodedMcaEvent {
        let (code, _) = error_code::parse((status & 0xFFFF) as u16);
        let mut event = DecodedMcaEvent::new(&EventInput {
            bank,
            status,
            ..Default::default()
        });
        if let Some(code) = code {
            event.mca_error = Some(McaErrorInfo {
                kind: McaErrorKind::Compound,
                code: (status & 0xFFFF) as u16,
                interpretation: code.interpretation().to_string(),
                meaning: code.meaning(),
                correction_report_filtering: Some("corrected".to_string()),
            });
        }
        let ctx = FamilyCtx {
            signature: signature.parse().unwrap(),
            code,
            error_control_ddr: true,
        };
        assert!(Core2Decoder.decode(&ctx, &mut event));
        event
    }

    #[test]
    fn test_xeon7400_bank6_code() {
        let event = decode("06_1DH", 6, 0x0009);
        let mca_error = event.mca_error.unwrap();
        assert_eq!(mca_error.interpretation, "Internal Error");
        assert_eq!(
            mca_error.meaning,
            "Cache and Bus Controller / Inclusion error from FSB"
        );
        assert_eq!(mca_error.correction_report_filtering, None);
    }

    #[test]
    fn test_xeon7400_bank6_unknown_code_warns() {
        let event = decode("06_1DH", 6, 0x00FF);
        assert!(event.has_warning(WarningKind::ModelSpecificSubCodeNotFound));
    }

    #[test]
    fn test_core2_bus_error_uses_p6_layout() {
        let event = decode("06_0FH", 0, 0x0800 | (0b000010 << 19));
        assert_eq!(
            event.model_specific_errors[0].value,
            "BQ_IFU_DEMAND_TYPE"
        );
    }
}
