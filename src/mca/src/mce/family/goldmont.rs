// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental decoding for Goldmont (Denverton, 06_5FH): iMC banks 6 and 7.

use crate::mce::event::{DecodedField, DecodedMcaEvent};
use crate::mce::family::{lookup_code, mscod, replace_model_specific, FamilyCtx, FamilyDecoder};

/// iMC model-specific error codes, IA32_MCi_STATUS[31:16].
const IMC_ERROR_CODES: &[(u16, &str)] = &[
    (0x0001, "Address parity error"),
    (0x0002, "HA write data parity error"),
    (0x0004, "HA write byte enable parity error"),
    (0x0008, "Corrected patrol scrub error"),
    (0x0010, "Uncorrected patrol scrub error"),
];

pub(super) struct GoldmontDecoder;

impl FamilyDecoder for GoldmontDecoder {
    fn decode(&self, _ctx: &FamilyCtx, event: &mut DecodedMcaEvent) -> bool {
        if !matches!(event.bank, 6 | 7) {
            return false;
        }
        let code = mscod(event.status);
        if let Some(name) = lookup_code(IMC_ERROR_CODES, code, "iMC error", event) {
            replace_model_specific(event, vec![DecodedField::new("iMC_error", name)]);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mce::event::{EventInput, WarningKind};

    #[test]
    fn test_imc_code() {
        let mut event = DecodedMcaEvent::new(&EventInput {
            bank: 6,
            status: 0x0010_u64 << 16,
            ..Default::default()
        });
        let ctx = FamilyCtx {
            signature: "06_5FH".parse().unwrap(),
            code: None,
            error_control_ddr: true,
        };
        assert!(GoldmontDecoder.decode(&ctx, &mut event));
        assert_eq!(
            event.model_specific_errors[0].value,
            "Uncorrected patrol scrub error"
        );
    }

    #[test]
    fn test_unknown_code_warns() {
        let mut event = DecodedMcaEvent::new(&EventInput {
            bank: 7,
            status: 0x0800_u64 << 16,
            ..Default::default()
        });
        let ctx = FamilyCtx {
            signature: "06_5FH".parse().unwrap(),
            code: None,
            error_control_ddr: true,
        };
        assert!(GoldmontDecoder.decode(&ctx, &mut event));
        assert!(event.has_warning(WarningKind::ModelSpecificSubCodeNotFound));
    }
}
