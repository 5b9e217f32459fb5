// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental decoding for Ivy Bridge-EP (06_3EH).
//!
//! Same PCU layout as Sandy Bridge-EP; the memory controller grows to
//! banks 9 through 16 and two more error codes.

use crate::mce::event::DecodedMcaEvent;
use crate::mce::family::sandy_bridge;
use crate::mce::family::{FamilyCtx, FamilyDecoder};

/// iMC model-specific error codes, IA32_MCi_STATUS[31:16].
const IMC_ERROR_CODES: &[(u16, &str)] = &[
    (0x0001, "Address parity error"),
    (0x0002, "HA write data parity error"),
    (0x0004, "HA write byte enable parity error"),
    (0x0008, "Corrected patrol scrub error"),
    (0x0010, "Uncorrected patrol scrub error"),
    (0x0020, "Corrected spare error"),
    (0x0040, "Uncorrected spare error"),
    (0x0080, "Corrected memory read error"),
    (0x0100, "iMC write data buffer parity error"),
];

pub(super) struct IvyBridgeDecoder;

impl FamilyDecoder for IvyBridgeDecoder {
    fn decode(&self, ctx: &FamilyCtx, event: &mut DecodedMcaEvent) -> bool {
        match event.bank {
            4 => {
                sandy_bridge::decode_pcu(event);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mce::event::EventInput;

    #[test]
    fn test_imc_extended_codes() {
        let mut event = DecodedMcaEvent::new(&EventInput {
            bank: 12,
            status: 0x0100_u64 << 16,
            ..Default::default()
        });
        let ctx = FamilyCtx {
            signature: "06_3EH".parse().unwrap(),
            code: None,
            error_control_ddr: false,
        };
        assert!(IvyBridgeDecoder.decode(&ctx, &mut event));
        assert_eq!(
            event.model_specific_errors[0].value,
            "iMC write data buffer parity error"
        );
    }

    #[test]
    fn test_unclaimed_bank() {
        let mut event = DecodedMcaEvent::new(&EventInput {
            bank: 5,
            ..Default::default()
        });
        let ctx = FamilyCtx {
            signature: "06_3EH".parse().unwrap(),
            code: None,
            error_control_ddr: true,
        };
        assert!(!IvyBridgeDecoder.decode(&ctx, &mut event));
    }
}
