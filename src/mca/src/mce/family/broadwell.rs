// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental decoding for the Broadwell server parts: Broadwell-DE
//! (06_56H) and Broadwell-EP/EX (06_4FH).

use crate::mce::event::{DecodedField, DecodedMcaEvent};
use crate::mce::family::{
    bit_field, haswell, mscod, replace_model_specific, sandy_bridge, FamilyCtx, FamilyDecoder,
};

pub(super) struct BroadwellDecoder;

impl FamilyDecoder for BroadwellDecoder {
    fn decode(&self, ctx: &FamilyCtx, event: &mut DecodedMcaEvent) -> bool {
        match (ctx.signature.model, event.bank) {
            (0x56, 4) => {
                haswell::decode_internal(event);
                true
            }
            (0x56, 9 | 10) => {
                sandy_bridge::decode_imc(ctx, event, sandy_bridge::IMC_ERROR_CODES);
                true
            }
            (0x4F, 7 | 8) => {
                decode_home_agent(event);
                true
            }
            (0x4F, 9..=16) => {
                sandy_bridge::decode_imc(ctx, event, haswell::IMC_ERROR_CODES);
                true
            }
            _ => false,
        }
    }
}

fn decode_home_agent(event: &mut DecodedMcaEvent) {
    let status = event.status;
    replace_model_specific(
        event,
        vec![
            DecodedField::new("Home_agent_mscod", format!("{:#06x}", mscod(status))),
            bit_field(status, 41, "Failover"),
            bit_field(status, 42, "Mirrorcorr"),
        ],
    );
}
