// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Decoding of machine-check events.
//!
//! [`decode_event`] is a pure function over one event's MSR triple plus the
//! per-host [`DecodeContext`]; it never fails. Interpretation problems are
//! reported as [`Warning`]s on the returned record: an invalid status or an
//! unidentifiable error code reduces the record to its identity fields, a
//! reserved sub-code leaves one field unset, and everything else decodes
//! normally.

use crate::bit_helper::*;

mod event;
pub use crate::mce::event::{
    AddressMode, DecodeContext, DecodedField, DecodedMcaEvent, EventInput, McaErrorInfo,
    McaErrorKind, UcrClassification, ValidityFlags, Warning, WarningKind,
};

pub mod error_code;
use crate::mce::error_code::{
    channel_name, CompoundErrorCode, McaErrorCode, RequestType, TransactionType,
};

mod family;
mod misc;
mod status;

/// Decodes one machine-check event.
pub fn decode_event(ctx: &DecodeContext, input: &EventInput) -> DecodedMcaEvent {
    let mut event = DecodedMcaEvent::new(input);
    let status_word = input.status;

    // Validity gate: with VAL clear nothing else in the bank is defined.
    if !status_word.read_bit(63) {
        event.warn(WarningKind::StatusNotValid, "stop decoding");
        return event;
    }
    let flags = ValidityFlags {
        val: 1,
        over: status_word.read_bit(62) as u8,
        uc: status_word.read_bit(61) as u8,
        en: status_word.read_bit(60) as u8,
        miscv: status_word.read_bit(59) as u8,
        addrv: status_word.read_bit(58) as u8,
        pcc: status_word.read_bit(57) as u8,
    };
    event.flags = Some(flags);

    status::decode_architectural(&ctx.capability, &mut event);
    event.model_specific_errors.push(DecodedField::new(
        "Model_Specific_Error_Code",
        format!(
            "{:#06x}",
            status_word.read_bits_in_range(&bit_range!(31, 16))
        ),
    ));

    misc::decode_misc(&ctx.capability, &mut event);
    misc::compute_address_valid(&mut event);

    let (code, parse_warnings) = error_code::parse((status_word & 0xFFFF) as u16);
    let mut unidentified = Vec::new();
    for warning in parse_warnings {
        if warning.kind == WarningKind::McaErrorCodeNotIdentified {
            unidentified.push(warning);
        } else {
            event.warn(warning.kind, warning.detail);
        }
    }
    if let Some(code) = &code {
        event.mca_error = Some(McaErrorInfo {
            kind: match code {
                McaErrorCode::Simple(_) => McaErrorKind::Simple,
                McaErrorCode::Compound { .. } => McaErrorKind::Compound,
            },
            code: (status_word & 0xFFFF) as u16,
            interpretation: code.interpretation().to_string(),
            meaning: code.meaning(),
            correction_report_filtering: None,
        });
    }

    // The architectural SRAO/SRAR patterns must be matched before the F bit
    // is given a meaning.
    let overridden = apply_ucr_overrides(ctx, code.as_ref(), &mut event);
    if !overridden {
        if let Some(McaErrorCode::Compound { filtered, .. }) = code {
            if flags.uc == 0 {
                if let Some(mca_error) = event.mca_error.as_mut() {
                    mca_error.correction_report_filtering = Some(
                        if filtered { "corrected" } else { "not corrected" }.to_string(),
                    );
                }
            }
        }
    }

    if ctx.capability.ser_p && event.ucr_classification.is_none() {
        status::classify_ucr(&mut event);
    }

    if flags.addrv == 1
        && matches!(
            code,
            Some(McaErrorCode::Compound {
                compound: CompoundErrorCode::MemoryController { .. },
                ..
            })
        )
    {
        let gib = misc::address_gib(&event);
        event.address_gib = Some(gib);
    }

    if let Some(signature) = ctx.signature {
        if let Some(decoder) = family::family_decoder(signature) {
            let family_ctx = family::FamilyCtx {
                signature,
                code,
                error_control_ddr: ctx.error_control_ddr,
            };
            if decoder.decode(&family_ctx, &mut event) {
                event.incremental_decoded = true;
            }
        }
    }

    // A code neither the grammar nor a family table recognized: emit the
    // identity alone, like the validity gate does.
    if event.mca_error.is_none() && !event.incremental_decoded {
        let mut bare = DecodedMcaEvent::new(input);
        for warning in unidentified {
            bare.warn(warning.kind, warning.detail);
        }
        return bare;
    }
    if event.mca_error.is_none() {
        for warning in unidentified {
            event.warn(warning.kind, warning.detail);
        }
    }

    event
}

/// Applies the architecturally defined SRAO/SRAR pattern overrides. Returns
/// whether one matched; a match replaces the meaning and pins the UCR class,
/// and the correction-report-filtering field stays absent.
fn apply_ucr_overrides(
    ctx: &DecodeContext,
    code: Option<&McaErrorCode>,
    event: &mut DecodedMcaEvent,
) -> bool {
    if !ctx.capability.ser_p {
        return false;
    }
    let Some(flags) = event.flags else {
        return false;
    };
    let Some(compound) = code.and_then(McaErrorCode::compound) else {
        return false;
    };
    let s = event.s.unwrap_or(0);
    let ar = event.ar.unwrap_or(0);

    let srao_pattern = flags.over == 0
        && flags.uc == 1
        && flags.miscv == 1
        && flags.addrv == 1
        && flags.pcc == 0
        && ar == 0;
    let srar_pattern = flags.over == 0
        && flags.uc == 1
        && flags.en == 1
        && flags.miscv == 1
        && flags.addrv == 1
        && flags.pcc == 0
        && s == 1
        && ar == 1;

    let override_meaning = match compound {
        CompoundErrorCode::MemoryController {
            transaction: Some(error_code::MemoryTransaction::Scrub),
            channel,
        } if srao_pattern => Some((
            format!(
                "Architecturally Defined SRAO Errors / Memory Scrubbing / {}",
                channel_name(*channel)
            ),
            UcrClassification::Srao,
        )),
        CompoundErrorCode::CacheHierarchy {
            request: Some(RequestType::Eviction),
            transaction: Some(TransactionType::Generic),
            level: error_code::CacheLevel::L2,
        } if srao_pattern => Some((
            "Architecturally Defined SRAO Errors / L3 Explicit Writeback".to_string(),
            UcrClassification::Srao,
        )),
        CompoundErrorCode::CacheHierarchy {
            request: Some(RequestType::DataRead),
            transaction: Some(TransactionType::Data),
            level: error_code::CacheLevel::L0,
        } if srar_pattern => Some((
            "Architecturally Defined SRAR Errors / Data Load".to_string(),
            UcrClassification::Srar,
        )),
        CompoundErrorCode::CacheHierarchy {
            request: Some(RequestType::InstructionFetch),
            transaction: Some(TransactionType::Instruction),
            level: error_code::CacheLevel::L0,
        } if srar_pattern => Some((
            "Architecturally Defined SRAR Errors / Instruction Fetch".to_string(),
            UcrClassification::Srar,
        )),
        _ => None,
    };

    let Some((meaning, class)) = override_meaning else {
        return false;
    };

    if event.address_mode != Some(AddressMode::PhysicalAddress) {
        event.warn(
            WarningKind::PhysicalAddressModeExpected,
            format!(
                "address mode is {}",
                event
                    .address_mode
                    .map_or_else(|| "unset".to_string(), |mode| mode.to_string())
            ),
        );
    }

    if let Some(mca_error) = event.mca_error.as_mut() {
        mca_error.meaning = meaning;
        mca_error.correction_report_filtering = None;
    }
    event.ucr_classification = Some(class);
    true
}
