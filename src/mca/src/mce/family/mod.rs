// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Family-specific incremental decoding.
//!
//! After the architectural decode, events are offered to the decoder
//! registered for the host's Processor Signature. A decoder may redefine
//! the MCA error-code reading and replaces the model-specific and
//! other-information sections wholesale, so stale architectural values
//! never coexist with family-specific ones. Unknown sub-codes degrade to
//! warnings.

use crate::bit_helper::*;
use crate::cpuid::ProcessorSignature;
use crate::mce::error_code::McaErrorCode;
use crate::mce::event::{DecodedField, DecodedMcaEvent, McaErrorInfo, McaErrorKind, WarningKind};

mod broadwell;
mod core2;
mod goldmont;
mod haswell;
mod ivy_bridge;
mod nehalem;
mod netburst;
mod p6;
mod sandy_bridge;
mod skylake;

/// Inputs shared by every family decoder, beyond the event itself.
pub(crate) struct FamilyCtx {
    /// Parsed Processor Signature of the host.
    pub signature: ProcessorSignature,
    /// The generic error-code classification, when one was found.
    pub code: Option<McaErrorCode>,
    /// Virtual MSR_ERROR_CONTROL[1]: extended iMC device/rank reporting.
    pub error_control_ddr: bool,
}

/// One family's incremental decoder.
pub(crate) trait FamilyDecoder {
    /// Applies the family's decoding. Returns `true` when the event was
    /// claimed (even partially); the caller then marks it incrementally
    /// decoded.
    fn decode(&self, ctx: &FamilyCtx, event: &mut DecodedMcaEvent) -> bool;
}

/// Resolves the incremental decoder for a Processor Signature.
pub(crate) fn family_decoder(
    signature: ProcessorSignature,
) -> Option<&'static dyn FamilyDecoder> {
    match (signature.family, signature.model) {
        (0x06, 0x01 | 0x03 | 0x05 | 0x07 | 0x08 | 0x09 | 0x0A | 0x0B | 0x0D | 0x0E) => {
            Some(&p6::P6Decoder)
        }
        (0x06, 0x0F | 0x17 | 0x1D) => Some(&core2::Core2Decoder),
        (0x06, 0x1A) => Some(&nehalem::NehalemDecoder),
        (0x06, 0x2D) => Some(&sandy_bridge::SandyBridgeDecoder),
        (0x06, 0x3E) => Some(&ivy_bridge::IvyBridgeDecoder),
        (0x06, 0x3F) => Some(&haswell::HaswellDecoder),
        (0x06, 0x4F | 0x56) => Some(&broadwell::BroadwellDecoder),
        (0x06, 0x55) => Some(&skylake::SkylakeDecoder),
        (0x06, 0x5F) => Some(&goldmont::GoldmontDecoder),
        (0x0F, _) => Some(&netburst::NetburstDecoder),
        _ => None,
    }
}

/// The model-specific error code, IA32_MCi_STATUS[31:16].
pub(super) fn mscod(status: u64) -> u16 {
    status.read_bits_in_range(&bit_range!(31, 16)) as u16
}

/// Looks up `code` in a value table, recording a warning on a miss.
pub(super) fn lookup_code(
    table: &[(u16, &'static str)],
    code: u16,
    what: &str,
    event: &mut DecodedMcaEvent,
) -> Option<&'static str> {
    let found = table.iter().find(|(c, _)| *c == code).map(|(_, name)| *name);
    if found.is_none() {
        event.warn(
            WarningKind::ModelSpecificSubCodeNotFound,
            format!("{what} {code:#06x}"),
        );
    }
    found
}

/// Replaces the model-specific section.
pub(super) fn replace_model_specific(event: &mut DecodedMcaEvent, fields: Vec<DecodedField>) {
    event.model_specific_errors = fields;
}

/// Replaces the reserved/other-information section.
pub(super) fn replace_other_information(event: &mut DecodedMcaEvent, fields: Vec<DecodedField>) {
    event.reserved_error_status_other_information = fields;
}

/// Redefines the error-code reading, creating the block when the generic
/// grammar could not classify the code. The correction-report-filtering
/// value never survives a redefinition.
pub(super) fn redefine_error(
    event: &mut DecodedMcaEvent,
    interpretation: &str,
    meaning: String,
) {
    let code = (event.status & 0xFFFF) as u16;
    let mca_error = event.mca_error.get_or_insert_with(|| McaErrorInfo {
        kind: McaErrorKind::Simple,
        code,
        interpretation: String::new(),
        meaning: String::new(),
        correction_report_filtering: None,
    });
    mca_error.interpretation = interpretation.to_string();
    mca_error.meaning = meaning;
    mca_error.correction_report_filtering = None;
}

/// Renders a status bit as a named flag field.
pub(super) fn bit_field(status: u64, pos: u32, name: &'static str) -> DecodedField {
    DecodedField::new(name, (status.read_bit(pos) as u8).to_string())
}
