// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Record types produced by the machine-check event decoder.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cpuid::ProcessorSignature;
use crate::mcg_cap::McgCap;

/// The raw inputs of one machine-check event, as recovered from a kernel
/// log line.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInput {
    /// Ascending event number assigned by the stream processor.
    pub id: u64,
    /// Timestamp token of the log line, kept verbatim.
    pub timestamp: String,
    /// CPU that reported the event.
    pub cpu: u32,
    /// Error-reporting bank index.
    pub bank: u32,
    /// Raw IA32_MCi_STATUS.
    pub status: u64,
    /// Raw IA32_MCi_ADDR.
    pub addr: u64,
    /// Raw IA32_MCi_MISC.
    pub misc: u64,
}

/// Per-host inputs shared by every event decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeContext {
    /// Decoded IA32_MCG_CAP of the reporting host.
    pub capability: McgCap,
    /// Processor Signature of the reporting host, when known. Without it
    /// only the architectural (family-agnostic) decoding runs.
    pub signature: Option<ProcessorSignature>,
    /// Virtual MSR_ERROR_CONTROL[1]: extended iMC device/rank reporting.
    ///
    /// The platform the logs come from cannot expose the real MSR, so the
    /// caller supplies the assumed value. Defaults to set.
    pub error_control_ddr: bool,
}

impl DecodeContext {
    /// Creates a context with the default virtual MSR_ERROR_CONTROL[1] = 1.
    pub fn new(capability: McgCap, signature: Option<ProcessorSignature>) -> Self {
        DecodeContext {
            capability,
            signature,
            error_control_ddr: true,
        }
    }
}

/// Stable warning categories reported alongside decoded events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// VAL is clear: the bank holds no valid error.
    #[serde(rename = "status not valid")]
    StatusNotValid,
    /// A transaction-type sub-field holds a reserved encoding.
    #[serde(rename = "transaction type not found")]
    TransactionTypeNotFound,
    /// A request sub-field holds a reserved encoding.
    #[serde(rename = "request could not be identified")]
    RequestNotIdentified,
    /// status[15:0] matches neither a simple nor a compound pattern.
    #[serde(rename = "MCA error code could not be identified")]
    McaErrorCodeNotIdentified,
    /// The UC/EN/PCC/S/AR combination matches no UCR class.
    #[serde(rename = "UCR error classification could not be identified")]
    UcrClassNotIdentified,
    /// A family-specific table has no entry for a model-specific sub-code.
    #[serde(rename = "model-specific sub-code not found")]
    ModelSpecificSubCodeNotFound,
    /// An SRAO/SRAR error carries a non-physical recoverable address.
    #[serde(rename = "physical-address-mode expected for SRAO/SRAR")]
    PhysicalAddressModeExpected,
}

impl WarningKind {
    /// The stable category name.
    pub fn as_str(self) -> &'static str {
        match self {
            WarningKind::StatusNotValid => "status not valid",
            WarningKind::TransactionTypeNotFound => "transaction type not found",
            WarningKind::RequestNotIdentified => "request could not be identified",
            WarningKind::McaErrorCodeNotIdentified => "MCA error code could not be identified",
            WarningKind::UcrClassNotIdentified => {
                "UCR error classification could not be identified"
            }
            WarningKind::ModelSpecificSubCodeNotFound => "model-specific sub-code not found",
            WarningKind::PhysicalAddressModeExpected => {
                "physical-address-mode expected for SRAO/SRAR"
            }
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One decoding diagnostic. Warnings never abort a decode; they mark fields
/// the decoder had to leave unset or interpretations it could not verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Stable category.
    pub kind: WarningKind,
    /// Event-specific detail.
    pub detail: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Architectural validity bits of IA32_MCi_STATUS.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ValidityFlags {
    pub val: u8,
    pub over: u8,
    pub uc: u8,
    pub en: u8,
    pub miscv: u8,
    pub addrv: u8,
    pub pcc: u8,
}

/// Uncorrected-recoverable classification of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UcrClassification {
    /// Corrected error.
    #[serde(rename = "CE")]
    Ce,
    /// Uncorrected error.
    #[serde(rename = "UC")]
    Uc,
    /// Software recoverable action required.
    #[serde(rename = "SRAR")]
    Srar,
    /// Software recoverable action optional.
    #[serde(rename = "SRAO")]
    Srao,
    /// SRAO or uncorrected-no-action, not distinguishable from the status
    /// word alone.
    #[serde(rename = "SRAO/UCNA")]
    SraoUcna,
}

impl fmt::Display for UcrClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UcrClassification::Ce => "CE",
            UcrClassification::Uc => "UC",
            UcrClassification::Srar => "SRAR",
            UcrClassification::Srao => "SRAO",
            UcrClassification::SraoUcna => "SRAO/UCNA",
        };
        write!(f, "{text}")
    }
}

/// Recoverable-address mode from IA32_MCi_MISC[8:6].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressMode {
    /// Segment offset.
    SegmentOffset,
    /// Linear address.
    LinearAddress,
    /// Physical address.
    PhysicalAddress,
    /// Memory address.
    MemoryAddress,
    /// Generic.
    Generic,
    /// Reserved encoding.
    Reserved,
}

impl AddressMode {
    pub(crate) fn from_bits(bits: u64) -> Self {
        match bits {
            0b000 => AddressMode::SegmentOffset,
            0b001 => AddressMode::LinearAddress,
            0b010 => AddressMode::PhysicalAddress,
            0b011 => AddressMode::MemoryAddress,
            0b111 => AddressMode::Generic,
            _ => AddressMode::Reserved,
        }
    }
}

impl fmt::Display for AddressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AddressMode::SegmentOffset => "Segment Offset",
            AddressMode::LinearAddress => "Linear Address",
            AddressMode::PhysicalAddress => "Physical Address",
            AddressMode::MemoryAddress => "Memory Address",
            AddressMode::Generic => "Generic",
            AddressMode::Reserved => "Reserved",
        };
        write!(f, "{text}")
    }
}

/// Whether status[15:0] decoded as a simple or a compound error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum McaErrorKind {
    /// One of the fixed 16-bit encodings.
    Simple,
    /// A pattern with sub-fields.
    Compound,
}

/// The decoded MCA error-code block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McaErrorInfo {
    /// Simple or compound.
    #[serde(rename = "type")]
    pub kind: McaErrorKind,
    /// Raw status[15:0].
    pub code: u16,
    /// Error-class name, e.g. `Memory Controller Errors`.
    pub interpretation: String,
    /// Full reading including sub-fields, e.g.
    /// `Generic Cache Hierarchy / Level 2`.
    pub meaning: String,
    /// Correction report filtering, only for compound corrected errors that
    /// are not architecturally defined SRAO/SRAR events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction_report_filtering: Option<String>,
}

/// One name/value pair of a model-specific or other-information section.
///
/// Only these two sections are open-ended mappings; everything else on the
/// event is typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedField {
    /// Field name as the relevant decoding table spells it.
    pub name: String,
    /// Rendered value.
    pub value: String,
}

impl DecodedField {
    pub(crate) fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        DecodedField {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A fully decoded machine-check event.
///
/// Built once per input event and immutable after
/// [`decode_event`](crate::mce::decode_event) returns. When VAL is clear the
/// record carries only the identity fields and one warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMcaEvent {
    /// Ascending event number.
    pub id: u64,
    /// Log timestamp, verbatim.
    pub timestamp: String,
    /// Reporting CPU.
    pub cpu: u32,
    /// Reporting bank.
    pub bank: u32,
    /// Raw IA32_MCi_STATUS.
    pub status: u64,
    /// Raw IA32_MCi_MISC.
    pub misc: u64,
    /// Raw IA32_MCi_ADDR.
    pub addr: u64,
    /// Architectural validity bits; unset when VAL=0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<ValidityFlags>,
    /// Signaling bit (requires TES_P and SER_P).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u8>,
    /// Action-required bit (requires TES_P and SER_P).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ar: Option<u8>,
    /// Decoded MCA error code block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mca_error: Option<McaErrorInfo>,
    /// Model-specific error decode, in table order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub model_specific_errors: Vec<DecodedField>,
    /// Reserved / error-status / other-information decode, in table order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub reserved_error_status_other_information: Vec<DecodedField>,
    /// UCR classification, when SER_P reporting applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ucr_classification: Option<UcrClassification>,
    /// Recoverable-address mode (requires MISCV and SER_P).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_mode: Option<AddressMode>,
    /// Least significant valid recoverable-address bit (requires MISCV).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recoverable_address_lsb: Option<u8>,
    /// ADDR with the bits below the recoverable LSB cleared (requires ADDRV).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_valid: Option<u64>,
    /// Recoverable address in GiB, for memory-controller errors with ADDRV.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_gib: Option<String>,
    /// Whether a family-specific incremental decoder claimed the event.
    pub incremental_decoded: bool,
    /// Decoding diagnostics.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<Warning>,
}

impl DecodedMcaEvent {
    /// Creates a record holding only the identity of `input`.
    pub(crate) fn new(input: &EventInput) -> Self {
        DecodedMcaEvent {
            id: input.id,
            timestamp: input.timestamp.clone(),
            cpu: input.cpu,
            bank: input.bank,
            status: input.status,
            misc: input.misc,
            addr: input.addr,
            flags: None,
            s: None,
            ar: None,
            mca_error: None,
            model_specific_errors: Vec::new(),
            reserved_error_status_other_information: Vec::new(),
            ucr_classification: None,
            address_mode: None,
            recoverable_address_lsb: None,
            address_valid: None,
            address_gib: None,
            incremental_decoded: false,
            warnings: Vec::new(),
        }
    }

    /// Records a diagnostic on the event and mirrors it to the log.
    pub(crate) fn warn(&mut self, kind: WarningKind, detail: impl Into<String>) {
        let warning = Warning {
            kind,
            detail: detail.into(),
        };
        log::warn!("event {}: {}", self.id, warning);
        self.warnings.push(warning);
    }

    /// Whether any warning of the given category was recorded.
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}
