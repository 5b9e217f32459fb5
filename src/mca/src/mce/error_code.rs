// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The architectural MCA error-code grammar over IA32_MCi_STATUS[15:0].
//!
//! A code is either one of the fixed simple encodings or a compound pattern
//! whose sub-fields (transaction type, hierarchy level, request, channel,
//! participation) each decode through a fixed enumeration. Reserved sub-field
//! encodings degrade to a warning, never to a failed decode; only a code that
//! matches no pattern at all is unidentifiable.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mce::event::{Warning, WarningKind};

/// The fixed simple error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimpleErrorCode {
    /// No error has been reported.
    NoError,
    /// Unclassified error.
    Unclassified,
    /// Microcode ROM parity error.
    MicrocodeRomParity,
    /// External error (BINIT# from another processor).
    External,
    /// Functional redundancy check error.
    Frc,
    /// Internal parity error.
    InternalParity,
    /// SMM handler code access violation.
    SmmHandlerCodeAccessViolation,
    /// Internal timer error.
    InternalTimer,
    /// I/O error.
    Io,
    /// Internal unclassified error (any model-specific low bits set).
    InternalUnclassified,
}

impl SimpleErrorCode {
    /// The error-class name.
    pub fn interpretation(self) -> &'static str {
        match self {
            SimpleErrorCode::NoError => "No Error",
            SimpleErrorCode::Unclassified => "Unclassified",
            SimpleErrorCode::MicrocodeRomParity => "Microcode ROM Parity Error",
            SimpleErrorCode::External => "External Error",
            SimpleErrorCode::Frc => "FRC Error",
            SimpleErrorCode::InternalParity => "Internal Parity Error",
            SimpleErrorCode::SmmHandlerCodeAccessViolation => {
                "SMM Handler Code Access Violation"
            }
            SimpleErrorCode::InternalTimer => "Internal Timer Error",
            SimpleErrorCode::Io => "I/O Error",
            SimpleErrorCode::InternalUnclassified => "Internal Unclassified",
        }
    }
}

/// TT: transaction type, two bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    /// Instruction.
    Instruction,
    /// Data.
    Data,
    /// Generic.
    Generic,
}

impl TransactionType {
    fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0b00 => Some(TransactionType::Instruction),
            0b01 => Some(TransactionType::Data),
            0b10 => Some(TransactionType::Generic),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TransactionType::Instruction => "Instruction",
            TransactionType::Data => "Data",
            TransactionType::Generic => "Generic",
        };
        write!(f, "{text}")
    }
}

/// LL: memory hierarchy level, two bits. All four encodings are defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheLevel {
    /// Level 0.
    L0,
    /// Level 1.
    L1,
    /// Level 2.
    L2,
    /// Generic level.
    Generic,
}

impl CacheLevel {
    fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0b00 => CacheLevel::L0,
            0b01 => CacheLevel::L1,
            0b10 => CacheLevel::L2,
            _ => CacheLevel::Generic,
        }
    }
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CacheLevel::L0 => "Level 0",
            CacheLevel::L1 => "Level 1",
            CacheLevel::L2 => "Level 2",
            CacheLevel::Generic => "Generic Level",
        };
        write!(f, "{text}")
    }
}

/// MMM: memory transaction type, three bits; encodings 5 to 7 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryTransaction {
    /// Generic undefined request.
    Generic,
    /// Memory read.
    Read,
    /// Memory write.
    Write,
    /// Address/Command error.
    AddressCommand,
    /// Memory scrubbing.
    Scrub,
}

impl MemoryTransaction {
    fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0b000 => Some(MemoryTransaction::Generic),
            0b001 => Some(MemoryTransaction::Read),
            0b010 => Some(MemoryTransaction::Write),
            0b011 => Some(MemoryTransaction::AddressCommand),
            0b100 => Some(MemoryTransaction::Scrub),
            _ => None,
        }
    }
}

impl fmt::Display for MemoryTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MemoryTransaction::Generic => "Generic undefined request",
            MemoryTransaction::Read => "Memory read error",
            MemoryTransaction::Write => "Memory write error",
            MemoryTransaction::AddressCommand => "Address/Command error",
            MemoryTransaction::Scrub => "Memory scrubbing error",
        };
        write!(f, "{text}")
    }
}

/// RRRR: request type, four bits; encodings above 8 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    /// Generic error.
    Err,
    /// Generic read.
    Read,
    /// Generic write.
    Write,
    /// Data read.
    DataRead,
    /// Data write.
    DataWrite,
    /// Instruction fetch.
    InstructionFetch,
    /// Prefetch.
    Prefetch,
    /// Eviction.
    Eviction,
    /// Snoop.
    Snoop,
}

impl RequestType {
    fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0b0000 => Some(RequestType::Err),
            0b0001 => Some(RequestType::Read),
            0b0010 => Some(RequestType::Write),
            0b0011 => Some(RequestType::DataRead),
            0b0100 => Some(RequestType::DataWrite),
            0b0101 => Some(RequestType::InstructionFetch),
            0b0110 => Some(RequestType::Prefetch),
            0b0111 => Some(RequestType::Eviction),
            0b1000 => Some(RequestType::Snoop),
            _ => None,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RequestType::Err => "Generic error",
            RequestType::Read => "Generic read",
            RequestType::Write => "Generic write",
            RequestType::DataRead => "Data read",
            RequestType::DataWrite => "Data write",
            RequestType::InstructionFetch => "Instruction fetch",
            RequestType::Prefetch => "Prefetch",
            RequestType::Eviction => "Eviction",
            RequestType::Snoop => "Snoop",
        };
        write!(f, "{text}")
    }
}

/// PP: participation of the local processor, two bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Participation {
    /// Local processor originated the request.
    Originated,
    /// Local processor responded to the request.
    Responded,
    /// Local processor observed the error as a third party.
    Observed,
    /// Generic.
    Generic,
}

impl Participation {
    fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0b00 => Participation::Originated,
            0b01 => Participation::Responded,
            0b10 => Participation::Observed,
            _ => Participation::Generic,
        }
    }
}

impl fmt::Display for Participation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Participation::Originated => "Local processor originated request",
            Participation::Responded => "Local processor responded to request",
            Participation::Observed => "Local processor observed error as third party",
            Participation::Generic => "Generic participation",
        };
        write!(f, "{text}")
    }
}

/// T: request timeout, one bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeout {
    /// The request did not time out.
    NoTimeout,
    /// The request timed out.
    Timeout,
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Timeout::NoTimeout => "Request did not time out",
            Timeout::Timeout => "Request timed out",
        };
        write!(f, "{text}")
    }
}

/// II: memory or I/O, two bits; encoding 01 is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryIo {
    /// Memory access.
    Memory,
    /// I/O access.
    Io,
    /// Other transaction.
    Other,
}

impl MemoryIo {
    fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0b00 => Some(MemoryIo::Memory),
            0b10 => Some(MemoryIo::Io),
            0b11 => Some(MemoryIo::Other),
            _ => None,
        }
    }
}

impl fmt::Display for MemoryIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MemoryIo::Memory => "Memory access",
            MemoryIo::Io => "I/O access",
            MemoryIo::Other => "Other transaction",
        };
        write!(f, "{text}")
    }
}

/// Renders a memory-controller channel nibble; 15 means not specified.
pub fn channel_name(channel: u8) -> String {
    if channel == 0xF {
        "channel not specified".to_string()
    } else {
        format!("channel {channel}")
    }
}

/// A compound error code with its decoded sub-fields. Sub-fields with
/// reserved encodings are `None` and carry a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompoundErrorCode {
    /// `000F 0000 0000 11LL`
    GenericCacheHierarchy {
        /// LL.
        level: CacheLevel,
    },
    /// `000F 0000 0001 TTLL`
    Tlb {
        /// TT.
        transaction: Option<TransactionType>,
        /// LL.
        level: CacheLevel,
    },
    /// `000F 0000 1MMM CCCC`
    MemoryController {
        /// MMM.
        transaction: Option<MemoryTransaction>,
        /// CCCC; 15 means the channel is not specified.
        channel: u8,
    },
    /// `000F 0001 RRRR TTLL`
    CacheHierarchy {
        /// RRRR.
        request: Option<RequestType>,
        /// TT.
        transaction: Option<TransactionType>,
        /// LL.
        level: CacheLevel,
    },
    /// `000F 1PPT RRRR IILL`
    BusInterconnect {
        /// PP.
        participation: Participation,
        /// T.
        timeout: Timeout,
        /// RRRR.
        request: Option<RequestType>,
        /// II.
        memory_io: Option<MemoryIo>,
        /// LL.
        level: CacheLevel,
    },
}

impl CompoundErrorCode {
    /// The error-class name.
    pub fn interpretation(&self) -> &'static str {
        match self {
            CompoundErrorCode::GenericCacheHierarchy { .. } => "Generic Cache Hierarchy",
            CompoundErrorCode::Tlb { .. } => "TLB Errors",
            CompoundErrorCode::MemoryController { .. } => "Memory Controller Errors",
            CompoundErrorCode::CacheHierarchy { .. } => "Cache Hierarchy Errors",
            CompoundErrorCode::BusInterconnect { .. } => "Bus and Interconnect Errors",
        }
    }

    /// The full reading, class plus sub-fields.
    pub fn meaning(&self) -> String {
        fn or_unknown<T: fmt::Display>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map_or_else(|| "unknown".to_string(), ToString::to_string)
        }

        match self {
            CompoundErrorCode::GenericCacheHierarchy { level } => {
                format!("Generic Cache Hierarchy / {level}")
            }
            CompoundErrorCode::Tlb { transaction, level } => {
                format!("TLB Errors / {} / {level}", or_unknown(transaction))
            }
            CompoundErrorCode::MemoryController {
                transaction,
                channel,
            } => format!(
                "Memory Controller Errors / {} / {}",
                or_unknown(transaction),
                channel_name(*channel)
            ),
            CompoundErrorCode::CacheHierarchy {
                request,
                transaction,
                level,
            } => format!(
                "Cache Hierarchy Errors / {} / {} / {level}",
                or_unknown(request),
                or_unknown(transaction)
            ),
            CompoundErrorCode::BusInterconnect {
                participation,
                timeout,
                request,
                memory_io,
                level,
            } => format!(
                "Bus and Interconnect Errors / {participation} / {} / {} / {level} / {timeout}",
                or_unknown(request),
                or_unknown(memory_io)
            ),
        }
    }
}

/// A fully classified MCA error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum McaErrorCode {
    /// One of the fixed encodings.
    Simple(SimpleErrorCode),
    /// A compound pattern.
    Compound {
        /// The F bit (position 12). Interpretation is deferred: it only
        /// means correction-report filtering for corrected, non-SRAO/SRAR
        /// events.
        filtered: bool,
        /// The decoded pattern.
        compound: CompoundErrorCode,
    },
}

impl McaErrorCode {
    /// The error-class name.
    pub fn interpretation(&self) -> &'static str {
        match self {
            McaErrorCode::Simple(simple) => simple.interpretation(),
            McaErrorCode::Compound { compound, .. } => compound.interpretation(),
        }
    }

    /// The full reading.
    pub fn meaning(&self) -> String {
        match self {
            McaErrorCode::Simple(simple) => simple.interpretation().to_string(),
            McaErrorCode::Compound { compound, .. } => compound.meaning(),
        }
    }

    /// The compound pattern, when this is a compound code.
    pub fn compound(&self) -> Option<&CompoundErrorCode> {
        match self {
            McaErrorCode::Simple(_) => None,
            McaErrorCode::Compound { compound, .. } => Some(compound),
        }
    }
}

/// Classifies status[15:0].
///
/// Simple encodings are matched first; `0x0E0B` (I/O error) would otherwise
/// also satisfy the bus-and-interconnect mask. Returns `None`, with a
/// warning, for a code outside the grammar.
pub fn parse(code: u16) -> (Option<McaErrorCode>, Vec<Warning>) {
    let mut warnings = Vec::new();

    if let Some(simple) = parse_simple(code) {
        return (Some(McaErrorCode::Simple(simple)), warnings);
    }

    let filtered = code & (1 << 12) != 0;
    let level = CacheLevel::from_bits(code & 0b11);

    let compound = if code & 0xEFFC == 0x000C {
        Some(CompoundErrorCode::GenericCacheHierarchy { level })
    } else if code & 0xEFF0 == 0x0010 {
        Some(CompoundErrorCode::Tlb {
            transaction: transaction_type(code, &mut warnings),
            level,
        })
    } else if code & 0xEF80 == 0x0080 {
        let bits = (code >> 4) & 0b111;
        let transaction = MemoryTransaction::from_bits(bits);
        if transaction.is_none() {
            warnings.push(Warning {
                kind: WarningKind::TransactionTypeNotFound,
                detail: format!("reserved memory transaction type {bits:#05b}"),
            });
        }
        Some(CompoundErrorCode::MemoryController {
            transaction,
            channel: (code & 0xF) as u8,
        })
    } else if code & 0xEF00 == 0x0100 {
        Some(CompoundErrorCode::CacheHierarchy {
            request: request_type(code, &mut warnings),
            transaction: transaction_type(code, &mut warnings),
            level,
        })
    } else if code & 0xE800 == 0x0800 {
        let ii_bits = (code >> 2) & 0b11;
        let memory_io = MemoryIo::from_bits(ii_bits);
        if memory_io.is_none() {
            warnings.push(Warning {
                kind: WarningKind::RequestNotIdentified,
                detail: format!("reserved memory/IO participation {ii_bits:#04b}"),
            });
        }
        Some(CompoundErrorCode::BusInterconnect {
            participation: Participation::from_bits((code >> 9) & 0b11),
            timeout: if code & (1 << 8) != 0 {
                Timeout::Timeout
            } else {
                Timeout::NoTimeout
            },
            request: request_type(code, &mut warnings),
            memory_io,
            level,
        })
    } else {
        warnings.push(Warning {
            kind: WarningKind::McaErrorCodeNotIdentified,
            detail: format!("status[15:0] = {code:#06x}"),
        });
        None
    };

    (
        compound.map(|compound| McaErrorCode::Compound { filtered, compound }),
        warnings,
    )
}

fn parse_simple(code: u16) -> Option<SimpleErrorCode> {
    match code {
        0x0000 => Some(SimpleErrorCode::NoError),
        0x0001 => Some(SimpleErrorCode::Unclassified),
        0x0002 => Some(SimpleErrorCode::MicrocodeRomParity),
        0x0003 => Some(SimpleErrorCode::External),
        0x0004 => Some(SimpleErrorCode::Frc),
        0x0005 => Some(SimpleErrorCode::InternalParity),
        0x0006 => Some(SimpleErrorCode::SmmHandlerCodeAccessViolation),
        0x0400 => Some(SimpleErrorCode::InternalTimer),
        0x0E0B => Some(SimpleErrorCode::Io),
        c if c & 0xFC00 == 0x0400 && c & 0x03FF != 0 => {
            Some(SimpleErrorCode::InternalUnclassified)
        }
        _ => None,
    }
}

fn transaction_type(code: u16, warnings: &mut Vec<Warning>) -> Option<TransactionType> {
    let bits = (code >> 2) & 0b11;
    let transaction = TransactionType::from_bits(bits);
    if transaction.is_none() {
        warnings.push(Warning {
            kind: WarningKind::TransactionTypeNotFound,
            detail: format!("reserved transaction type {bits:#04b}"),
        });
    }
    transaction
}

fn request_type(code: u16, warnings: &mut Vec<Warning>) -> Option<RequestType> {
    let bits = (code >> 4) & 0xF;
    let request = RequestType::from_bits(bits);
    if request.is_none() {
        warnings.push(Warning {
            kind: WarningKind::RequestNotIdentified,
            detail: format!("reserved request type {bits:#06b}"),
        });
    }
    request
}
