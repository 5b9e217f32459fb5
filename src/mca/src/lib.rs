// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Decoder for Intel Machine-Check Architecture (MCA) events.
//!
//! Reconstructs the human-meaningful fields of a machine-check exception
//! from the raw `IA32_MCi_{STATUS,ADDR,MISC}` MSR values a hypervisor
//! kernel writes to its log: validity flags, the architectural error-code
//! grammar, UCR recoverability, the recoverable physical address, and the
//! per-family model-specific tables.
//!
//! Everything here is a pure function over integers and strings; decoding
//! holds no shared state and is safe to drive from any number of threads.
//! The three decoders are strictly layered: [`mcg_cap`] and [`cpuid`]
//! produce the capability record and Processor Signature that [`mce`]
//! consumes for each event.

/// Contains helper methods for bit operations.
pub mod bit_helper;

pub mod cpuid;
pub mod mcg_cap;
pub mod mce;

pub use crate::cpuid::ProcessorSignature;
pub use crate::mcg_cap::McgCap;
pub use crate::mce::{decode_event, DecodeContext, DecodedMcaEvent, EventInput};
