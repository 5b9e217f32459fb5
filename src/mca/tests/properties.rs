// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Property tests over the decoder's universal guarantees.

use mca::bit_helper::{BitHelper, BitRange};
use mca::cpuid::{self, CpuidLeaves, Leaf};
use mca::mce::{self, DecodeContext, EventInput, WarningKind};
use mca::McgCap;
use proptest::prelude::*;

fn arbitrary_context() -> impl Strategy<Value = DecodeContext> {
    (any::<u64>(), proptest::option::of(0u32..=0x20), any::<bool>()).prop_map(
        |(cap, model, error_control_ddr)| {
            let signature =
                model.map(|model| format!("06_{model:02X}H").parse().unwrap());
            let mut ctx = DecodeContext::new(McgCap::decode(cap), signature);
            ctx.error_control_ddr = error_control_ddr;
            ctx
        },
    )
}

proptest! {
    /// Extracting `[hi:lo]` equals the shift-and-mask arithmetic.
    #[test]
    fn slice_symmetry(word in any::<u64>(), hi in 0u32..64, width in 0u32..64) {
        let lo = hi.saturating_sub(width);
        let range = BitRange { msb_index: hi, lsb_index: lo };
        let expected = (word >> lo)
            & (((1u128 << (hi - lo + 1)) - 1) as u64);
        prop_assert_eq!(word.read_bits_in_range(&range), expected);
    }

    /// Decoding and re-encoding MCG_CAP reproduces the defined low bits;
    /// the EXT_CNT byte only survives when EXT_P is set.
    #[test]
    fn mcg_cap_round_trip(raw in any::<u64>()) {
        let cap = McgCap::decode(raw);
        let mut defined = raw & 0x0FFF_0FFF;
        if !cap.ext_p {
            defined &= !0x00FF_0000;
        }
        prop_assert_eq!(cap.encode(), defined);
        // Re-decoding the encoding is a fixed point.
        prop_assert_eq!(McgCap::decode(cap.encode()), cap);
    }

    /// The Processor Signature depends on leaf 01H EAX alone.
    #[test]
    fn processor_signature_determinism(
        eax in any::<u32>(),
        ebx in any::<u32>(),
        ecx in any::<u32>(),
        edx in any::<u32>(),
    ) {
        let leaves = CpuidLeaves {
            leaf_01h: Some(Leaf { eax, ebx, ecx, edx }),
            ..Default::default()
        };
        let bare = CpuidLeaves {
            leaf_01h: Some(Leaf { eax, ebx: 0, ecx: 0, edx: 0 }),
            ..Default::default()
        };
        prop_assert_eq!(
            cpuid::decode(&leaves).processor_signature,
            cpuid::decode(&bare).processor_signature
        );
        prop_assert_eq!(
            cpuid::decode(&leaves).processor_signature.unwrap(),
            cpuid::processor_signature(eax)
        );
    }

    /// With VAL clear the output carries identity and one warning, nothing
    /// else.
    #[test]
    fn validity_gating(
        status in any::<u64>().prop_map(|s| s & !(1u64 << 63)),
        addr in any::<u64>(),
        misc in any::<u64>(),
        ctx in arbitrary_context(),
    ) {
        let input = EventInput {
            id: 7,
            timestamp: "t".to_string(),
            cpu: 0,
            bank: 0,
            status,
            addr,
            misc,
        };
        let event = mce::decode_event(&ctx, &input);
        prop_assert_eq!(event.flags, None);
        prop_assert_eq!(event.mca_error, None);
        prop_assert!(event.model_specific_errors.is_empty());
        prop_assert!(event.reserved_error_status_other_information.is_empty());
        prop_assert_eq!(event.warnings.len(), 1);
        prop_assert_eq!(event.warnings[0].kind, WarningKind::StatusNotValid);
    }

    /// SRAO/SRAR classes only coexist with a physical address mode or an
    /// explicit advisory warning; architectural overrides never carry a
    /// correction-report-filtering value. The GiB rendering appears exactly
    /// for memory-controller codes with ADDRV.
    #[test]
    fn ucr_and_gib_invariants(
        status in any::<u64>().prop_map(|s| s | (1u64 << 63)),
        addr in any::<u64>(),
        misc in any::<u64>(),
        ctx in arbitrary_context(),
    ) {
        let input = EventInput {
            id: 7,
            timestamp: "t".to_string(),
            cpu: 0,
            bank: 0,
            status,
            addr,
            misc,
        };
        let event = mce::decode_event(&ctx, &input);

        if let Some(mca_error) = &event.mca_error {
            if mca_error.meaning.starts_with("Architecturally Defined") {
                prop_assert_eq!(&mca_error.correction_report_filtering, &None);
                let physical = event.address_mode
                    == Some(mce::AddressMode::PhysicalAddress);
                prop_assert!(
                    physical
                        || event.has_warning(WarningKind::PhysicalAddressModeExpected)
                );
            }

            let memory_controller = mca_error.interpretation == "Memory Controller Errors";
            let addrv = event.flags.map_or(0, |f| f.addrv) == 1;
            prop_assert_eq!(event.address_gib.is_some(), memory_controller && addrv);
        }

        // MISCV gates the recoverable-address fields.
        if event.flags.map_or(0, |f| f.miscv) == 0 {
            prop_assert_eq!(event.address_mode, None);
            prop_assert_eq!(event.recoverable_address_lsb, None);
        }
    }
}
