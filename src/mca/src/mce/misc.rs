// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Recoverable-address decoding from IA32_MCi_MISC and IA32_MCi_ADDR.

use crate::bit_helper::*;
use crate::mce::event::{AddressMode, DecodedMcaEvent};
use crate::mcg_cap::McgCap;

/// Decodes the address mode and recoverable-address LSB. Requires MISCV;
/// the field layout is only architectural when SER_P is set.
pub(crate) fn decode_misc(cap: &McgCap, event: &mut DecodedMcaEvent) {
    if event.flags.map_or(0, |f| f.miscv) == 0 || !cap.ser_p {
        return;
    }

    let misc = event.misc;
    event.address_mode = Some(AddressMode::from_bits(
        misc.read_bits_in_range(&bit_range!(8, 6)),
    ));
    event.recoverable_address_lsb =
        Some(misc.read_bits_in_range(&bit_range!(5, 0)) as u8);
}

/// Computes the usable recoverable address: ADDR with every bit below the
/// recoverable LSB cleared. Requires ADDRV and a nonzero LSB.
pub(crate) fn compute_address_valid(event: &mut DecodedMcaEvent) {
    if event.flags.map_or(0, |f| f.addrv) == 0 {
        return;
    }
    match event.recoverable_address_lsb {
        Some(lsb) if lsb > 0 => {
            event.address_valid = Some(event.addr & !((1_u64 << lsb) - 1));
        }
        _ => {}
    }
}

/// Renders the recoverable address in GiB with two fractional digits,
/// falling back to the raw ADDR when no masked address was computed.
pub(crate) fn address_gib(event: &DecodedMcaEvent) -> String {
    let base = event.address_valid.unwrap_or(event.addr);
    format!("{:.2}", base as f64 / f64::from(1 << 30))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mce::event::{EventInput, ValidityFlags};

    fn event(misc: u64, addr: u64, miscv: u8, addrv: u8) -> DecodedMcaEvent {
        let mut event = DecodedMcaEvent::new(&EventInput {
            misc,
            addr,
            ..Default::default()
        });
        event.flags = Some(ValidityFlags {
            val: 1,
            miscv,
            addrv,
            ..Default::default()
        });
        event
    }

    const SER_CAP: u64 = 0x0100_1C09;

    #[test]
    fn test_decode_misc_physical_mode() {
        let mut event = event((0b010 << 6) | 6, 0x1_2345_6789, 1, 1);
        decode_misc(&McgCap::decode(SER_CAP), &mut event);
        assert_eq!(event.address_mode, Some(AddressMode::PhysicalAddress));
        assert_eq!(event.recoverable_address_lsb, Some(6));
    }

    #[test]
    fn test_decode_misc_requires_miscv() {
        let mut event = event((0b010 << 6) | 6, 0, 0, 0);
        decode_misc(&McgCap::decode(SER_CAP), &mut event);
        assert_eq!(event.address_mode, None);
        assert_eq!(event.recoverable_address_lsb, None);
    }

    #[test]
    fn test_decode_misc_requires_ser_p() {
        let mut event = event((0b010 << 6) | 6, 0, 1, 1);
        decode_misc(&McgCap::decode(0x1C09), &mut event);
        assert_eq!(event.address_mode, None);
    }

    #[test]
    fn test_reserved_address_mode() {
        let mut event = event(0b101 << 6, 0, 1, 0);
        decode_misc(&McgCap::decode(SER_CAP), &mut event);
        assert_eq!(event.address_mode, Some(AddressMode::Reserved));
    }

    #[test]
    fn test_address_valid_masks_low_bits() {
        let mut event = event((0b010 << 6) | 6, 0x1_2345_6789, 1, 1);
        decode_misc(&McgCap::decode(SER_CAP), &mut event);
        compute_address_valid(&mut event);
        assert_eq!(event.address_valid, Some(0x1_2345_6740));
    }

    #[test]
    fn test_address_valid_requires_addrv_and_lsb() {
        let mut event_a = event((0b010 << 6) | 6, 0x1000, 1, 0);
        decode_misc(&McgCap::decode(SER_CAP), &mut event_a);
        compute_address_valid(&mut event_a);
        assert_eq!(event_a.address_valid, None);

        let mut event_b = event(0b010 << 6, 0x1000, 1, 1);
        decode_misc(&McgCap::decode(SER_CAP), &mut event_b);
        compute_address_valid(&mut event_b);
        assert_eq!(event_b.address_valid, None);
    }

    #[test]
    fn test_address_gib_formatting() {
        let mut event = event((0b010 << 6) | 6, 0x1_2345_6789, 1, 1);
        decode_misc(&McgCap::decode(SER_CAP), &mut event);
        compute_address_valid(&mut event);
        // 0x123456740 / 2^30 = 4.5510...
        assert_eq!(address_gib(&event), "4.55");
    }

    #[test]
    fn test_address_gib_falls_back_to_addr() {
        let event = event(0, 3 << 30, 0, 1);
        assert_eq!(address_gib(&event), "3.00");
    }
}
