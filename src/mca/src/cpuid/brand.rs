// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Brand identification table for CPUID.01H EBX[7:0].

/// Returns the brand string for a brand index.
///
/// Three table entries are overridden when the full 32-bit signature in EAX
/// matches exactly; the override must not trigger on a Family/Model match
/// alone.
pub fn brand_string(brand_index: u8, eax: u32) -> &'static str {
    match (brand_index, eax) {
        (0x00, _) => "This processor does not support the brand identification feature",
        (0x01, _) => "Intel(R) Celeron(R) processor",
        (0x02, _) => "Intel(R) Pentium(R) III processor",
        (0x03, 0x0000_06B1) => "Intel(R) Celeron(R) processor",
        (0x03, _) => "Intel(R) Pentium(R) III Xeon(R) processor",
        (0x04, _) => "Intel(R) Pentium(R) III processor",
        (0x06, _) => "Mobile Intel(R) Pentium(R) III processor-M",
        (0x07, _) => "Mobile Intel(R) Celeron(R) processor",
        (0x08, _) => "Intel(R) Pentium(R) 4 processor",
        (0x09, _) => "Intel(R) Pentium(R) 4 processor",
        (0x0A, _) => "Intel(R) Celeron(R) processor",
        (0x0B, 0x0000_0F13) => "Intel(R) Xeon(R) processor MP",
        (0x0B, _) => "Intel(R) Xeon(R) processor",
        (0x0C, _) => "Intel(R) Xeon(R) processor MP",
        (0x0E, 0x0000_0F13) => "Intel(R) Xeon(R) processor",
        (0x0E, _) => "Mobile Intel(R) Pentium(R) 4 processor-M",
        (0x0F, _) => "Mobile Intel(R) Celeron(R) processor",
        (0x11, _) => "Mobile Genuine Intel(R) processor",
        (0x12, _) => "Intel(R) Celeron(R) M processor",
        (0x13, _) => "Mobile Intel(R) Celeron(R) processor",
        (0x14, _) => "Intel(R) Celeron(R) processor",
        (0x15, _) => "Mobile Genuine Intel(R) processor",
        (0x16, _) => "Intel(R) Pentium(R) M processor",
        (0x17, _) => "Mobile Intel(R) Celeron(R) processor",
        _ => "Reserved",
    }
}
