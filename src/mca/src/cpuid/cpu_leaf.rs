// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

// Basic CPUID Information
pub mod leaf_0x1 {
    pub mod eax {
        use crate::bit_helper::BitRange;

        pub const STEPPING_ID: BitRange = BitRange {
            msb_index: 3,
            lsb_index: 0,
        };
        pub const PROCESSOR_MODEL: BitRange = BitRange {
            msb_index: 7,
            lsb_index: 4,
        };
        pub const PROCESSOR_FAMILY: BitRange = BitRange {
            msb_index: 11,
            lsb_index: 8,
        };
        pub const PROCESSOR_TYPE: BitRange = BitRange {
            msb_index: 13,
            lsb_index: 12,
        };
        pub const EXTENDED_PROCESSOR_MODEL: BitRange = BitRange {
            msb_index: 19,
            lsb_index: 16,
        };
        pub const EXTENDED_FAMILY_ID: BitRange = BitRange {
            msb_index: 27,
            lsb_index: 20,
        };
    }

    pub mod ebx {
        use crate::bit_helper::BitRange;

        pub const BRAND_INDEX: BitRange = BitRange {
            msb_index: 7,
            lsb_index: 0,
        };
        // Value * 8 = cache line size in bytes.
        pub const CLFLUSH_SIZE: BitRange = BitRange {
            msb_index: 15,
            lsb_index: 8,
        };
        // Only valid while CPUID.1.EDX.HTT = 1.
        pub const MAX_ADDRESSABLE_IDS: BitRange = BitRange {
            msb_index: 23,
            lsb_index: 16,
        };
        pub const INITIAL_APIC_ID: BitRange = BitRange {
            msb_index: 31,
            lsb_index: 24,
        };
    }

    pub mod edx {
        pub const HTT_SHIFT: u32 = 28; // Max APIC IDs reserved field is valid
    }
}

// Extended Function CPUID Information
pub mod leaf_0x80000001 {
    pub mod ecx {
        pub const LAHF_SAHF_SHIFT: u32 = 0;
        pub const LZCNT_SHIFT: u32 = 5;
        pub const PREFETCHW_SHIFT: u32 = 8;
    }

    pub mod edx {
        pub const SYSCALL_SYSRET_SHIFT: u32 = 11;
        pub const XD_SHIFT: u32 = 20;
        pub const GBPAGE_SHIFT: u32 = 26;
        pub const RDTSCP_SHIFT: u32 = 27;
        pub const INTEL64_SHIFT: u32 = 29;
    }
}

pub mod leaf_0x80000008 {
    pub mod eax {
        use crate::bit_helper::BitRange;

        pub const PHYSICAL_ADDRESS_BITS: BitRange = BitRange {
            msb_index: 7,
            lsb_index: 0,
        };
        pub const LINEAR_ADDRESS_BITS: BitRange = BitRange {
            msb_index: 15,
            lsb_index: 8,
        };
    }
}
