// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental decoding for Skylake-SP (06_55H).
//!
//! Bank 4 is the PCU/UBOX complex with a second-level model-specific code,
//! banks 5, 12 and 19 the UPI links, banks 7 and 8 the M2M mesh-to-memory
//! blocks, banks 13 through 16 the integrated memory controller.

use crate::bit_helper::*;
use crate::mce::event::{DecodedField, DecodedMcaEvent};
use crate::mce::family::{
    bit_field, haswell, lookup_code, mscod, replace_model_specific, FamilyCtx, FamilyDecoder,
};

/// PCU first-level model-specific code, IA32_MC4_STATUS[23:16].
const PCU_ERROR_CODES: &[(u16, &str)] = &[
    (0x00, "No error"),
    (0x0D, "MCA_LLC_BIST_ACTIVE_TIMEOUT"),
    (0x0E, "MCA_DMI_TRAINING_TIMEOUT"),
    (0x0F, "MCA_DMI_CPU_RESET_ACK_TIMEOUT"),
    (0x10, "MCA_MORE_THAN_ONE_LT_AGENT"),
    (0x14, "MCA_INCOMPATIBLE_PCH_TYPE"),
    (0x1E, "MCA_BIOS_RST_CPL_INVALID_SEQ"),
    (0x1F, "MCA_BIOS_INVALID_PKG_STATE_CONFIG"),
    (0x25, "MCA_MESSAGE_CHANNEL_TIMEOUT"),
    (0x27, "MCA_MSGCH_PMREQ_CMP_TIMEOUT"),
];

/// PCU second-level model-specific code, IA32_MC4_STATUS[31:24].
const PCU_ERROR2_CODES: &[(u16, &str)] = &[
    (0x00, "No error"),
    (0x0D, "MCA_LLC_BIST_ACTIVE_TIMEOUT"),
    (0x0E, "MCA_DMI_TRAINING_TIMEOUT"),
    (0x0F, "MCA_DMI_CPU_RESET_ACK_TIMEOUT"),
    (0x10, "MCA_MORE_THAN_ONE_LT_AGENT"),
    (0x14, "MCA_INCOMPATIBLE_PCH_TYPE"),
    (0x1E, "MCA_BIOS_RST_CPL_INVALID_SEQ"),
    (0x1F, "MCA_BIOS_INVALID_PKG_STATE_CONFIG"),
    (0x20, "MCA_PCU_PMAX_CALIB_ERROR"),
    (0x25, "MCA_MESSAGE_CHANNEL_TIMEOUT"),
    (0x27, "MCA_MSGCH_PMREQ_CMP_TIMEOUT"),
    (0x30, "MCA_PKGC_DIRECT_WAKE_RING_TIMEOUT"),
    (0x31, "MCA_PKGC_INVALID_RSP_PCH"),
    (0x33, "MCA_PKGC_WATCHDOG_HANG_CBZ_DOWN"),
    (0x34, "MCA_PKGC_WATCHDOG_HANG_CBZ_UP"),
    (0x38, "MCA_PKGC_WATCHDOG_HANG_C3_UP_SF"),
    (0x40, "MCA_SVID_VCCIN_VR_ICC_MAX_FAILURE"),
    (0x41, "MCA_SVID_COMMAND_TIMEOUT"),
    (0x42, "MCA_SVID_VCCIN_VR_VOUT_FAILURE"),
    (0x43, "MCA_SVID_CPU_VR_CAPABILITY_ERROR"),
    (0x44, "MCA_SVID_CRITICAL_VR_FAILED"),
    (0x45, "MCA_SVID_SA_ITD_ERROR"),
    (0x46, "MCA_SVID_READ_REG_FAILED"),
    (0x47, "MCA_SVID_WRITE_REG_FAILED"),
    (0x48, "MCA_SVID_PKGC_INIT_FAILED"),
    (0x49, "MCA_SVID_PKGC_CONFIG_FAILED"),
    (0x4A, "MCA_SVID_PKGC_REQUEST_FAILED"),
    (0x4B, "MCA_SVID_IMON_REQUEST_FAILED"),
    (0x4C, "MCA_SVID_ALERT_REQUEST_FAILED"),
    (0x4D, "MCA_SVID_MCP_VR_RAMP_ERROR"),
    (0x56, "MCA_FIVR_PD_HARDERR"),
    (0x58, "MCA_WATCHDOG_TIMEOUT_PKGC_SLAVE"),
    (0x59, "MCA_WATCHDOG_TIMEOUT_PKGC_MASTER"),
    (0x5A, "MCA_WATCHDOG_TIMEOUT_PKGS_MASTER"),
    (0x61, "MCA_PKGS_CPD_UNCPD_TIMEOUT"),
    (0x63, "MCA_PKGS_INVALID_REQ_PCH"),
    (0x64, "MCA_PKGS_INVALID_REQ_INTERNAL"),
    (0x65, "MCA_PKGS_INVALID_RSP_INTERNAL"),
    (0x6B, "MCA_PKGS_SMBUS_VPP_PAUSE_TIMEOUT"),
    (0x81, "MCA_RECOVERABLE_DIE_THERMAL_TOO_HOT"),
];

/// UPI model-specific error codes, IA32_MCi_STATUS[21:16].
const UPI_ERROR_CODES: &[(u16, &str)] = &[
    (0x00, "UC Phy initialization failure"),
    (0x01, "UC Phy detected drift buffer alarm"),
    (0x02, "UC Phy detected latency buffer rollover"),
    (0x10, "UC LL Rx detected CRC error"),
    (0x11, "UC LL Rx unsupported or undefined packet"),
    (0x12, "UC LL or Phy control error"),
    (0x13, "UC LL Rx parameter exchange exception"),
    (0x1F, "UC LL detected control error from M3UPI"),
    (0x20, "COR Phy initialization abort"),
    (0x21, "COR Phy reset"),
    (0x22, "COR Phy lane failure, recovery in x8 width"),
    (0x23, "COR Phy L0c error corrected without Phy reset"),
    (0x24, "COR Phy L0c error triggering Phy reset"),
    (0x25, "COR Phy L0p exit error corrected with Phy reset"),
];

/// M2M model-specific error codes, IA32_MCi_STATUS[31:16].
const M2M_ERROR_CODES: &[(u16, &str)] = &[
    (0x0001, "MscodDataRdErr"),
    (0x0002, "MscodPtlWrErr"),
    (0x0004, "MscodFullWrErr"),
    (0x0008, "MscodBgfErr"),
    (0x0010, "MscodTimeout"),
    (0x0020, "MscodParErr"),
    (0x0040, "MscodBucket1Err"),
];

/// iMC model-specific error codes, IA32_MCi_STATUS[31:16].
const IMC_ERROR_CODES: &[(u16, &str)] = &[
    (0x0001, "Address parity error"),
    (0x0002, "HA write data parity error"),
    (0x0004, "HA write byte enable parity error"),
    (0x0008, "Corrected patrol scrub error"),
    (0x0010, "Uncorrected patrol scrub error"),
    (0x0020, "Corrected spare error"),
    (0x0040, "Uncorrected spare error"),
    (0x0080, "Any HA read error"),
    (0x0100, "WDB read parity error"),
    (0x0200, "DDR4 command address parity error"),
    (0x0400, "Uncorrected address parity error"),
    (0x0800, "Unrecognized request type"),
    (0x0801, "Read response to an invalid scoreboard entry"),
    (0x0802, "Unexpected read response"),
    (0x0803, "DDR4 completion to an invalid scoreboard entry"),
    (0x0804, "Completion to an invalid scoreboard entry"),
    (0x0805, "Completion FIFO overflow"),
    (0x0806, "Correctable parity error"),
    (0x0807, "Uncorrectable error"),
    (0x0808, "Interrupt received while outstanding interrupt was not ACKed"),
    (0x0809, "ERID FIFO overflow"),
];

pub(super) struct SkylakeDecoder;

impl FamilyDecoder for SkylakeDecoder {
    fn decode(&self, ctx: &FamilyCtx, event: &mut DecodedMcaEvent) -> bool {
        match event.bank {
            4 => {
                decode_pcu(event);
                true
            }
            5 | 12 | 19 => decode_upi(ctx, event),
            7 | 8 => {
                decode_m2m(event);
                true
            }
            13..=16 => {
                decode_imc(event);
                true
            }
            _ => false,
        }
    }
}

fn decode_pcu(event: &mut DecodedMcaEvent) {
    haswell::decode_internal(event);

    let status = event.status;
    let mut fields = std::mem::take(&mut event.model_specific_errors);
    let first = status.read_bits_in_range(&bit_range!(23, 16)) as u16;
    if let Some(name) = lookup_code(PCU_ERROR_CODES, first, "PCU error", event) {
        fields.push(DecodedField::new("Model_Specific_Error", name));
    }
    let second = status.read_bits_in_range(&bit_range!(31, 24)) as u16;
    if let Some(name) = lookup_code(PCU_ERROR2_CODES, second, "PCU error 2", event) {
        fields.push(DecodedField::new("Model_Specific_Error2", name));
    }
    replace_model_specific(event, fields);
}

fn decode_upi(_ctx: &FamilyCtx, event: &mut DecodedMcaEvent) -> bool {
    // UPI banks only report through the two interconnect compound codes;
    // anything else in those banks is outside the incremental tables.
    let code16 = (event.status & 0xFFFF) as u16;
    if !matches!(code16, 0x0C0F | 0x0E0F) {
        return false;
    }

    let code = event.status.read_bits_in_range(&bit_range!(21, 16)) as u16;
    if let Some(name) = lookup_code(UPI_ERROR_CODES, code, "UPI error", event) {
        replace_model_specific(event, vec![DecodedField::new("UPI_error", name)]);
    }
    true
}

fn decode_m2m(event: &mut DecodedMcaEvent) {
    let status = event.status;
    let code = mscod(status);
    let mut fields = Vec::new();
    match lookup_code(M2M_ERROR_CODES, code, "M2M error", event) {
        Some(name) => fields.push(DecodedField::new("M2M_error", name)),
        None => fields.push(DecodedField::new("M2M_mscod", format!("{code:#06x}"))),
    }
    fields.push(bit_field(status, 41, "Failover"));
    fields.push(bit_field(status, 42, "Mirrorcorr"));
    replace_model_specific(event, fields);
}

fn decode_imc(event: &mut DecodedMcaEvent) {
    let code = mscod(event.status);
    if let Some(name) = lookup_code(IMC_ERROR_CODES, code, "iMC error", event) {
        replace_model_specific(event, vec![DecodedField::new("iMC_error", name)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mce::error_code;
    use crate::mce::event::EventInput;

    fn decode(bank: u32, status: u64) -> (bool, DecodedMcaEvent) {
        let (code, _) = error_code::parse((status & 0xFFFF) as u16);
        let mut event = DecodedMcaEvent::new(&EventInput {
            bank,
            status,
            ..Default::default()
        });
        let ctx = FamilyCtx {
            signature: "06_55H".parse().unwrap(),
            code,
            error_control_ddr: true,
        };
        let claimed = SkylakeDecoder.decode(&ctx, &mut event);
        (claimed, event)
    }

    fn field<'a>(fields: &'a [DecodedField], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    #[test]
    fn test_pcu_with_second_level_code() {
        let status = 0x0402 | (0x25_u64 << 16) | (0x41_u64 << 24);
        let (claimed, event) = decode(4, status);
        assert!(claimed);
        let model = &event.model_specific_errors;
        assert_eq!(
            field(model, "Model_Specific_Error"),
            Some("MCA_MESSAGE_CHANNEL_TIMEOUT")
        );
        assert_eq!(
            field(model, "Model_Specific_Error2"),
            Some("MCA_SVID_COMMAND_TIMEOUT")
        );
        assert_eq!(event.mca_error.unwrap().interpretation, "Internal Error");
    }

    #[test]
    fn test_upi_requires_interconnect_code() {
        let (claimed, event) = decode(5, 0x0C0F | (0x10_u64 << 16));
        assert!(claimed);
        assert_eq!(
            field(&event.model_specific_errors, "UPI_error"),
            Some("UC LL Rx detected CRC error")
        );

        // Same bank but a non-interconnect code: not claimed.
        let (claimed, _) = decode(5, 0x0100 | (0x10_u64 << 16));
        assert!(!claimed);
    }

    #[test]
    fn test_m2m_fields() {
        let (claimed, event) = decode(7, (0x0010_u64 << 16) | (1 << 41));
        assert!(claimed);
        let model = &event.model_specific_errors;
        assert_eq!(field(model, "M2M_error"), Some("MscodTimeout"));
        assert_eq!(field(model, "Failover"), Some("1"));
        assert_eq!(field(model, "Mirrorcorr"), Some("0"));
    }

    #[test]
    fn test_m2m_unknown_mscod_keeps_raw() {
        let (claimed, event) = decode(8, 0x0300_u64 << 16);
        assert!(claimed);
        assert_eq!(
            field(&event.model_specific_errors, "M2M_mscod"),
            Some("0x0300")
        );
        assert!(event.has_warning(crate::mce::event::WarningKind::ModelSpecificSubCodeNotFound));
    }

    #[test]
    fn test_imc_scoreboard_code() {
        let (claimed, event) = decode(14, 0x0805_u64 << 16);
        assert!(claimed);
        assert_eq!(
            field(&event.model_specific_errors, "iMC_error"),
            Some("Completion FIFO overflow")
        );
    }
}
