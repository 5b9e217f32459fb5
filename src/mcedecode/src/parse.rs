// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Extraction of machine-check events from kernel log lines.
//!
//! A candidate line matches `MCE:*cpu*bank*status*` and carries at least one
//! of `Addr:`/`Misc:`. The timestamp is the line's first whitespace-separated
//! token; the remaining fields are taken relative to the `MCE:` marker so the
//! log prefix (which carries its own `cpu` token) cannot shadow them.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MCE_LINE: Regex = Regex::new(
        r"MCE:.*?cpu(?P<cpu>\d+).*?bank(?P<bank>\d+).*?status=0x(?P<status>[0-9a-fA-F]+)"
    )
    .unwrap();
    static ref ADDR_TOKEN: Regex = Regex::new(r"Addr:0x(?P<addr>[0-9a-fA-F]+)").unwrap();
    static ref MISC_TOKEN: Regex = Regex::new(r"Misc:0x(?P<misc>[0-9a-fA-F]+)").unwrap();
    static ref BOOT_CAPABILITY: Regex = Regex::new(
        r"Detected (?P<banks>\d+) MCE banks\. MCG_CAP MSR:(?:0x)?(?P<cap>[0-9a-fA-F]+)"
    )
    .unwrap();
}

/// The six tokens of one machine-check log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MceLine {
    pub timestamp: String,
    pub cpu: u32,
    pub bank: u32,
    pub status: u64,
    pub addr: u64,
    pub misc: u64,
}

/// Parses one log line into an [`MceLine`]. Non-candidate lines and
/// candidates with out-of-range numerics yield `None`.
pub fn parse_mce_line(line: &str) -> Option<MceLine> {
    let captures = MCE_LINE.captures(line)?;

    let addr = ADDR_TOKEN
        .captures(line)
        .map(|c| u64::from_str_radix(&c["addr"], 16));
    let misc = MISC_TOKEN
        .captures(line)
        .map(|c| u64::from_str_radix(&c["misc"], 16));
    if addr.is_none() && misc.is_none() {
        return None;
    }

    let parsed = MceLine {
        timestamp: line.split_whitespace().next()?.to_string(),
        cpu: captures["cpu"].parse().ok()?,
        bank: captures["bank"].parse().ok()?,
        status: u64::from_str_radix(&captures["status"], 16).ok()?,
        addr: addr.transpose().ok()?.unwrap_or(0),
        misc: misc.transpose().ok()?.unwrap_or(0),
    };
    Some(parsed)
}

/// Parses a boot line of the form
/// `Detected <N> MCE banks. MCG_CAP MSR:<hex>`, returning the bank count
/// and the raw capability value.
pub fn parse_boot_capability(line: &str) -> Option<(u32, u64)> {
    let captures = BOOT_CAPABILITY.captures(line)?;
    let banks = captures["banks"].parse().ok()?;
    let cap = u64::from_str_radix(&captures["cap"], 16).ok()?;
    Some((banks, cap))
}
