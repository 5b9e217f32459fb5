// Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Decode Intel machine-check events from a hypervisor kernel log.
//!
//! Reads log lines from a file or stdin, recovers the MSR triple of every
//! `MCE:` line, and prints one decoded record per event as JSON (or an
//! indented listing with `--pretty`). The IA32_MCG_CAP value is taken from
//! the log's own boot line when present; the Processor Signature comes from
//! a CPUID dump or an explicit `--signature`.

mod parse;
mod render;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, info};
use mca::cpuid::{self, CpuidLeaves, SignatureParseError};
use mca::mce::{decode_event, DecodeContext, EventInput};
use mca::{McgCap, ProcessorSignature};

#[derive(Debug, Parser)]
#[command(name = "mcedecode", version, about)]
struct Cli {
    /// Log file to decode; stdin when absent or `-`.
    log: Option<PathBuf>,

    /// IA32_MCG_CAP as a hex value, overriding the log's boot line.
    #[arg(long)]
    mcg_cap: Option<String>,

    /// JSON file with the raw CPUID leaves of the reporting host.
    #[arg(long)]
    cpuid: Option<PathBuf>,

    /// Processor Signature (e.g. `06_55H`), bypassing CPUID decoding.
    #[arg(long, conflicts_with = "cpuid")]
    signature: Option<String>,

    /// Assume the platform ran with MSR_ERROR_CONTROL[1] clear.
    #[arg(long)]
    no_error_control: bool,

    /// Print the decoded CPUID record and exit.
    #[arg(long, requires = "cpuid")]
    dump_cpuid: bool,

    /// Render indented listings instead of JSON lines.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, thiserror::Error, displaydoc::Display)]
enum MainError {
    /// Failed to open log file {0}: {1}
    OpenLog(PathBuf, #[source] io::Error),
    /// Failed to read log line: {0}
    ReadLine(#[source] io::Error),
    /// Invalid MCG_CAP value `{0}`
    InvalidMcgCap(String),
    /// No MCG_CAP available; pass --mcg-cap or a log with the boot line
    MissingMcgCap,
    /// Failed to read CPUID file {0}: {1}
    ReadCpuid(PathBuf, #[source] io::Error),
    /// Failed to parse CPUID file {0}: {1}
    ParseCpuid(PathBuf, #[source] serde_json::Error),
    /// Invalid processor signature: {0}
    InvalidSignature(#[from] SignatureParseError),
    /// Failed to render record: {0}
    Render(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Cli::parse()) {
        error!("{err}");
        eprintln!("Error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(cli: Cli) -> Result<(), MainError> {
    let signature = resolve_signature(&cli)?;
    if cli.dump_cpuid {
        return Ok(());
    }

    let explicit_cap = cli
        .mcg_cap
        .as_deref()
        .map(parse_hex_capability)
        .transpose()?;
    if let Some(cap) = explicit_cap {
        info!("using MCG_CAP {:#x} from the command line", cap.encode());
    }

    let reader: Box<dyn BufRead> = match cli.log.as_deref() {
        None => Box::new(BufReader::new(io::stdin())),
        Some(path) if path.as_os_str() == "-" => Box::new(BufReader::new(io::stdin())),
        Some(path) => Box::new(BufReader::new(
            File::open(path).map_err(|e| MainError::OpenLog(path.to_path_buf(), e))?,
        )),
    };

    let mut context = explicit_cap.map(|capability| DecodeContext {
        capability,
        signature,
        error_control_ddr: !cli.no_error_control,
    });
    let mut next_id: u64 = 1;

    for line in reader.lines() {
        let line = line.map_err(MainError::ReadLine)?;

        if explicit_cap.is_none() {
            if let Some((banks, raw)) = parse::parse_boot_capability(&line) {
                let capability = McgCap::decode(raw);
                info!(
                    "detected {banks} MCE banks, MCG_CAP {raw:#x} (bank_count {})",
                    capability.bank_count
                );
                context = Some(DecodeContext {
                    capability,
                    signature,
                    error_control_ddr: !cli.no_error_control,
                });
                continue;
            }
        }

        let Some(parsed) = parse::parse_mce_line(&line) else {
            continue;
        };
        let Some(context) = context.as_ref() else {
            return Err(MainError::MissingMcgCap);
        };

        let input = EventInput {
            id: next_id,
            timestamp: parsed.timestamp,
            cpu: parsed.cpu,
            bank: parsed.bank,
            status: parsed.status,
            addr: parsed.addr,
            misc: parsed.misc,
        };
        next_id += 1;

        let event = decode_event(context, &input);
        debug!(
            "event {}: bank {} status {:#018x}, {} warnings",
            event.id,
            event.bank,
            event.status,
            event.warnings.len()
        );
        if cli.pretty {
            print!("{}", render::render_event(&event));
        } else {
            println!("{}", serde_json::to_string(&event)?);
        }
    }

    Ok(())
}

/// Resolves the Processor Signature from `--signature` or a CPUID dump,
/// printing the decoded CPUID record when `--dump-cpuid` asks for it.
fn resolve_signature(cli: &Cli) -> Result<Option<ProcessorSignature>, MainError> {
    if let Some(signature) = cli.signature.as_deref() {
        return Ok(Some(signature.parse()?));
    }

    let Some(path) = cli.cpuid.as_deref() else {
        info!("no CPUID source; family-specific decoding disabled");
        return Ok(None);
    };
    let file = File::open(path).map_err(|e| MainError::ReadCpuid(path.to_path_buf(), e))?;
    let leaves: CpuidLeaves = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| MainError::ParseCpuid(path.to_path_buf(), e))?;
    let info = cpuid::decode(&leaves);

    if cli.dump_cpuid {
        print!("{}", render::render_cpuid(&info));
    }

    match info.processor_signature.as_deref() {
        Some(signature) => {
            info!("processor signature {signature}");
            Ok(Some(signature.parse()?))
        }
        None => {
            info!("CPUID dump lacks leaf 01H; family-specific decoding disabled");
            Ok(None)
        }
    }
}

fn parse_hex_capability(text: &str) -> Result<McgCap, MainError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16)
        .map(McgCap::decode)
        .map_err(|_| MainError::InvalidMcgCap(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_capability() {
        assert_eq!(parse_hex_capability("0x1c09").unwrap().bank_count, 9);
        assert_eq!(parse_hex_capability("1C09").unwrap().bank_count, 9);
        assert!(matches!(
            parse_hex_capability("banks"),
            Err(MainError::InvalidMcgCap(_))
        ));
    }
}
