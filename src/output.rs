use std::io::{self, Write};

use serde::Serialize;

use crate::app::{DryRunEntry, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(&mut io::stdout(), report)
    }

    fn print_json<W: Write, T: Serialize>(handle: &mut W, value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        handle.write_all(json.as_bytes())?;
        handle.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        let Some(listing) = &report.dry_run else {
            return Ok(());
        };
        Self::write_listing(&mut io::stdout(), listing)
    }

    pub fn write_listing<W: Write>(handle: &mut W, listing: &[DryRunEntry]) -> io::Result<()> {
        writeln!(handle, "Considering the following {} assemblies for download:", listing.len())?;
        for entry in listing {
            writeln!(
                handle,
                "{}\t{}\t{}",
                entry.accession, entry.organism_name, entry.strain
            )?;
        }
        Ok(())
    }
}

pub fn print_report(report: &RunReport, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Text => TextOutput::print_report(report),
        OutputMode::Json => JsonOutput::print_report(report),
    }
}
