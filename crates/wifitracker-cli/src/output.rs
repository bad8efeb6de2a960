//! JSON output for analysis results and captured requests

use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use wifitracker_core::Request;

/// Write each entity as a pretty-printed JSON object
pub fn write_entities<W: Write, T: Serialize>(out: &mut W, entities: &[T]) -> Result<()> {
    for entity in entities {
        serde_json::to_writer_pretty(&mut *out, entity)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Write a request as one line of the request log
pub fn write_record<W: Write>(out: &mut W, request: &Request) -> Result<()> {
    writeln!(out, "{}", request.to_record()?)?;
    Ok(())
}
