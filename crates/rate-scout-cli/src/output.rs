//! The single JSON object written to stdout.

use std::io::Write;

use rate_scout::PriceRecord;
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<PriceRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn success(results: Vec<PriceRecord>) -> Self {
        Self {
            success: true,
            results: Some(results),
            error: None,
        }
    }

    pub fn failure(error: &CliError) -> Self {
        Self {
            success: false,
            results: None,
            error: Some(error.to_string()),
        }
    }
}

pub fn render(envelope: &Envelope, pretty: bool) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_to(&mut out, envelope, pretty)
}

fn write_to(out: &mut impl Write, envelope: &Envelope, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, envelope)?;
    } else {
        serde_json::to_writer(&mut *out, envelope)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
