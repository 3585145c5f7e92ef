#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::path::Path;

use crate::client::CliError;

pub fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::InputFile {
        path: path.display().to_string(),
        source,
    })
}

pub fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    fs::write(path, contents).map_err(|source| CliError::OutputFile {
        path: path.display().to_string(),
        source,
    })
}

/// Validate an RFC 3339 timestamp before it is sent as a query parameter.
pub fn check_time_opt(val: Option<String>) -> Result<Option<String>, CliError> {
    if let Some(v) = val {
        time::OffsetDateTime::parse(&v, &time::format_description::well_known::Rfc3339)
            .map_err(|e| CliError::InvalidInput(format!("`{v}`: {e}")))?;
        Ok(Some(v))
    } else {
        Ok(None)
    }
}
