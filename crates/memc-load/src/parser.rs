//! Installed-apps line parser
//!
//! # Line Format
//! Five tab-separated fields:
//!
//! ```text
//! device_type \t device_id \t latitude \t longitude \t app_id[,app_id...]
//! idfa        \t 1rfw452y52 \t 55.55    \t 42.42     \t 1423,43,567,3,7,23
//! ```
//!
//! Identity and coordinates are mandatory. App ids are best effort: a token
//! that is not an unsigned integer is dropped and the rest of the list is kept.

use thiserror::Error;
use tracing::debug;

use crate::models::InstalledAppsRecord;

/// Number of tab-separated fields a line must have
pub const MIN_FIELDS: usize = 5;

/// Why a line could not become a record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected at least {MIN_FIELDS} tab-separated fields, got {0}")]
    MalformedLine(usize),

    #[error("device type or device id is empty")]
    MissingIdentity,

    #[error("invalid {axis}: {value:?}")]
    InvalidCoordinate { axis: &'static str, value: String },
}

/// Parse one trimmed, non-blank line
pub fn parse_installed_apps(line: &str) -> Result<InstalledAppsRecord, ParseError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MIN_FIELDS {
        return Err(ParseError::MalformedLine(fields.len()));
    }

    let device_type = fields[0].trim();
    let device_id = fields[1].trim();
    if device_type.is_empty() || device_id.is_empty() {
        return Err(ParseError::MissingIdentity);
    }

    let latitude = parse_coordinate("latitude", fields[2])?;
    let longitude = parse_coordinate("longitude", fields[3])?;

    Ok(InstalledAppsRecord {
        device_type: device_type.to_string(),
        device_id: device_id.to_string(),
        latitude,
        longitude,
        app_ids: parse_app_ids(fields[4]),
    })
}

fn parse_coordinate(axis: &'static str, raw: &str) -> Result<f64, ParseError> {
    raw.trim()
        .parse()
        .map_err(|_| ParseError::InvalidCoordinate {
            axis,
            value: raw.to_string(),
        })
}

fn parse_app_ids(raw: &str) -> Vec<u32> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.parse() {
            Ok(app_id) => Some(app_id),
            Err(_) => {
                debug!(token, "Dropping non-numeric app id");
                None
            },
        })
        .collect()
}
