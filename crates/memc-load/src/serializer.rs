//! Record to store entry conversion

use memc_common::proto::UserApps;
use memc_common::{MemcError, Result};

use crate::models::{InstalledAppsRecord, RoutingKey, SerializedPayload};
use crate::parser::parse_installed_apps;

/// Build the store key and the encoded `UserApps` value for a record
pub fn serialize_installed_apps(record: InstalledAppsRecord) -> (RoutingKey, SerializedPayload) {
    let key = RoutingKey::new(&record.device_type, &record.device_id);
    let user_apps = UserApps::new(record.latitude, record.longitude, record.app_ids);

    (key, SerializedPayload::from(user_apps.to_bytes()))
}

/// Parse, encode and decode `line`, failing if anything is lost on the way
///
/// Backs the `--test` switch of the binary.
pub fn verify_round_trip(line: &str) -> Result<()> {
    let record = parse_installed_apps(line)
        .map_err(|e| MemcError::RoundTrip(format!("{line:?}: {e}")))?;
    let expected = UserApps::new(record.latitude, record.longitude, record.app_ids.clone());

    let (_, payload) = serialize_installed_apps(record);
    let decoded = UserApps::from_bytes(payload.as_bytes())?;

    if decoded != expected {
        return Err(MemcError::RoundTrip(format!(
            "{line:?}: decoded {decoded:?}, expected {expected:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record() -> InstalledAppsRecord {
        InstalledAppsRecord {
            device_type: "gaid".to_string(),
            device_id: "7rfw452y52g2gq4g".to_string(),
            latitude: 55.55,
            longitude: 42.42,
            app_ids: vec![7423, 424],
        }
    }

    #[test]
    fn test_key_and_payload() {
        let (key, payload) = serialize_installed_apps(record());

        assert_eq!(key.as_str(), "gaid:7rfw452y52g2gq4g");

        let decoded = UserApps::from_bytes(payload.as_bytes()).unwrap();
        assert_eq!(decoded.lat, Some(55.55));
        assert_eq!(decoded.lon, Some(42.42));
        assert_eq!(decoded.apps, vec![7423, 424]);
    }

    #[test]
    fn test_same_record_same_bytes() {
        let (_, first) = serialize_installed_apps(record());
        let (_, second) = serialize_installed_apps(record());
        assert_eq!(first, second);
    }

    #[test]
    fn test_verify_round_trip() {
        verify_round_trip("idfa\t1rfw452y52g2gq4g\t55.55\t42.42\t1423,43,567,3,7,23").unwrap();
        assert!(verify_round_trip("idfa\tmissing-fields").is_err());
    }
}
