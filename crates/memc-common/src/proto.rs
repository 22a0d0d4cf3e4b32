//! `UserApps` wire message
//!
//! The value stored under every `device_type:device_id` key. The layout is the
//! proto2 schema shared with downstream readers:
//!
//! ```text
//! message UserApps {
//!     repeated uint32 apps = 1;
//!     optional double lat = 2;
//!     optional double lon = 3;
//! }
//! ```
//!
//! proto2 repeated scalars are not packed, so `apps` is encoded one tag per
//! element. Changing that breaks existing consumers.

use prost::Message;

use crate::error::Result;

/// Installed applications and location of one device
#[derive(Clone, PartialEq, Message)]
pub struct UserApps {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub apps: Vec<u32>,
    #[prost(double, optional, tag = "2")]
    pub lat: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub lon: Option<f64>,
}

impl UserApps {
    pub fn new(lat: f64, lon: f64, apps: Vec<u32>) -> Self {
        Self {
            apps,
            lat: Some(lat),
            lon: Some(lon),
        }
    }

    /// Serialize to the protobuf wire format
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Decode a payload previously produced by [`UserApps::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::decode(bytes)?)
    }
}
