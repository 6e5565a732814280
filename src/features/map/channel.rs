//! Decoding of the messages the embedded map page posts to the host.
//!
//! One JSON object per user action. Fields are inspected independently:
//! `loading` updates the spinner flag, and the `lat`/`lng`/`name` triple,
//! when all three are present, carries a resolved pick. A single message
//! may do both.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Transient (coordinate, place name) pair chosen on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPick {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

impl LocationPick {
    pub fn new(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            name: name.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("malformed_channel_message:{0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unrecognized_channel_message")]
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceMessage {
    /// `{loading}` without a complete coordinate triple.
    LoadingNotice { loading: bool, stamp: Stamp },
    /// Tap-driven pick; `loading` is usually `Some(false)`.
    LocationResolved {
        pick: LocationPick,
        loading: Option<bool>,
        stamp: Stamp,
    },
    /// Passive "you are here" report sent once on mount.
    MyLocation {
        pick: LocationPick,
        loading: Option<bool>,
    },
    /// Device refused the location permission request.
    PermissionDenied,
}

/// Ordering data a tap carries. `seq` only counts up within one load of
/// the page, identified by `page`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stamp {
    pub page: Option<String>,
    pub seq: Option<u64>,
}

impl Stamp {
    pub fn new(page: Option<&str>, seq: Option<u64>) -> Self {
        Self {
            page: page.map(str::to_string),
            seq,
        }
    }
}

/// Every field is read on its own; a value of the wrong type counts as
/// absent instead of failing the whole message.
#[derive(Deserialize)]
struct WireMessage {
    #[serde(default, deserialize_with = "lenient")]
    loading: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    lng: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    seq: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    page: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    source: Option<String>,
    #[serde(rename = "permissionDenied", default, deserialize_with = "lenient")]
    permission_denied: Option<bool>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

const DEVICE_SOURCE: &str = "device";

pub fn decode(raw: &str) -> Result<SurfaceMessage, ChannelError> {
    let wire: WireMessage = serde_json::from_str(raw)?;

    if wire.permission_denied == Some(true) {
        return Ok(SurfaceMessage::PermissionDenied);
    }

    let pick = match (wire.lat, wire.lng, wire.name) {
        (Some(lat), Some(lng), Some(name)) => Some(LocationPick::new(lat, lng, name)),
        _ => None,
    };

    let stamp = Stamp {
        page: wire.page,
        seq: wire.seq,
    };
    match (pick, wire.loading) {
        (Some(pick), loading) if wire.source.as_deref() == Some(DEVICE_SOURCE) => {
            Ok(SurfaceMessage::MyLocation { pick, loading })
        }
        (Some(pick), loading) => Ok(SurfaceMessage::LocationResolved {
            pick,
            loading,
            stamp,
        }),
        (None, Some(loading)) => Ok(SurfaceMessage::LoadingNotice { loading, stamp }),
        (None, None) => Err(ChannelError::Unrecognized),
    }
}
