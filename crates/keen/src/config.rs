//! Destination settings for the Keen IO adapter.

use serde::{Deserialize, Serialize};

use beacon_core::{BeaconError, BeaconResult};

use crate::client::{ProjectCredentials, LIB_FULL, LIB_SLIM};

/// Configuration for the Keen IO destination. Immutable once the adapter is
/// constructed; hosts persist these settings as JSON per destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeenConfig {
    /// Keen project identifier.
    #[serde(default)]
    pub project_id: String,
    /// Write key for event collection.
    #[serde(default)]
    pub write_key: String,
    /// Read key; configuring one selects the full library with query support.
    #[serde(default)]
    pub read_key: String,
    /// Attach the IP-to-geo enrichment addon (default: false).
    #[serde(default)]
    pub ip_addon: bool,
    /// Attach the user-agent parser addon (default: false).
    #[serde(default)]
    pub ua_addon: bool,
    /// Attach the URL parser addon (default: false).
    #[serde(default)]
    pub url_addon: bool,
    /// Attach the referrer parser addon (default: false).
    #[serde(default)]
    pub referrer_addon: bool,
    /// Attach the datetime parser addon (default: false).
    #[serde(default)]
    pub datetime_addon: bool,
    /// Record every page view as "Loaded a Page" (default: false).
    #[serde(default)]
    pub track_all_pages: bool,
    /// Record named page views as "Viewed {name} Page" (default: true).
    #[serde(default = "default_true")]
    pub track_named_pages: bool,
    /// Record categorized page views as "Viewed {category} Page" (default: true).
    #[serde(default = "default_true")]
    pub track_categorized_pages: bool,
}

fn default_true() -> bool {
    true
}

impl Default for KeenConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            write_key: String::new(),
            read_key: String::new(),
            ip_addon: false,
            ua_addon: false,
            url_addon: false,
            referrer_addon: false,
            datetime_addon: false,
            track_all_pages: false,
            track_named_pages: true,
            track_categorized_pages: true,
        }
    }
}

impl KeenConfig {
    /// Parse the JSON settings object a host stores per destination.
    pub fn from_settings(settings: serde_json::Value) -> BeaconResult<Self> {
        serde_json::from_value(settings)
            .map_err(|err| BeaconError::Config(format!("invalid Keen settings: {err}")))
    }

    /// Credentials the vendor client is constructed with. Not validated
    /// here: malformed credentials pass through to the client, whose own
    /// failure behavior is its business.
    pub fn credentials(&self) -> ProjectCredentials {
        ProjectCredentials {
            project_id: self.project_id.clone(),
            write_key: self.write_key.clone(),
            read_key: (!self.read_key.is_empty()).then(|| self.read_key.clone()),
        }
    }

    /// Which library variant to load: the full library once a read key is
    /// configured (it carries query support), the slim write-only tracker
    /// otherwise.
    pub fn library(&self) -> &'static str {
        if self.read_key.is_empty() {
            LIB_SLIM
        } else {
            LIB_FULL
        }
    }
}
