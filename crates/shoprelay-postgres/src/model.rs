//! Integration settings model for per-shop relay configuration.
//!
//! One row per installed shop. The row is created on install, toggled by the
//! merchant, and removed when the app is uninstalled.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use serde::{Deserialize, Serialize};

use crate::schema::integration_settings;

/// Per-shop integration settings controlling whether events are relayed.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = integration_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct IntegrationSettings {
    /// Shop identifier, unique per installation.
    pub shop: String,
    /// Whether events from this shop are relayed downstream.
    pub is_enabled: bool,
    /// When the integration was first installed.
    #[serde(with = "jiff_timestamp_serde")]
    pub installed_at: Timestamp,
    /// When the settings were last modified.
    #[serde(with = "jiff_timestamp_serde")]
    pub updated_at: Timestamp,
}

impl IntegrationSettings {
    /// Returns whether events from this shop should be relayed.
    #[inline]
    pub fn is_relaying(&self) -> bool {
        self.is_enabled
    }
}

/// Data structure for installing or re-enabling a shop's integration.
#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = integration_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct NewIntegrationSettings {
    /// Shop identifier.
    pub shop: String,
    /// Initial relay toggle.
    pub is_enabled: bool,
}

impl NewIntegrationSettings {
    /// Creates enabled settings for a newly installed shop.
    pub fn enabled(shop: impl Into<String>) -> Self {
        Self {
            shop: shop.into(),
            is_enabled: true,
        }
    }

    /// Creates disabled settings for a shop.
    pub fn disabled(shop: impl Into<String>) -> Self {
        Self {
            shop: shop.into(),
            is_enabled: false,
        }
    }
}

mod jiff_timestamp_serde {
    //! Serializes the diesel timestamp wrapper as an ISO-8601 string.

    use jiff_diesel::Timestamp;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&jiff::Timestamp::from(*ts))
    }
}
