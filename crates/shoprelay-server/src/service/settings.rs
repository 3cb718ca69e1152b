//! Integration settings access behind a provider seam.
//!
//! The relay and the handlers depend on [`SettingsProvider`] rather than on
//! the database client, so tests can run against an in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use shoprelay_postgres::PgClient;
use shoprelay_postgres::model::{IntegrationSettings, NewIntegrationSettings};
use shoprelay_postgres::query::IntegrationSettingsRepository;

use crate::{Error, Result};

/// Shared handle to a settings provider.
pub type SharedSettingsProvider = Arc<dyn SettingsProvider>;

/// Read/write access to per-shop integration settings.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Finds the settings for a shop, if installed.
    async fn find(&self, shop: &str) -> Result<Option<IntegrationSettings>>;

    /// Sets the relay toggle for an installed shop.
    ///
    /// Returns `None` when the shop has no settings row.
    async fn set_enabled(&self, shop: &str, enabled: bool) -> Result<Option<IntegrationSettings>>;

    /// Installs a shop or updates its relay toggle.
    async fn upsert(&self, settings: NewIntegrationSettings) -> Result<IntegrationSettings>;

    /// Removes a shop's settings; returns whether a row existed.
    async fn remove(&self, shop: &str) -> Result<bool>;

    /// Lists settings for all installed shops.
    async fn list(&self) -> Result<Vec<IntegrationSettings>>;
}

/// PostgreSQL-backed [`SettingsProvider`].
#[derive(Debug, Clone)]
pub struct PgSettingsProvider {
    pg: PgClient,
}

impl PgSettingsProvider {
    /// Creates a provider backed by the given database client.
    pub fn new(pg: PgClient) -> Self {
        Self { pg }
    }
}

#[async_trait]
impl SettingsProvider for PgSettingsProvider {
    async fn find(&self, shop: &str) -> Result<Option<IntegrationSettings>> {
        let mut conn = self.pg.get_connection().await.map_err(Error::from)?;
        let settings = conn.find_integration_settings(shop).await?;
        Ok(settings)
    }

    async fn set_enabled(&self, shop: &str, enabled: bool) -> Result<Option<IntegrationSettings>> {
        let mut conn = self.pg.get_connection().await.map_err(Error::from)?;
        let settings = conn.set_integration_enabled(shop, enabled).await?;
        Ok(settings)
    }

    async fn upsert(&self, settings: NewIntegrationSettings) -> Result<IntegrationSettings> {
        let mut conn = self.pg.get_connection().await.map_err(Error::from)?;
        let settings = conn.upsert_integration_settings(settings).await?;
        Ok(settings)
    }

    async fn remove(&self, shop: &str) -> Result<bool> {
        let mut conn = self.pg.get_connection().await.map_err(Error::from)?;
        let removed = conn.delete_integration_settings(shop).await?;
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<IntegrationSettings>> {
        let mut conn = self.pg.get_connection().await.map_err(Error::from)?;
        let settings = conn.list_integration_settings().await?;
        Ok(settings)
    }
}
