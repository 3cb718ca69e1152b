//! Integration settings repository for per-shop relay configuration.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use jiff::Timestamp;

use crate::model::{IntegrationSettings, NewIntegrationSettings};
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for integration settings database operations.
///
/// Handles installation, the per-shop relay toggle, and teardown on
/// uninstall.
pub trait IntegrationSettingsRepository {
    /// Inserts settings for a shop, or updates the toggle if the shop is
    /// already installed.
    fn upsert_integration_settings(
        &mut self,
        new_settings: NewIntegrationSettings,
    ) -> impl Future<Output = PgResult<IntegrationSettings>> + Send;

    /// Finds settings for a shop.
    fn find_integration_settings(
        &mut self,
        shop_domain: &str,
    ) -> impl Future<Output = PgResult<Option<IntegrationSettings>>> + Send;

    /// Sets the relay toggle for a shop.
    ///
    /// Returns `None` if the shop has no settings row.
    fn set_integration_enabled(
        &mut self,
        shop_domain: &str,
        enabled: bool,
    ) -> impl Future<Output = PgResult<Option<IntegrationSettings>>> + Send;

    /// Removes a shop's settings entirely; used on app uninstall.
    ///
    /// Returns whether a row was removed.
    fn delete_integration_settings(
        &mut self,
        shop_domain: &str,
    ) -> impl Future<Output = PgResult<bool>> + Send;

    /// Lists settings for all installed shops.
    fn list_integration_settings(
        &mut self,
    ) -> impl Future<Output = PgResult<Vec<IntegrationSettings>>> + Send;
}

impl IntegrationSettingsRepository for PgConnection {
    async fn upsert_integration_settings(
        &mut self,
        new_settings: NewIntegrationSettings,
    ) -> PgResult<IntegrationSettings> {
        use diesel::upsert::excluded;
        use schema::integration_settings::dsl::*;

        let settings = diesel::insert_into(integration_settings)
            .values(&new_settings)
            .on_conflict(shop)
            .do_update()
            .set((
                is_enabled.eq(excluded(is_enabled)),
                updated_at.eq(jiff_diesel::Timestamp::from(Timestamp::now())),
            ))
            .returning(IntegrationSettings::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(settings)
    }

    async fn find_integration_settings(
        &mut self,
        shop_domain: &str,
    ) -> PgResult<Option<IntegrationSettings>> {
        use schema::integration_settings::dsl::*;

        let settings = integration_settings
            .filter(shop.eq(shop_domain))
            .select(IntegrationSettings::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(settings)
    }

    async fn set_integration_enabled(
        &mut self,
        shop_domain: &str,
        enabled: bool,
    ) -> PgResult<Option<IntegrationSettings>> {
        use schema::integration_settings::dsl::*;

        let settings = diesel::update(integration_settings)
            .filter(shop.eq(shop_domain))
            .set((
                is_enabled.eq(enabled),
                updated_at.eq(jiff_diesel::Timestamp::from(Timestamp::now())),
            ))
            .returning(IntegrationSettings::as_returning())
            .get_result(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(settings)
    }

    async fn delete_integration_settings(&mut self, shop_domain: &str) -> PgResult<bool> {
        use schema::integration_settings::dsl::*;

        let deleted = diesel::delete(integration_settings)
            .filter(shop.eq(shop_domain))
            .execute(self)
            .await
            .map_err(PgError::from)?;

        Ok(deleted > 0)
    }

    async fn list_integration_settings(&mut self) -> PgResult<Vec<IntegrationSettings>> {
        use schema::integration_settings::dsl::*;

        let settings = integration_settings
            .select(IntegrationSettings::as_select())
            .order(shop.asc())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(settings)
    }
}
