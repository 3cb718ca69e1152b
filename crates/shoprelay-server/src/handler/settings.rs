//! Integration settings administration endpoints.

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use shoprelay_postgres::model::NewIntegrationSettings;

use crate::Result;
use crate::handler::ErrorResponse;
use crate::service::{ServiceState, SharedSettingsProvider};

/// Tracing target for settings administration.
const TRACING_TARGET: &str = "shoprelay_server::handler::settings";

/// Request body for updating a shop's relay toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    /// Whether events from this shop are relayed downstream.
    pub is_enabled: bool,
}

#[tracing::instrument(skip(settings))]
async fn get_settings(
    State(settings): State<SharedSettingsProvider>,
    Path(shop): Path<String>,
) -> Result<Response> {
    let Some(found) = settings.find(&shop).await? else {
        return Ok(
            ErrorResponse::new("not_found", format!("Shop '{}' is not installed", shop))
                .into_response_with(StatusCode::NOT_FOUND),
        );
    };

    Ok(Json(found).into_response())
}

#[tracing::instrument(skip(settings, request))]
async fn put_settings(
    State(settings): State<SharedSettingsProvider>,
    Path(shop): Path<String>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Response> {
    // Toggle in place when the shop is installed; the first PUT installs it.
    let updated = match settings.set_enabled(&shop, request.is_enabled).await? {
        Some(updated) => updated,
        None => {
            let new_settings = NewIntegrationSettings {
                shop: shop.clone(),
                is_enabled: request.is_enabled,
            };
            settings.upsert(new_settings).await?
        }
    };

    tracing::info!(
        target: TRACING_TARGET,
        shop = %shop,
        is_enabled = updated.is_enabled,
        "Integration settings updated"
    );

    Ok(Json(updated).into_response())
}

#[tracing::instrument(skip(settings))]
async fn list_settings(State(settings): State<SharedSettingsProvider>) -> Result<Response> {
    let all = settings.list().await?;
    Ok(Json(all).into_response())
}

/// Returns a [`Router`] with the settings administration routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/settings", get(list_settings))
        .route("/settings/{shop}", get(get_settings).put(put_settings))
}
