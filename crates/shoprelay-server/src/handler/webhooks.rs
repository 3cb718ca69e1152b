//! Webhook receiving endpoint.
//!
//! Signature verification happens on the raw body before anything else.
//! After a delivery authenticates, the endpoint always acknowledges with
//! HTTP 200, even when the event is dropped or downstream delivery fails;
//! a non-200 would make the platform re-deliver and eventually disable the
//! webhook subscription.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::handler::ErrorResponse;
use crate::service::{Delivery, RelayOutcome, RelayService, ServiceState, WebhookVerifier};

/// Tracing target for webhook receipt.
const TRACING_TARGET: &str = "shoprelay_server::handler::webhooks";

/// Topic header set by the commerce platform.
const HEADER_TOPIC: &str = "x-shopify-topic";
/// Shop domain header set by the commerce platform.
const HEADER_SHOP: &str = "x-shopify-shop-domain";
/// Base64 HMAC-SHA256 signature header.
const HEADER_SIGNATURE: &str = "x-shopify-hmac-sha256";

/// Acknowledgment body returned for authenticated deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    /// Always true for acknowledged deliveries.
    pub success: bool,
    /// Outcome label: `delivered` or the drop reason.
    pub outcome: String,
    /// Stream position of the relayed record, when one reached the stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

#[tracing::instrument(skip_all)]
async fn receive_webhook(
    State(relay): State<RelayService>,
    State(verifier): State<WebhookVerifier>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(HEADER_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verifier.verify(&body, signature) {
        tracing::warn!(
            target: TRACING_TARGET,
            "Rejecting webhook with invalid signature"
        );
        return ErrorResponse::new("auth", "Invalid webhook signature")
            .into_response_with(StatusCode::UNAUTHORIZED);
    }

    let Some(topic) = header_str(&headers, HEADER_TOPIC) else {
        return ErrorResponse::new("bad_request", "Missing topic header")
            .into_response_with(StatusCode::BAD_REQUEST);
    };
    let Some(shop) = header_str(&headers, HEADER_SHOP) else {
        return ErrorResponse::new("bad_request", "Missing shop domain header")
            .into_response_with(StatusCode::BAD_REQUEST);
    };

    // A payload that fails to parse is still an authenticated delivery, so
    // it is relayed as an empty object rather than rejected.
    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap_or_else(|err| {
        tracing::warn!(
            target: TRACING_TARGET,
            topic = %topic,
            shop = %shop,
            error = %err,
            "Webhook payload is not valid JSON, relaying empty payload"
        );
        serde_json::json!({})
    });

    let outcome = relay.process(&topic, &shop, payload).await;

    let event_id = match &outcome {
        RelayOutcome::Delivered(Delivery::Stream(receipt)) => {
            Some(format!("{}:{}", receipt.stream, receipt.sequence))
        }
        RelayOutcome::Delivered(Delivery::Bus) | RelayOutcome::Dropped(_) => None,
    };

    tracing::debug!(
        target: TRACING_TARGET,
        topic = %topic,
        shop = %shop,
        outcome = outcome.as_str(),
        "Webhook acknowledged"
    );

    let ack = WebhookAck {
        success: true,
        outcome: outcome.as_str().to_string(),
        event_id,
    };

    (StatusCode::OK, Json(ack)).into_response()
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .filter(|v| !v.is_empty())
}

/// Returns a [`Router`] with the webhook receiving route.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/webhooks", post(receive_webhook))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::handler::test::{create_failing_stream_context, create_test_context};

    const SECRET: &str = "test-webhook-secret";

    fn signed_request<'a>(
        ctx: &'a crate::handler::test::TestContext,
        topic: &str,
        shop: &str,
        body: &str,
    ) -> axum_test::TestRequest {
        let signature = ctx.verifier.sign(body.as_bytes());
        ctx.server
            .post("/webhooks")
            .add_header(HEADER_TOPIC, topic)
            .add_header(HEADER_SHOP, shop)
            .add_header(HEADER_SIGNATURE, signature)
            .text(body.to_string())
    }

    #[tokio::test]
    async fn test_enabled_shop_event_is_relayed() -> anyhow::Result<()> {
        let ctx = create_test_context(SECRET)?;
        ctx.settings.insert_sync("acme.example", true);

        let response =
            signed_request(&ctx, "orders/create", "acme.example", r#"{"order_id":42}"#).await;
        response.assert_status_ok();

        let ack = response.json::<WebhookAck>();
        assert!(ack.success);
        assert_eq!(ack.outcome, "delivered");
        assert!(ack.event_id.is_some());

        let submissions = ctx.stream.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].shop, "acme.example");
        assert_eq!(submissions[0].payload, json!({"order_id": 42}));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_signature_is_unauthorized() -> anyhow::Result<()> {
        let ctx = create_test_context(SECRET)?;
        ctx.settings.insert_sync("acme.example", true);

        let response = ctx
            .server
            .post("/webhooks")
            .add_header(HEADER_TOPIC, "orders/create")
            .add_header(HEADER_SHOP, "acme.example")
            .add_header(HEADER_SIGNATURE, "bm90LXRoZS1yZWFsLXNpZ25hdHVyZQ==")
            .text(r#"{"order_id":42}"#)
            .await;

        response.assert_status_unauthorized();
        assert!(ctx.stream.submissions().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_signature_is_unauthorized() -> anyhow::Result<()> {
        let ctx = create_test_context(SECRET)?;

        let response = ctx
            .server
            .post("/webhooks")
            .add_header(HEADER_TOPIC, "orders/create")
            .add_header(HEADER_SHOP, "acme.example")
            .text(r#"{}"#)
            .await;

        response.assert_status_unauthorized();
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_shop_still_gets_200() -> anyhow::Result<()> {
        let ctx = create_test_context(SECRET)?;
        ctx.settings.insert_sync("acme.example", false);

        let response = signed_request(&ctx, "orders/create", "acme.example", r#"{}"#).await;
        response.assert_status_ok();

        let ack = response.json::<WebhookAck>();
        assert_eq!(ack.outcome, "integration_disabled");
        assert!(ctx.stream.submissions().is_empty());
        assert!(ctx.bus.notifications().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_topic_still_gets_200() -> anyhow::Result<()> {
        let ctx = create_test_context(SECRET)?;
        ctx.settings.insert_sync("acme.example", true);

        let response = signed_request(&ctx, "carts/create", "acme.example", r#"{}"#).await;
        response.assert_status_ok();

        let ack = response.json::<WebhookAck>();
        assert_eq!(ack.outcome, "unknown_topic");
        assert!(ctx.stream.submissions().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_stream_failure_still_gets_200() -> anyhow::Result<()> {
        let ctx = create_failing_stream_context(SECRET)?;
        ctx.settings.insert_sync("acme.example", true);

        let response = signed_request(&ctx, "orders/create", "acme.example", r#"{}"#).await;
        response.assert_status_ok();

        let ack = response.json::<WebhookAck>();
        assert_eq!(ack.outcome, "delivery_failed");
        assert!(ack.event_id.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_uninstall_removes_settings() -> anyhow::Result<()> {
        let ctx = create_test_context(SECRET)?;
        ctx.settings.insert_sync("acme.example", true);

        let response = signed_request(&ctx, "app/uninstalled", "acme.example", r#"{}"#).await;
        response.assert_status_ok();

        let ack = response.json::<WebhookAck>();
        assert_eq!(ack.outcome, "uninstalled");
        assert!(ctx.settings.find_sync("acme.example").is_none());
        assert!(ctx.stream.submissions().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_topic_header_is_bad_request() -> anyhow::Result<()> {
        let ctx = create_test_context(SECRET)?;
        let body = r#"{}"#;
        let signature = ctx.verifier.sign(body.as_bytes());

        let response = ctx
            .server
            .post("/webhooks")
            .add_header(HEADER_SHOP, "acme.example")
            .add_header(HEADER_SIGNATURE, signature)
            .text(body.to_string())
            .await;

        response.assert_status_bad_request();
        Ok(())
    }

    #[tokio::test]
    async fn test_product_update_routes_to_bus() -> anyhow::Result<()> {
        let ctx = create_test_context(SECRET)?;
        ctx.settings.insert_sync("acme.example", true);

        let response =
            signed_request(&ctx, "products/update", "acme.example", r#"{"id":7}"#).await;
        response.assert_status_ok();

        let ack = response.json::<WebhookAck>();
        assert_eq!(ack.outcome, "delivered");
        assert!(ack.event_id.is_none());

        assert!(ctx.stream.submissions().is_empty());
        assert_eq!(ctx.bus.notifications().len(), 1);
        Ok(())
    }
}
