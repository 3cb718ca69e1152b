//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod diagnostics;
mod error;
mod settings;
mod webhooks;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::ErrorResponse;
use crate::service::ServiceState;

#[inline]
async fn fallback() -> Response {
    ErrorResponse::new("not_found", "Route not found").into_response_with(StatusCode::NOT_FOUND)
}

/// Returns a [`Router`] with all routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .merge(webhooks::routes())
        .merge(settings::routes())
        .merge(diagnostics::routes())
        .fallback(fallback)
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;

    use axum_test::TestServer;

    use crate::handler::routes;
    use crate::service::testing::{MemorySettings, MockBusSink, MockStreamSink};
    use crate::service::{ServiceState, WebhookVerifier};

    /// Handles to the test doubles behind a running [`TestServer`].
    pub struct TestContext {
        pub server: TestServer,
        pub stream: Arc<MockStreamSink>,
        pub bus: Arc<MockBusSink>,
        pub settings: Arc<MemorySettings>,
        pub verifier: WebhookVerifier,
    }

    /// Builds a test server over in-memory sinks with the given secret.
    pub fn create_test_context(secret: &str) -> anyhow::Result<TestContext> {
        let stream = Arc::new(MockStreamSink::new());
        let bus = Arc::new(MockBusSink::new());
        let settings = Arc::new(MemorySettings::new());
        let verifier = WebhookVerifier::new(secret);

        let state = ServiceState::new(
            stream.clone(),
            bus.clone(),
            settings.clone(),
            verifier.clone(),
        );
        let server = TestServer::new(routes().with_state(state))?;

        Ok(TestContext {
            server,
            stream,
            bus,
            settings,
            verifier,
        })
    }

    /// Builds a test server whose stream sink rejects every submission.
    pub fn create_failing_stream_context(secret: &str) -> anyhow::Result<TestContext> {
        let stream = Arc::new(MockStreamSink::failing());
        let bus = Arc::new(MockBusSink::new());
        let settings = Arc::new(MemorySettings::new());
        let verifier = WebhookVerifier::new(secret);

        let state = ServiceState::new(
            stream.clone(),
            bus.clone(),
            settings.clone(),
            verifier.clone(),
        );
        let server = TestServer::new(routes().with_state(state))?;

        Ok(TestContext {
            server,
            stream,
            bus,
            settings,
            verifier,
        })
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() -> anyhow::Result<()> {
        let ctx = create_test_context("secret")?;
        let response = ctx.server.get("/nope").await;
        response.assert_status_not_found();
        Ok(())
    }
}
