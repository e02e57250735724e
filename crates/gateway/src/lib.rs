//! Liveness endpoint.
//!
//! Hosting platforms expect a web service bound to a port; this serves a
//! static health body so their checks pass. No state, no auth — the relay
//! itself never reads it.

use std::net::SocketAddr;

use {
    anyhow::Context,
    axum::{Json, Router, routing::get},
    tracing::info,
};

/// Serve `GET /` on `0.0.0.0:<port>` until the process exits.
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind liveness endpoint to {addr}"))?;
    info!(%addr, "liveness endpoint listening");
    axum::serve(listener, router())
        .await
        .context("liveness endpoint failed")?;
    Ok(())
}

fn router() -> Router {
    Router::new().route("/", get(health_handler))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "clipferry",
    }))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        axum::{
            body::Body,
            http::{Request, StatusCode},
        },
        tower::ServiceExt,
    };

    #[tokio::test]
    async fn root_returns_ok() {
        let response = router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
