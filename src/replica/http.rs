//! HTTP status endpoints

use crate::replica::node::{NodeStatus, ReplicaNode};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router(node: Arc<ReplicaNode>) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/admin/status", axum::routing::get(admin_status))
        .layer(TraceLayer::new_for_http())
        .with_state(node)
}

async fn health(State(node): State<Arc<ReplicaNode>>) -> impl IntoResponse {
    let role = if node.is_leader() { "Leader" } else { "Follower" };

    axum::Json(json!({
        "status": "healthy",
        "role": role,
        "is_leader": node.is_leader(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn admin_status(State(node): State<Arc<ReplicaNode>>) -> axum::Json<NodeStatus> {
    axum::Json(node.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ActivityLog;
    use crate::replica::node::NodeOptions;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn get_json(router: Router, uri: &str) -> Value {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_admin_status() {
        let node = Arc::new(ReplicaNode::new(
            2,
            2,
            NodeOptions::default(),
            ActivityLog::disabled(),
        ));

        let json = get_json(create_router(node), "/admin/status").await;

        assert_eq!(json["node_id"], 2);
        assert_eq!(json["leader_id"], 2);
        assert_eq!(json["is_leader"], true);
        assert!(json["replicas"].as_array().unwrap().is_empty());
        assert_eq!(json["clients"], 0);
    }

    #[tokio::test]
    async fn test_health_reports_role() {
        let node = Arc::new(ReplicaNode::new(
            1,
            3,
            NodeOptions::default(),
            ActivityLog::disabled(),
        ));

        let json = get_json(create_router(node), "/health").await;

        assert_eq!(json["status"], "healthy");
        assert_eq!(json["role"], "Follower");
    }
}
