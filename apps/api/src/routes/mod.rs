pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::noa::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Stateless recommendation API
        .route("/api/v1/noa/recommend", post(handlers::handle_recommend))
        .route("/api/v1/noa/chat", post(handlers::handle_chat))
        // Clarification dialogue sessions
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_reset_session),
        )
        .route(
            "/api/v1/sessions/:id/scenario",
            post(handlers::handle_submit_scenario),
        )
        .route("/api/v1/sessions/:id/answer", post(handlers::handle_answer))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::noa::recommender::tests::{ScriptedClient, WIGI_REPLY, WIGI_SCENARIO};
    use crate::noa::sessions::SessionStore;

    const PROMOTION_FIRST: &str = "Recommendation: NOA 702 – Promotion | LAC: 5 CFR 335.103. \
        Clarifications: Effective date? Competitive certificate number? \
        Required SF-50 fields: Position title, grade, step. \
        OPM NOA Remarks: Permanent promotion to GS-13.";
    const PROMOTION_UPDATE: &str = "Recommendation: NOA 702 – Promotion | LAC: 5 CFR 335.103. \
        Required SF-50 fields: Position title, grade, step, effective date. \
        OPM NOA Remarks: Permanent promotion to GS-13 effective March 3.";

    fn app(client: ScriptedClient) -> Router {
        build_router(AppState {
            llm: Arc::new(client),
            sessions: SessionStore::new(),
            config: Config {
                anthropic_api_key: "test-key".to_string(),
                llm_model: "test-model".to_string(),
                llm_max_tokens: 1000,
                port: 0,
                rust_log: "info".to_string(),
                session_ttl_secs: 1800,
                session_sweep_secs: 60,
            },
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(ScriptedClient::default());
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_sessions"], 0);
    }

    #[tokio::test]
    async fn test_recommend_returns_parsed_fields() {
        let app = app(ScriptedClient::new(vec![WIGI_REPLY]));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/noa/recommend",
            Some(json!({ "scenario": WIGI_SCENARIO })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendation"]["noa_code"], "891");
        assert_eq!(body["recommendation"]["legal_authority_code"], "5 USC 5335");
        assert_eq!(body["raw_response"], WIGI_REPLY);
    }

    #[tokio::test]
    async fn test_recommend_empty_output_is_reported() {
        let app = app(ScriptedClient::new(vec![""]));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/noa/recommend",
            Some(json!({ "scenario": WIGI_SCENARIO })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "EMPTY_MODEL_OUTPUT");
        assert!(body.get("recommendation").is_none());
    }

    #[tokio::test]
    async fn test_recommend_rejects_blank_scenario() {
        let app = app(ScriptedClient::default());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/noa/recommend",
            Some(json!({ "scenario": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_stateless_chat() {
        let app = app(ScriptedClient::new(vec![PROMOTION_UPDATE]));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/noa/chat",
            Some(json!({
                "original_scenario": "Promotion to GS-13.",
                "conversation_history": [
                    {"role": "assistant", "content": "Effective date?"},
                    {"role": "user", "content": "March 3"}
                ]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendation"]["clarifications"], json!([]));
        assert_eq!(
            body["recommendation"]["required_fields"][3],
            "effective date"
        );
    }

    #[tokio::test]
    async fn test_session_dialogue_flow() {
        let app = app(ScriptedClient::new(vec![
            PROMOTION_FIRST,
            PROMOTION_UPDATE,
            PROMOTION_UPDATE,
        ]));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "scenario": "Promotion to GS-13 after competitive selection." })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["next_question"], "Effective date?");
        assert_eq!(body["dialogue"], json!({"state": "asking", "question_index": 0}));
        let id = body["session_id"].as_str().unwrap().to_string();

        let answer_uri = format!("/api/v1/sessions/{id}/answer");
        let (status, body) = send(
            &app,
            Method::POST,
            &answer_uri,
            Some(json!({ "message": "March 3" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["next_question"], "Competitive certificate number?");
        assert_eq!(
            body["recommendation"]["remarks_text"],
            "Permanent promotion to GS-13 effective March 3."
        );

        let (_, body) = send(
            &app,
            Method::POST,
            &answer_uri,
            Some(json!({ "message": "CERT-2291" })),
        )
        .await;
        assert_eq!(body["next_question"], Value::Null);
        assert_eq!(body["dialogue"], json!({"state": "exhausted"}));
        assert_eq!(body["history"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_reset_then_new_session_has_no_old_questions() {
        let app = app(ScriptedClient::new(vec![
            PROMOTION_FIRST,
            "Recommendation: NOA 721 – Reassignment. Clarifications: Is this management-directed? \
             Required SF-50 fields: Org code. OPM NOA Remarks: Reassignment.",
        ]));

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "scenario": "Promotion." })),
        )
        .await;
        let id = body["session_id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "scenario": "Office move." })),
        )
        .await;
        assert_eq!(body["next_question"], "Is this management-directed?");
        let history = body["history"].as_array().unwrap();
        assert!(history
            .iter()
            .all(|m| m["content"] != "Effective date?" && m["content"] != "Competitive certificate number?"));
    }

    #[tokio::test]
    async fn test_new_scenario_replaces_conversation() {
        let app = app(ScriptedClient::new(vec![
            PROMOTION_FIRST,
            "Recommendation: NOA 792 – Change in Duty Station. Clarifications: Telework status? \
             Required SF-50: New duty station code. OPM NOA Remarks: Moved.",
        ]));

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "scenario": "Promotion." })),
        )
        .await;
        let id = body["session_id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/scenario"),
            Some(json!({ "scenario": "Duty station changing from DC to Baltimore." })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], id.as_str());
        assert_eq!(body["recommendation"]["noa_code"], "792");
        assert_eq!(body["history"], json!([{"role": "assistant", "content": "Telework status?"}]));
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_session_state() {
        let app = app(ScriptedClient::new(vec![PROMOTION_FIRST, ""]));

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "scenario": "Promotion." })),
        )
        .await;
        let id = body["session_id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/answer"),
            Some(json!({ "message": "March 3" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, body) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["next_question"], "Effective date?");
        assert_eq!(body["turn_in_progress"], false);
        assert_eq!(body["history"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_new_scenario_leaves_no_scenario() {
        let app = app(ScriptedClient::new(vec![PROMOTION_FIRST, ""]));

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "scenario": "Promotion." })),
        )
        .await;
        let id = body["session_id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/scenario"),
            Some(json!({ "scenario": "Duty station changing from DC to Baltimore." })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, body) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dialogue"], json!({"state": "no_session"}));
        assert_eq!(body["next_question"], Value::Null);
        assert_eq!(body["history"], json!([]));

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/answer"),
            Some(json!({ "message": "March 3" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_answer_to_unknown_session_is_not_found() {
        let app = app(ScriptedClient::default());
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{}/answer", uuid::Uuid::new_v4()),
            Some(json!({ "message": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
