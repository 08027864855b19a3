//! Read-only JSON HTTP server over a prepared dataset.
//!
//! The dataset is built once before the listener starts and shared as an
//! `Arc<Dataset>`; handlers only read it, so no locking is involved.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Health check (returns version) |
//! | `GET` | `/summary` | Record counts |
//! | `GET` | `/conversations` | Conversation ids with turn counts |
//! | `GET` | `/conversations/{id}` | All turns of one conversation |
//! | `GET` | `/evidence/{modality}/{id}` | Full evidence record |
//! | `GET` | `/tables/{id}` | Reconstructed table, nothing highlighted |
//! | `GET` | `/turns/{qid}/table` | The turn's table with answer cells highlighted |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "image evidence not found: img9" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `malformed_table` (422).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use mmcoqa_core::conversation::Conversation;
use mmcoqa_core::dataset::{Dataset, DatasetSummary};
use mmcoqa_core::lookup::EvidenceRecord;
use mmcoqa_core::models::Modality;
use mmcoqa_core::table::{HighlightedTable, RaggedRows};
use mmcoqa_core::DataError;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;

#[derive(Clone)]
struct AppState {
    dataset: Arc<Dataset>,
    ragged: RaggedRows,
}

/// Serve `dataset` on `[server].bind` until the process is terminated.
pub async fn run_server(config: &Config, dataset: Dataset) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(dataset), config.loading.ragged_tables);

    println!("MMCoQA explorer listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router; separated from [`run_server`] so tests can drive it.
pub fn router(dataset: Arc<Dataset>, ragged: RaggedRows) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/summary", get(handle_summary))
        .route("/conversations", get(handle_conversations))
        .route("/conversations/{id}", get(handle_conversation))
        .route("/evidence/{modality}/{id}", get(handle_evidence))
        .route("/tables/{id}", get(handle_table))
        .route("/turns/{qid}/table", get(handle_turn_table))
        .layer(cors)
        .with_state(AppState { dataset, ragged })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::MalformedTable { .. } => AppError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                code: "malformed_table",
                message: err.to_string(),
            },
            other => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal",
                message: other.to_string(),
            },
        }
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_summary(State(state): State<AppState>) -> Json<DatasetSummary> {
    Json(state.dataset.summary())
}

#[derive(Serialize)]
struct ConversationEntry {
    id: String,
    turns: usize,
}

#[derive(Serialize)]
struct ConversationList {
    conversations: Vec<ConversationEntry>,
}

async fn handle_conversations(State(state): State<AppState>) -> Json<ConversationList> {
    let conversations = state
        .dataset
        .conversations
        .sorted_ids()
        .into_iter()
        .filter_map(|id| state.dataset.conversations.get(id))
        .map(|c| ConversationEntry {
            id: c.id.clone(),
            turns: c.turns.len(),
        })
        .collect();
    Json(ConversationList { conversations })
}

async fn handle_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, AppError> {
    state
        .dataset
        .conversations
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(format!("conversation not found: {}", id)))
}

async fn handle_evidence(
    State(state): State<AppState>,
    Path((modality, id)): Path<(String, String)>,
) -> Result<Json<EvidenceRecord>, AppError> {
    let modality: Modality = modality.parse().map_err(bad_request)?;
    state
        .dataset
        .resolve(modality, &id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(format!("{} evidence not found: {}", modality, id)))
}

async fn handle_table(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HighlightedTable>, AppError> {
    state
        .dataset
        .table(&id, state.ragged)?
        .map(Json)
        .ok_or_else(|| not_found(format!("table evidence not found: {}", id)))
}

async fn handle_turn_table(
    State(state): State<AppState>,
    Path(qid): Path<String>,
) -> Result<Json<HighlightedTable>, AppError> {
    let turn = state
        .dataset
        .conversations
        .turn(&qid)
        .ok_or_else(|| not_found(format!("turn not found: {}", qid)))?;
    let table_id = turn
        .table_id
        .as_deref()
        .ok_or_else(|| not_found(format!("turn {} has no table", qid)))?;

    state
        .dataset
        .turn_table(turn, state.ragged)?
        .map(Json)
        .ok_or_else(|| not_found(format!("table evidence not found: {}", table_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use mmcoqa_core::conversation::group_by_conversation;
    use mmcoqa_core::lookup::{EvidenceLookup, IndexOptions};
    use mmcoqa_core::models::QuestionTurn;
    use mmcoqa_core::{Record, Strictness};
    use serde_json::json;
    use tower::ServiceExt;

    fn rec(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn dataset() -> Arc<Dataset> {
        let turn = QuestionTurn::from_record(
            rec(json!({
                "qid": "C_7_1",
                "question": "Which year?",
                "table_id": "t1",
                "answer": [{"answer": "2020", "modality": "table", "table_indices": [[0, 1]]}]
            })),
            "questions",
            1,
        )
        .unwrap();
        let tables = vec![
            rec(json!({
                "id": "t1",
                "header": [{"column_name": "Name"}, {"column_name": "Year"}],
                "table_rows": [[{"text": "X"}, {"text": "2020"}]]
            })),
            rec(json!({
                "id": "ragged",
                "header": [{"column_name": "A"}],
                "table_rows": [[{"text": "1"}, {"text": "2"}]]
            })),
        ];
        Arc::new(Dataset {
            conversations: group_by_conversation(vec![turn], Strictness::Strict).unwrap(),
            images: EvidenceLookup::build(
                vec![rec(json!({"id": "img1", "path": "img1.jpg"}))],
                IndexOptions::default(),
            )
            .unwrap(),
            tables: EvidenceLookup::build(tables, IndexOptions::default()).unwrap(),
            texts: EvidenceLookup::default(),
        })
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router(dataset(), RaggedRows::Strict);
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_conversations_listing() {
        let (status, body) = get_json("/conversations").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["conversations"][0]["id"], "C_7");
        assert_eq!(body["conversations"][0]["turns"], 1);
    }

    #[tokio::test]
    async fn test_conversation_turns() {
        let (status, body) = get_json("/conversations/C_7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["turns"][0]["qid"], "C_7_1");

        let (status, body) = get_json("/conversations/C_99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn test_evidence_lookup() {
        let (status, body) = get_json("/evidence/image/img1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["path"], "img1.jpg");

        let (status, _) = get_json("/evidence/table/img1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get_json("/evidence/audio/img1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_turn_table_highlight() {
        let (status, body) = get_json("/turns/C_7_1/table").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table"]["columns"], json!(["Name", "Year"]));
        assert_eq!(body["highlight"]["cells"], json!([[false, true]]));
    }

    #[tokio::test]
    async fn test_health_reports_version() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let (status, body) = get_json("/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["questions"], 1);
        assert_eq!(body["conversations"], 1);
        assert_eq!(body["images"], 1);
        assert_eq!(body["tables"], 2);
        assert_eq!(body["texts"], 0);
    }

    #[tokio::test]
    async fn test_table_without_highlight() {
        let (status, body) = get_json("/tables/t1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table_id"], "t1");
        assert_eq!(body["table"]["rows"], json!([["X", "2020"]]));
        assert_eq!(body["highlight"]["cells"], json!([[false, false]]));

        let (status, body) = get_json("/tables/t9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "table evidence not found: t9");
    }

    #[tokio::test]
    async fn test_malformed_table_is_422() {
        let (status, body) = get_json("/tables/ragged").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "malformed_table");
    }
}
