use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use grid_common::NodeStatusResponse;

use crate::error::{DirectoryError, NodeDataError};
use crate::metrics::{metrics_handler, track_requests};
use crate::query::{ListParams, ParamError, RawListQuery};
use crate::state::AppState;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    BadGateway,
    Conflict(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
    request_id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not_found", "not found".to_string()),
            ApiError::BadGateway => (
                StatusCode::BAD_GATEWAY,
                "bad_gateway",
                "bad gateway".to_string(),
            ),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m),
            ApiError::Internal(m) => {
                tracing::error!(error=%m, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
        };
        let body = ErrorResponse {
            error: ErrorDetail {
                code,
                message,
                request_id: format!("req_{}", Uuid::new_v4()),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ParamError> for ApiError {
    fn from(e: ParamError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<DirectoryError> for ApiError {
    fn from(e: DirectoryError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<NodeDataError> for ApiError {
    fn from(e: NodeDataError) -> Self {
        match e {
            NodeDataError::NotFound(_) => ApiError::NotFound,
            NodeDataError::Internal(err) => ApiError::Internal(format!("{err:#}")),
            unavailable => {
                tracing::debug!(error=%unavailable, "node data unavailable");
                ApiError::BadGateway
            }
        }
    }
}

fn parse_node_id(raw: &str) -> Result<u32, ApiError> {
    raw.parse::<u32>()
        .map_err(|_| ApiError::BadRequest(format!("invalid node id: {raw}")))
}

pub async fn index() -> impl IntoResponse {
    "welcome to grid proxy server, available endpoints [/farms, /nodes, /nodes/<node-id>, /nodes/<node-id>/status, /gateways]"
}

pub async fn version(State(st): State<AppState>) -> impl IntoResponse {
    Json(json!({ "version": st.version }))
}

pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn list_farms(
    State(st): State<AppState>,
    Query(raw): Query<RawListQuery>,
) -> Result<Response, ApiError> {
    let params = ListParams::parse(&raw, false)?;
    let farms = st.queries.list_farms(&params).await?;
    Ok(Json(farms).into_response())
}

pub async fn list_nodes(
    State(st): State<AppState>,
    Query(raw): Query<RawListQuery>,
) -> Result<Response, ApiError> {
    let params = ListParams::parse(&raw, false)?;
    let nodes = st.queries.list_nodes(&params).await?;
    Ok(Json(nodes).into_response())
}

pub async fn list_gateways(
    State(st): State<AppState>,
    Query(raw): Query<RawListQuery>,
) -> Result<Response, ApiError> {
    let params = ListParams::parse(&raw, true)?;
    let nodes = st.queries.list_nodes(&params).await?;
    Ok(Json(nodes).into_response())
}

pub async fn get_node(
    State(st): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<Response, ApiError> {
    let node_id = parse_node_id(&node_id)?;
    let payload = st.queries.get_snapshot(node_id).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], payload).into_response())
}

pub async fn get_node_status(
    State(st): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<Response, ApiError> {
    let node_id = parse_node_id(&node_id)?;
    let status = st.queries.get_status(node_id).await;
    Ok(Json(NodeStatusResponse { status }).into_response())
}

pub async fn refresh(State(st): State<AppState>) -> Result<Response, ApiError> {
    match st.queries.try_refresh_all().await {
        Some(report) => Ok(Json(report?).into_response()),
        None => Err(ApiError::Conflict(
            "a fleet refresh is already running".to_string(),
        )),
    }
}

async fn allow_any_origin(req: Request<Body>, next: Next) -> Response {
    let mut resp = next.run(req).await;
    resp.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    resp
}

pub fn router(st: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/version", get(version))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .route("/farms", get(list_farms))
        .route("/nodes", get(list_nodes))
        .route("/gateways", get(list_gateways))
        .route("/nodes/:node_id", get(get_node))
        .route("/gateways/:node_id", get(get_node))
        .route("/nodes/:node_id/status", get(get_node_status))
        .route("/gateways/:node_id/status", get(get_node_status))
        .route("/refresh", post(refresh))
        .layer(middleware::from_fn(allow_any_origin))
        .layer(middleware::from_fn_with_state(st.clone(), track_requests))
        .with_state(st)
}
