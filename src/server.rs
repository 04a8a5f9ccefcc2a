//! Inkbit HTTP server
//!
//! REST surface over the content and auth layers. One generic set of
//! handlers covers every governed resource; the error envelope is
//! `{"success": false, "message": ...}` with the taxonomy's status codes.

use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{Error, Result};
use crate::model::{Caller, Page, Resource};
use crate::{auth, bootstrap, content, resolve};

#[derive(Serialize)]
struct Fail {
    success: bool,
    message: String,
}

type Reject = (StatusCode, Json<Fail>);
type Reply<T> = std::result::Result<Json<T>, Reject>;

fn fail(e: Error) -> Reject {
    let status = StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = if status.is_server_error() {
        tracing::error!("internal error: {e}");
        "internal error".to_string()
    } else {
        e.to_string()
    };
    (
        status,
        Json(Fail {
            success: false,
            message,
        }),
    )
}

fn bearer(headers: &HeaderMap) -> Result<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(Error::Unauthorized)
}

fn caller(headers: &HeaderMap) -> Result<Caller> {
    resolve::caller_for_token(bearer(headers)?)
}

fn resource(name: &str) -> Result<Resource> {
    Resource::from_name(name).ok_or_else(|| Error::NotFound(format!("no such resource: {name}")))
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Deserialize)]
struct BootstrapReq {
    name: String,
    password: String,
}

async fn boot(Json(req): Json<BootstrapReq>) -> Reply<Value> {
    let b = bootstrap::bootstrap(&req.name, &req.password).map_err(fail)?;
    Ok(Json(json!({
        "success": true,
        "rootUser": b.root_user,
        "token": b.token,
    })))
}

#[derive(Deserialize)]
struct LoginReq {
    name: String,
    password: String,
}

async fn login(Json(req): Json<LoginReq>) -> Reply<Value> {
    let token = auth::login(&req.name, &req.password).map_err(fail)?;
    Ok(Json(json!({ "success": true, "token": token })))
}

#[derive(Deserialize)]
struct ExternReq {
    provider: String,
    subject: String,
}

async fn extern_login(Json(req): Json<ExternReq>) -> Reply<Value> {
    let token = auth::extern_login(&req.provider, &req.subject).map_err(fail)?;
    Ok(Json(json!({ "success": true, "token": token })))
}

async fn logout(headers: HeaderMap) -> Reply<Value> {
    let token = bearer(&headers).map_err(fail)?;
    auth::revoke_session(token).map_err(fail)?;
    Ok(Json(json!({ "success": true })))
}

async fn sessions(headers: HeaderMap) -> Reply<Value> {
    let c = caller(&headers).map_err(fail)?;
    let sessions: Vec<Value> = auth::list_sessions(c.id)
        .map_err(fail)?
        .into_iter()
        .map(|s| json!({ "createdAt": s.created_at, "expiresAt": s.expires_at }))
        .collect();
    Ok(Json(Value::Array(sessions)))
}

async fn list_records(
    headers: HeaderMap,
    Path(res): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Reply<Value> {
    let c = caller(&headers).map_err(fail)?;
    let r = resource(&res).map_err(fail)?;
    let mut page = Page::default();
    let mut filters = Vec::new();
    for (k, v) in query {
        match k.as_str() {
            "offset" => {
                page.offset = v
                    .parse()
                    .map_err(|_| fail(Error::BadRequest(format!("invalid offset: {v}"))))?
            }
            "limit" => {
                page.limit = v
                    .parse()
                    .map_err(|_| fail(Error::BadRequest(format!("invalid limit: {v}"))))?
            }
            _ => filters.push((k, v)),
        }
    }
    let rows = content::list(&c, r, page, &filters).map_err(fail)?;
    Ok(Json(Value::Array(rows)))
}

async fn create_record(
    headers: HeaderMap,
    Path(res): Path<String>,
    Json(doc): Json<Value>,
) -> std::result::Result<(StatusCode, Json<Value>), Reject> {
    let c = caller(&headers).map_err(fail)?;
    let r = resource(&res).map_err(fail)?;
    let doc = content::create(&c, r, doc).map_err(fail)?;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn get_record(headers: HeaderMap, Path((res, id)): Path<(String, u64)>) -> Reply<Value> {
    let c = caller(&headers).map_err(fail)?;
    let r = resource(&res).map_err(fail)?;
    Ok(Json(content::get(&c, r, id).map_err(fail)?))
}

async fn update_record(
    headers: HeaderMap,
    Path((res, id)): Path<(String, u64)>,
    Json(patch): Json<Value>,
) -> Reply<Value> {
    let c = caller(&headers).map_err(fail)?;
    let r = resource(&res).map_err(fail)?;
    Ok(Json(content::update(&c, r, id, patch).map_err(fail)?))
}

async fn delete_record(headers: HeaderMap, Path((res, id)): Path<(String, u64)>) -> Reply<Value> {
    let c = caller(&headers).map_err(fail)?;
    let r = resource(&res).map_err(fail)?;
    content::delete(&c, r, id).map_err(fail)?;
    Ok(Json(json!({ "success": true })))
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/bootstrap", post(boot))
        // Auth
        .route("/auth/login", post(login))
        .route("/auth/extern", post(extern_login))
        .route("/auth/logout", post(logout))
        .route("/auth/sessions", get(sessions))
        // Content
        .route("/api/:resource", get(list_records).post(create_record))
        .route(
            "/api/:resource/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
