use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;
use super::{auth_token, AppState, Authenticated};
use crate::error::AdapterError;
use crate::model::area_path::AreaPath;
use crate::model::work_item::{Fields, UpdateOperation, UserInfo, WorkItem};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub organization: String,
    pub project: String,
    pub pat: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

impl LoginResponse {
    fn rejected(message: String) -> Self {
        Self {
            success: false,
            message,
            organization: None,
            project: None,
            token: None,
            user: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkItemRequest {
    pub work_item_type: String,
    #[serde(default)]
    pub fields: Fields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRelationRequest {
    pub parent_id: i64,
    pub rel_type: String,
}

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn parse_id(raw: &str) -> Result<i64, AdapterError> {
    raw.parse()
        .map_err(|_| AdapterError::invalid_input("Invalid work item ID"))
}

fn parse_index(raw: &str) -> Result<usize, AdapterError> {
    raw.parse()
        .map_err(|_| AdapterError::invalid_input("Invalid relation index"))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req))
            if !req.organization.is_empty() && !req.project.is_empty() && !req.pat.is_empty() =>
        {
            req
        }
        _ => return ApiError::bad_request("Invalid request format").into_response(),
    };

    let (token, handle) = match state
        .sessions
        .login(&req.organization, &req.project, &req.pat)
        .await
    {
        Ok(session) => session,
        Err(err) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(LoginResponse::rejected(err.to_string())),
            )
                .into_response();
        }
    };

    Json(LoginResponse {
        success: true,
        message: "Login successful".into(),
        organization: Some(req.organization),
        project: Some(req.project),
        token: Some(token),
        user: Some(handle.user_info()),
    })
    .into_response()
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token =
        auth_token(&headers).ok_or_else(|| ApiError::unauthorized("Authentication token required"))?;
    state.sessions.logout(token);
    Ok(message("Logged out successfully"))
}

pub async fn list_work_items(
    Authenticated(client): Authenticated,
) -> Result<Json<Vec<WorkItem>>, ApiError> {
    Ok(Json(client.list_work_items().await?))
}

pub async fn create_work_item(
    Authenticated(client): Authenticated,
    payload: Result<Json<CreateWorkItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WorkItem>), ApiError> {
    let req = body(payload)?;
    let item = client
        .create_work_item(&req.work_item_type, &req.fields)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_work_item(
    Authenticated(client): Authenticated,
    Path(id): Path<String>,
    payload: Result<Json<Vec<UpdateOperation>>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let updates = body(payload)?;
    client.update_work_item(id, &updates).await?;
    Ok(message("Work item updated successfully"))
}

pub async fn get_relations(
    Authenticated(client): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<WorkItem>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(client.get_work_item_with_relations(id).await?))
}

pub async fn add_relation(
    Authenticated(client): Authenticated,
    Path(id): Path<String>,
    payload: Result<Json<AddRelationRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let child_id = parse_id(&id)?;
    let req = body(payload)?;
    client
        .add_relation(child_id, req.parent_id, &req.rel_type)
        .await?;
    Ok(message("Relationship added successfully"))
}

pub async fn remove_relation(
    Authenticated(client): Authenticated,
    Path((id, index)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let index = parse_index(&index)?;
    client.remove_relation(id, index).await?;
    Ok(message("Relationship removed successfully"))
}

pub async fn list_area_paths(
    Authenticated(client): Authenticated,
) -> Result<Json<Vec<AreaPath>>, ApiError> {
    Ok(Json(client.list_area_paths().await?))
}
