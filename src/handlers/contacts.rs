use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::config::{ApiConfig, MAX_PAGE_LIMIT};
use crate::database::models::{Contact, ContactModel};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

/// Resolved paging window, already range-checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub limit: i64,
    pub offset: i64,
}

impl Paging {
    pub fn from_query(query: &ListQuery, api: &ApiConfig) -> Result<Self, ApiError> {
        let max_limit = api.max_limit.min(MAX_PAGE_LIMIT);
        let limit = match query.limit {
            Some(limit) => limit,
            None => api.default_limit.clamp(0, max_limit),
        };
        if !(0..=max_limit).contains(&limit) {
            return Err(ApiError::invalid_field(
                "limit",
                format!("limit must be between 0 and {}", max_limit),
            ));
        }

        let offset = query.offset.unwrap_or(0);
        if offset < 0 {
            return Err(ApiError::invalid_field(
                "offset",
                "offset must be greater than or equal to 0",
            ));
        }

        Ok(Self { limit, offset })
    }
}

/// Ids at or past `i32::MAX + 1` are well-formed but can never name a stored row.
fn contact_id(path: Result<Path<i64>, PathRejection>) -> Result<i32, ApiError> {
    let Path(id) = path.map_err(|rejection| {
        tracing::debug!("Rejected contact id: {}", rejection.body_text());
        ApiError::invalid_field("contact_id", "contact_id must be an integer")
    })?;
    if id < 1 {
        return Err(ApiError::invalid_field(
            "contact_id",
            "contact_id must be greater than or equal to 1",
        ));
    }
    i32::try_from(id).map_err(|_| ApiError::not_found())
}

fn contact_body(
    state: &AppState,
    body: Result<Json<ContactModel>, JsonRejection>,
) -> Result<ContactModel, ApiError> {
    let Json(body) = body?;
    let body = body.normalized();
    body.validate(state.clock.today())
        .map_err(|field_errors| ApiError::unprocessable_entity("Validation failed", field_errors))?;
    Ok(body)
}

/// POST /api/contacts/
pub async fn create_contact(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    body: Result<Json<ContactModel>, JsonRejection>,
) -> ApiResult<Contact> {
    let data = contact_body(&state, body)?;
    let contact = state.contacts.create_contact(&data, &user).await?;
    Ok(ApiResponse::created(contact))
}

/// GET /api/contacts/?limit=&offset=
pub async fn get_contacts(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<Contact>> {
    let Query(query) = query?;
    let paging = Paging::from_query(&query, &state.config.api)?;
    let contacts = state
        .contacts
        .get_contacts(paging.limit, paging.offset, &user)
        .await?;
    Ok(ApiResponse::success(contacts))
}

/// GET /api/contacts/:contact_id
pub async fn get_contact_by_id(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Contact> {
    let id = contact_id(path)?;
    let contact = state
        .contacts
        .get_contact_by_id(id, &user)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(ApiResponse::success(contact))
}

/// PUT /api/contacts/:contact_id - full replacement
pub async fn update_contact(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<ContactModel>, JsonRejection>,
) -> ApiResult<Contact> {
    let id = contact_id(path)?;
    let data = contact_body(&state, body)?;
    let contact = state
        .contacts
        .update_contact(&data, id, &user)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(ApiResponse::success(contact))
}

/// DELETE /api/contacts/:contact_id
pub async fn remove_contact(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    let id = contact_id(path)?;
    let removed = state
        .contacts
        .remove_contact(id, &user)
        .await?
        .ok_or_else(ApiError::not_found)?;
    tracing::info!("User {} removed contact {}", user.id, removed.id);
    Ok(ApiResponse::no_content())
}

/// GET /api/contacts/search/?query=
pub async fn search_contacts(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Vec<Contact>> {
    let Query(query) = query?;
    let contacts = state.contacts.search_contacts(&query.query, &user).await?;
    Ok(ApiResponse::success(contacts))
}

/// GET /api/contacts/upcoming-birthdays/
pub async fn get_contacts_birthdays(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Vec<Contact>> {
    let contacts = state.contacts.get_contacts_birthdays(&user).await?;
    Ok(ApiResponse::success(contacts))
}
