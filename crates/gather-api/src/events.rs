use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use gather_db::models::{EventRow, NewEvent};
use gather_types::api::{CreateEventRequest, UpdateEventRequest};
use gather_types::models::{Coordinates, Event};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::middleware::AuthUser;

#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    pub category: Option<String>,
    pub location: Option<String>,
}

pub async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = blocking(move || {
        db.db
            .list_events(query.category.as_deref(), query.location.as_deref())
    })
    .await?;

    let events: Vec<Event> = rows.into_iter().map(event_from_row).collect();
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let row = blocking(move || db.db.get_event(&id.to_string()))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(event_from_row(row)))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_required(&[
        ("name", &req.name),
        ("date", &req.date),
        ("time", &req.time),
        ("location", &req.location),
        ("description", &req.description),
        ("category", &req.category),
    ])?;
    validate_coordinates(&req.coordinates)?;

    // Image payloads go to the store first; only the returned URLs are
    // persisted, in the order they were sent. Anything stored before a
    // failure is discarded again so no orphaned uploads are left behind.
    let mut image_urls = Vec::with_capacity(req.images.len());
    for payload in &req.images {
        match state.images.store(payload).await {
            Ok(url) => image_urls.push(url),
            Err(err) => {
                discard_images(&state.images, &image_urls).await;
                return Err(err);
            }
        }
    }

    let event_id = Uuid::new_v4();
    let db = state.clone();
    let id = event_id.to_string();
    let owner = user_id.to_string();
    let stored_urls = image_urls.clone();
    let row = blocking(move || {
        db.db.create_event(&NewEvent {
            id: &id,
            name: &req.name,
            date: &req.date,
            time: &req.time,
            location: &req.location,
            description: &req.description,
            category: &req.category,
            created_by: &owner,
            lat: req.coordinates.lat,
            lng: req.coordinates.lng,
            images: &image_urls,
        })?;
        db.db
            .get_event(&id)?
            .ok_or_else(|| anyhow::anyhow!("event {id} missing after insert"))
    })
    .await;

    let row = match row {
        Ok(row) => row,
        Err(err) => {
            discard_images(&state.images, &stored_urls).await;
            return Err(err);
        }
    };

    Ok((StatusCode::CREATED, Json(event_from_row(row))))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Fetch first: a missing event is NotFound regardless of who asks.
    let db = state.clone();
    let eid = id.to_string();
    let mut row = blocking(move || db.db.get_event(&eid))
        .await?
        .ok_or(ApiError::NotFound)?;

    ensure_owner(&row, user_id)?;

    if let Some(name) = req.name {
        row.name = name;
    }
    if let Some(date) = req.date {
        row.date = date;
    }
    if let Some(time) = req.time {
        row.time = time;
    }
    if let Some(location) = req.location {
        row.location = location;
    }
    if let Some(description) = req.description {
        row.description = description;
    }
    if let Some(category) = req.category {
        row.category = category;
    }
    if let Some(coordinates) = req.coordinates {
        validate_coordinates(&coordinates)?;
        row.lat = coordinates.lat;
        row.lng = coordinates.lng;
    }
    validate_required(&[
        ("name", &row.name),
        ("date", &row.date),
        ("time", &row.time),
        ("location", &row.location),
        ("description", &row.description),
        ("category", &row.category),
    ])?;

    let db = state.clone();
    let row = blocking(move || {
        db.db.update_event(&row)?;
        Ok(row)
    })
    .await?;

    Ok(Json(event_from_row(row)))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let eid = id.to_string();
    let row = blocking(move || db.db.get_event(&eid))
        .await?
        .ok_or(ApiError::NotFound)?;

    ensure_owner(&row, user_id)?;

    let db = state.clone();
    let eid = id.to_string();
    blocking(move || db.db.delete_event(&eid)).await?;

    Ok(Json(serde_json::json!({ "message": "event deleted" })))
}

pub async fn save_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let eid = id.to_string();
    let uid = user_id.to_string();

    let saved = blocking(move || {
        if db.db.get_event(&eid)?.is_none() {
            return Ok(None);
        }
        db.db.save_event(&uid, &eid).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    if !saved {
        return Err(ApiError::AlreadySaved);
    }

    Ok(Json(serde_json::json!({ "message": "event saved" })))
}

pub async fn like_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let eid = id.to_string();
    let uid = user_id.to_string();

    // Set-union semantics: a repeat like succeeds and changes nothing.
    let row = blocking(move || {
        if db.db.get_event(&eid)?.is_none() {
            return Ok(None);
        }
        db.db.like_event(&eid, &uid)?;
        db.db.get_event(&eid)
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(event_from_row(row)))
}

pub async fn mark_interested(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let eid = id.to_string();
    let uid = user_id.to_string();

    let row = blocking(move || {
        if db.db.get_event(&eid)?.is_none() {
            return Ok(None);
        }
        db.db.mark_interested(&eid, &uid)?;
        db.db.get_event(&eid)
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(event_from_row(row)))
}

pub async fn share_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(AuthUser(_)): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let eid = id.to_string();

    let count = blocking(move || {
        if db.db.get_event(&eid)?.is_none() {
            return Ok(None);
        }
        db.db.increment_share_count(&eid).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(serde_json::json!({ "share_count": count })))
}

async fn discard_images(images: &crate::images::ImageStore, urls: &[String]) {
    for url in urls {
        images.remove(url).await;
    }
}

/// Ownership invariant: only the creator may mutate an event. Runs after
/// the fetch and before any write.
fn ensure_owner(row: &EventRow, user_id: Uuid) -> Result<(), ApiError> {
    if row.created_by != user_id.to_string() {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

fn validate_required(fields: &[(&str, &str)]) -> Result<(), ApiError> {
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(ApiError::Validation(format!("{name} is required")));
        }
    }
    Ok(())
}

fn validate_coordinates(coordinates: &Coordinates) -> Result<(), ApiError> {
    if !coordinates.lat.is_finite()
        || !coordinates.lng.is_finite()
        || coordinates.lat.abs() > 90.0
        || coordinates.lng.abs() > 180.0
    {
        return Err(ApiError::Validation("coordinates out of range".into()));
    }
    Ok(())
}

pub(crate) fn event_from_row(row: EventRow) -> Event {
    Event {
        id: parse_uuid(&row.id, "event id"),
        name: row.name,
        date: row.date,
        time: row.time,
        location: row.location,
        description: row.description,
        category: row.category,
        created_by: parse_uuid(&row.created_by, "created_by"),
        creator_username: row.creator_username,
        images: row.images,
        coordinates: Coordinates {
            lat: row.lat,
            lng: row.lng,
        },
        likes: row.likes.iter().filter_map(|s| s.parse().ok()).collect(),
        interested: row
            .interested
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect(),
        share_count: row.share_count,
        created_at: parse_sqlite_timestamp(&row.created_at, &row.id),
    }
}

fn parse_uuid(value: &str, field: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {field} '{value}': {e}");
        Uuid::default()
    })
}

pub(crate) fn parse_sqlite_timestamp(value: &str, id: &str) -> chrono::DateTime<chrono::Utc> {
    value
        .parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{value}' on '{id}': {e}");
            chrono::DateTime::default()
        })
}
