use axum::{Extension, Json, extract::State, response::IntoResponse};
use uuid::Uuid;

use gather_db::models::UserRow;
use gather_types::api::{ChangePasswordRequest, UpdateProfileRequest};
use gather_types::models::{Event, NotificationPreferences, Profile, SocialLinks};

use crate::auth::AppState;
use crate::error::{ApiError, blocking, map_unique_conflict};
use crate::events::event_from_row;
use crate::middleware::AuthUser;
use crate::password;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = fetch_profile(&state, user_id).await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = user_id.to_string();
    let mut user = blocking(move || db.db.get_user_by_id(&uid))
        .await?
        .ok_or(ApiError::NotFound)?;

    if let Some(username) = req.username {
        if username.trim().is_empty() {
            return Err(ApiError::Validation("username must not be empty".into()));
        }
        if username != user.username {
            let db = state.clone();
            let candidate = username.clone();
            let taken =
                blocking(move || Ok(db.db.get_user_by_username(&candidate)?.is_some())).await?;
            if taken {
                return Err(ApiError::Conflict);
            }
            user.username = username;
        }
    }
    if let Some(profile_picture) = req.profile_picture {
        user.profile_picture = profile_picture;
    }
    if let Some(bio) = req.bio {
        user.bio = bio;
    }
    if let Some(location) = req.location {
        user.location = Some(location);
    }
    if let Some(website) = req.website {
        user.website = Some(website);
    }
    if let Some(links) = req.social_links {
        user.facebook = links.facebook;
        user.twitter = links.twitter;
        user.instagram = links.instagram;
        user.linkedin = links.linkedin;
    }
    if let Some(interests) = req.interests {
        user.interests = interests;
    }
    if let Some(phone_number) = req.phone_number {
        user.phone_number = Some(phone_number);
    }
    if let Some(prefs) = req.notification_preferences {
        user.notify_email = prefs.email;
        user.notify_push = prefs.push;
    }

    let db = state.clone();
    blocking(move || db.db.update_user_profile(&user))
        .await
        .map_err(map_unique_conflict)?;

    let profile = fetch_profile(&state, user_id).await?;
    Ok(Json(profile))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.new_password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }

    let db = state.clone();
    let uid = user_id.to_string();
    let user = blocking(move || db.db.get_user_by_id(&uid))
        .await?
        .ok_or(ApiError::NotFound)?;

    if !password::verify(&req.current_password, &user.password) {
        return Err(ApiError::InvalidCredentials);
    }

    let password_hash = password::hash(&req.new_password)?;
    let db = state.clone();
    let uid = user_id.to_string();
    blocking(move || db.db.update_password(&uid, &password_hash)).await?;

    Ok(Json(serde_json::json!({ "message": "password updated" })))
}

/// The caller's record with saved events populated. A token can outlive its
/// user record, so a missing user is NotFound, not an internal error.
async fn fetch_profile(state: &AppState, user_id: Uuid) -> Result<Profile, ApiError> {
    let db = state.clone();
    let uid = user_id.to_string();

    let (user, saved_rows) = blocking(move || {
        let user = match db.db.get_user_by_id(&uid)? {
            Some(user) => user,
            None => return Ok(None),
        };
        let mut saved_rows = Vec::new();
        for event_id in db.db.get_saved_event_ids(&uid)? {
            // Saved events that have since been deleted simply drop out.
            if let Some(row) = db.db.get_event(&event_id)? {
                saved_rows.push(row);
            }
        }
        Ok(Some((user, saved_rows)))
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    let saved_events: Vec<Event> = saved_rows.into_iter().map(event_from_row).collect();
    Ok(profile_from_row(user, saved_events))
}

/// The password hash stays behind in the row; it is never serialized out.
fn profile_from_row(user: UserRow, saved_events: Vec<Event>) -> Profile {
    Profile {
        id: user.id.parse().unwrap_or_default(),
        username: user.username,
        email: user.email,
        profile_picture: user.profile_picture,
        bio: user.bio,
        location: user.location,
        website: user.website,
        social_links: SocialLinks {
            facebook: user.facebook,
            twitter: user.twitter,
            instagram: user.instagram,
            linkedin: user.linkedin,
        },
        interests: user.interests,
        phone_number: user.phone_number,
        notification_preferences: NotificationPreferences {
            email: user.notify_email,
            push: user.notify_push,
        },
        saved_events,
    }
}
