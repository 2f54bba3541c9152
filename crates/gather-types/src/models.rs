use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A public event listing. This is also the wire shape returned by the
/// events endpoints; the creator's username is joined in so clients don't
/// need a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub description: String,
    pub category: String,
    pub created_by: Uuid,
    pub creator_username: String,
    pub images: Vec<String>,
    pub coordinates: Coordinates,
    pub likes: Vec<Uuid>,
    pub interested: Vec<Uuid>,
    pub share_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialLinks {
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub email: bool,
    pub push: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
        }
    }
}

/// A user's own view of their account. The password hash never appears here;
/// it stays inside gather-db.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_picture: String,
    pub bio: String,
    pub location: Option<String>,
    pub website: Option<String>,
    pub social_links: SocialLinks,
    pub interests: Vec<String>,
    pub phone_number: Option<String>,
    pub notification_preferences: NotificationPreferences,
    pub saved_events: Vec<Event>,
}
