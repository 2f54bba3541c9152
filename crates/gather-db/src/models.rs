/// Database row types — these map directly to SQLite rows.
/// Distinct from gather-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile_picture: String,
    pub bio: String,
    pub location: Option<String>,
    pub website: Option<String>,
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
    pub phone_number: Option<String>,
    pub notify_email: bool,
    pub notify_push: bool,
    pub interests: Vec<String>,
    pub created_at: String,
}

pub struct EventRow {
    pub id: String,
    pub name: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub description: String,
    pub category: String,
    pub created_by: String,
    pub creator_username: String,
    pub lat: f64,
    pub lng: f64,
    pub share_count: i64,
    pub images: Vec<String>,
    pub likes: Vec<String>,
    pub interested: Vec<String>,
    pub created_at: String,
}

/// Insert shape for a new event; satellite rows (images) are written in the
/// same call.
pub struct NewEvent<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub date: &'a str,
    pub time: &'a str,
    pub location: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub created_by: &'a str,
    pub lat: f64,
    pub lng: f64,
    pub images: &'a [String],
}
