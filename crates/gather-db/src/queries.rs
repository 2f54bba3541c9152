use crate::Database;
use crate::models::{EventRow, NewEvent, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Full-row profile update: the caller merges changes into the row
    /// first. Password and email are untouched here.
    pub fn update_user_profile(&self, user: &UserRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET username = ?1, profile_picture = ?2, bio = ?3,
                 location = ?4, website = ?5, facebook = ?6, twitter = ?7,
                 instagram = ?8, linkedin = ?9, phone_number = ?10,
                 notify_email = ?11, notify_push = ?12
                 WHERE id = ?13",
                rusqlite::params![
                    user.username,
                    user.profile_picture,
                    user.bio,
                    user.location,
                    user.website,
                    user.facebook,
                    user.twitter,
                    user.instagram,
                    user.linkedin,
                    user.phone_number,
                    user.notify_email,
                    user.notify_push,
                    user.id,
                ],
            )?;

            conn.execute("DELETE FROM user_interests WHERE user_id = ?1", [&user.id])?;
            for (i, interest) in user.interests.iter().enumerate() {
                conn.execute(
                    "INSERT INTO user_interests (user_id, interest, position) VALUES (?1, ?2, ?3)",
                    rusqlite::params![user.id, interest, i as i64],
                )?;
            }
            Ok(())
        })
    }

    pub fn update_password(&self, id: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                (password_hash, id),
            )?;
            Ok(())
        })
    }

    /// Append an event to the user's saved set. Returns false if it was
    /// already saved; the set is never mutated in that case.
    pub fn save_event(&self, user_id: &str, event_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let already: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM saved_events WHERE user_id = ?1 AND event_id = ?2",
                    (user_id, event_id),
                    |row| row.get(0),
                )
                .optional()?;
            if already.is_some() {
                return Ok(false);
            }

            // MAX + 1 rather than COUNT: cascade deletes leave holes, and a
            // reused position would break the saved-order guarantee.
            conn.execute(
                "INSERT INTO saved_events (user_id, event_id, position)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(position) + 1, 0)
                                  FROM saved_events WHERE user_id = ?1))",
                (user_id, event_id),
            )?;
            Ok(true)
        })
    }

    pub fn get_saved_event_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT event_id FROM saved_events WHERE user_id = ?1 ORDER BY position",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
    }

    // -- Events --

    pub fn create_event(&self, event: &NewEvent<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (id, name, date, time, location, description,
                 category, created_by, lat, lng)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    event.id,
                    event.name,
                    event.date,
                    event.time,
                    event.location,
                    event.description,
                    event.category,
                    event.created_by,
                    event.lat,
                    event.lng,
                ],
            )?;
            for (i, url) in event.images.iter().enumerate() {
                conn.execute(
                    "INSERT INTO event_images (event_id, url, position) VALUES (?1, ?2, ?3)",
                    rusqlite::params![event.id, url, i as i64],
                )?;
            }
            Ok(())
        })
    }

    pub fn get_event(&self, id: &str) -> Result<Option<EventRow>> {
        self.with_conn(|conn| {
            let row = query_event_header(conn, "WHERE e.id = ?1", &[&id])?.into_iter().next();
            match row {
                Some(mut event) => {
                    load_event_satellites(conn, &mut event)?;
                    Ok(Some(event))
                }
                None => Ok(None),
            }
        })
    }

    /// List events, optionally filtered by exact category and/or location.
    pub fn list_events(&self, category: Option<&str>, location: Option<&str>) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let mut clauses: Vec<&str> = Vec::new();
            let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::new();
            if let Some(category) = &category {
                clauses.push("e.category = ?");
                params.push(category);
            }
            if let Some(location) = &location {
                clauses.push("e.location = ?");
                params.push(location);
            }
            let where_clause = if clauses.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", clauses.join(" AND "))
            };

            let mut events = query_event_header(conn, &where_clause, &params)?;
            for event in &mut events {
                load_event_satellites(conn, event)?;
            }
            Ok(events)
        })
    }

    /// Full-row update of the mutable event columns. `created_by`,
    /// `images`, and counters are untouched.
    pub fn update_event(&self, event: &EventRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE events SET name = ?1, date = ?2, time = ?3, location = ?4,
                 description = ?5, category = ?6, lat = ?7, lng = ?8
                 WHERE id = ?9",
                rusqlite::params![
                    event.name,
                    event.date,
                    event.time,
                    event.location,
                    event.description,
                    event.category,
                    event.lat,
                    event.lng,
                    event.id,
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_event(&self, id: &str) -> Result<()> {
        // Satellite rows (images, likes, interested, saves) cascade.
        self.with_conn(|conn| {
            conn.execute("DELETE FROM events WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Set-union semantics: inserting an existing (event, user) pair is a
    /// no-op. Returns whether the user was newly added.
    pub fn like_event(&self, event_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO event_likes (event_id, user_id) VALUES (?1, ?2)",
                (event_id, user_id),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn mark_interested(&self, event_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO event_interested (event_id, user_id) VALUES (?1, ?2)",
                (event_id, user_id),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn increment_share_count(&self, event_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE events SET share_count = share_count + 1 WHERE id = ?1",
                [event_id],
            )?;
            let count = conn.query_row(
                "SELECT share_count FROM events WHERE id = ?1",
                [event_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always a fixed identifier supplied by this crate.
    let sql = format!(
        "SELECT id, username, email, password, profile_picture, bio, location,
         website, facebook, twitter, instagram, linkedin, phone_number,
         notify_email, notify_push, created_at
         FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                profile_picture: row.get(4)?,
                bio: row.get(5)?,
                location: row.get(6)?,
                website: row.get(7)?,
                facebook: row.get(8)?,
                twitter: row.get(9)?,
                instagram: row.get(10)?,
                linkedin: row.get(11)?,
                phone_number: row.get(12)?,
                notify_email: row.get(13)?,
                notify_push: row.get(14)?,
                interests: Vec::new(),
                created_at: row.get(15)?,
            })
        })
        .optional()?;

    match row {
        Some(mut user) => {
            let mut stmt = conn.prepare(
                "SELECT interest FROM user_interests WHERE user_id = ?1 ORDER BY position",
            )?;
            user.interests = stmt
                .query_map([&user.id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

fn query_event_header(
    conn: &Connection,
    where_clause: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<EventRow>> {
    // JOIN users to fetch creator_username in a single query (eliminates N+1)
    let sql = format!(
        "SELECT e.id, e.name, e.date, e.time, e.location, e.description,
         e.category, e.created_by, u.username, e.lat, e.lng, e.share_count,
         e.created_at
         FROM events e
         LEFT JOIN users u ON e.created_by = u.id
         {}
         ORDER BY e.created_at DESC",
        where_clause
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map(params, |row| {
            Ok(EventRow {
                id: row.get(0)?,
                name: row.get(1)?,
                date: row.get(2)?,
                time: row.get(3)?,
                location: row.get(4)?,
                description: row.get(5)?,
                category: row.get(6)?,
                created_by: row.get(7)?,
                creator_username: row
                    .get::<_, Option<String>>(8)?
                    .unwrap_or_else(|| "unknown".to_string()),
                lat: row.get(9)?,
                lng: row.get(10)?,
                share_count: row.get(11)?,
                images: Vec::new(),
                likes: Vec::new(),
                interested: Vec::new(),
                created_at: row.get(12)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn load_event_satellites(conn: &Connection, event: &mut EventRow) -> Result<()> {
    let mut stmt =
        conn.prepare("SELECT url FROM event_images WHERE event_id = ?1 ORDER BY position")?;
    event.images = stmt
        .query_map([&event.id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    let mut stmt = conn.prepare("SELECT user_id FROM event_likes WHERE event_id = ?1")?;
    event.likes = stmt
        .query_map([&event.id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    let mut stmt = conn.prepare("SELECT user_id FROM event_interested WHERE event_id = ?1")?;
    event.interested = stmt
        .query_map([&event.id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(())
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_user(db: &Database, username: &str, email: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, email, "argon2-digest").unwrap();
        id
    }

    fn add_event(db: &Database, owner: &str, name: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_event(&NewEvent {
            id: &id,
            name,
            date: "2026-09-12",
            time: "19:00",
            location: "Berlin",
            description: "A meetup",
            category: "tech",
            created_by: owner,
            lat: 52.52,
            lng: 13.405,
            images: &["/uploads/a.png".to_string(), "/uploads/b.png".to_string()],
        })
        .unwrap();
        id
    }

    #[test]
    fn duplicate_username_rejected() {
        let db = test_db();
        add_user(&db, "alice", "alice@example.com");
        let res = db.create_user(
            &Uuid::new_v4().to_string(),
            "alice",
            "other@example.com",
            "digest",
        );
        assert!(res.is_err());
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = test_db();
        add_user(&db, "alice", "alice@example.com");
        let res = db.create_user(
            &Uuid::new_v4().to_string(),
            "bob",
            "alice@example.com",
            "digest",
        );
        assert!(res.is_err());
    }

    #[test]
    fn user_lookup_roundtrip() {
        let db = test_db();
        let id = add_user(&db, "alice", "alice@example.com");

        let by_email = db.get_user_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert_eq!(by_email.username, "alice");

        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn event_roundtrip_with_creator_and_images() {
        let db = test_db();
        let owner = add_user(&db, "alice", "alice@example.com");
        let event_id = add_event(&db, &owner, "RustFest");

        let event = db.get_event(&event_id).unwrap().unwrap();
        assert_eq!(event.name, "RustFest");
        assert_eq!(event.created_by, owner);
        assert_eq!(event.creator_username, "alice");
        assert_eq!(event.images, vec!["/uploads/a.png", "/uploads/b.png"]);
        assert_eq!(event.share_count, 0);
    }

    #[test]
    fn list_events_filters_by_category() {
        let db = test_db();
        let owner = add_user(&db, "alice", "alice@example.com");
        add_event(&db, &owner, "RustFest");

        let all = db.list_events(None, None).unwrap();
        assert_eq!(all.len(), 1);

        let tech = db.list_events(Some("tech"), None).unwrap();
        assert_eq!(tech.len(), 1);

        let music = db.list_events(Some("music"), None).unwrap();
        assert!(music.is_empty());

        let wrong_city = db.list_events(Some("tech"), Some("Paris")).unwrap();
        assert!(wrong_city.is_empty());
    }

    #[test]
    fn save_twice_is_rejected_and_set_stays_single() {
        let db = test_db();
        let user = add_user(&db, "alice", "alice@example.com");
        let event = add_event(&db, &user, "RustFest");

        assert!(db.save_event(&user, &event).unwrap());
        assert!(!db.save_event(&user, &event).unwrap());

        let saved = db.get_saved_event_ids(&user).unwrap();
        assert_eq!(saved, vec![event]);
    }

    #[test]
    fn saved_events_preserve_order() {
        let db = test_db();
        let user = add_user(&db, "alice", "alice@example.com");
        let first = add_event(&db, &user, "First");
        let second = add_event(&db, &user, "Second");

        db.save_event(&user, &first).unwrap();
        db.save_event(&user, &second).unwrap();

        assert_eq!(db.get_saved_event_ids(&user).unwrap(), vec![first, second]);
    }

    #[test]
    fn saved_order_survives_cascade_deletes() {
        let db = test_db();
        let user = add_user(&db, "alice", "alice@example.com");
        let first = add_event(&db, &user, "First");
        let second = add_event(&db, &user, "Second");
        let third = add_event(&db, &user, "Third");
        let fourth = add_event(&db, &user, "Fourth");

        db.save_event(&user, &first).unwrap();
        db.save_event(&user, &second).unwrap();
        db.save_event(&user, &third).unwrap();

        // Deleting events frees their positions; a later save must not
        // slot in before the surviving entries.
        db.delete_event(&first).unwrap();
        db.delete_event(&second).unwrap();
        db.save_event(&user, &fourth).unwrap();

        assert_eq!(db.get_saved_event_ids(&user).unwrap(), vec![third, fourth]);
    }

    #[test]
    fn like_twice_is_idempotent() {
        let db = test_db();
        let user = add_user(&db, "alice", "alice@example.com");
        let event = add_event(&db, &user, "RustFest");

        assert!(db.like_event(&event, &user).unwrap());
        assert!(!db.like_event(&event, &user).unwrap());

        let row = db.get_event(&event).unwrap().unwrap();
        assert_eq!(row.likes, vec![user]);
    }

    #[test]
    fn interested_twice_is_idempotent() {
        let db = test_db();
        let user = add_user(&db, "alice", "alice@example.com");
        let event = add_event(&db, &user, "RustFest");

        assert!(db.mark_interested(&event, &user).unwrap());
        assert!(!db.mark_interested(&event, &user).unwrap());

        let row = db.get_event(&event).unwrap().unwrap();
        assert_eq!(row.interested, vec![user]);
    }

    #[test]
    fn delete_event_cascades_to_satellites() {
        let db = test_db();
        let user = add_user(&db, "alice", "alice@example.com");
        let event = add_event(&db, &user, "RustFest");
        db.save_event(&user, &event).unwrap();
        db.like_event(&event, &user).unwrap();

        db.delete_event(&event).unwrap();

        assert!(db.get_event(&event).unwrap().is_none());
        assert!(db.get_saved_event_ids(&user).unwrap().is_empty());
    }

    #[test]
    fn update_event_changes_persist() {
        let db = test_db();
        let user = add_user(&db, "alice", "alice@example.com");
        let event_id = add_event(&db, &user, "RustFest");

        let mut event = db.get_event(&event_id).unwrap().unwrap();
        event.name = "RustFest 2026".to_string();
        event.location = "Hamburg".to_string();
        db.update_event(&event).unwrap();

        let reloaded = db.get_event(&event_id).unwrap().unwrap();
        assert_eq!(reloaded.name, "RustFest 2026");
        assert_eq!(reloaded.location, "Hamburg");
        // created_by is immutable
        assert_eq!(reloaded.created_by, user);
    }

    #[test]
    fn share_count_increments() {
        let db = test_db();
        let user = add_user(&db, "alice", "alice@example.com");
        let event = add_event(&db, &user, "RustFest");

        assert_eq!(db.increment_share_count(&event).unwrap(), 1);
        assert_eq!(db.increment_share_count(&event).unwrap(), 2);
    }

    #[test]
    fn profile_update_rewrites_interests() {
        let db = test_db();
        let id = add_user(&db, "alice", "alice@example.com");

        let mut user = db.get_user_by_id(&id).unwrap().unwrap();
        user.bio = "Rustacean".to_string();
        user.interests = vec!["rust".to_string(), "climbing".to_string()];
        db.update_user_profile(&user).unwrap();

        let reloaded = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(reloaded.bio, "Rustacean");
        assert_eq!(reloaded.interests, vec!["rust", "climbing"]);
    }
}
