use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            email           TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            profile_picture TEXT NOT NULL DEFAULT '',
            bio             TEXT NOT NULL DEFAULT '',
            location        TEXT,
            website         TEXT,
            facebook        TEXT,
            twitter         TEXT,
            instagram       TEXT,
            linkedin        TEXT,
            phone_number    TEXT,
            notify_email    INTEGER NOT NULL DEFAULT 1,
            notify_push     INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS user_interests (
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            interest    TEXT NOT NULL,
            position    INTEGER NOT NULL,
            PRIMARY KEY (user_id, position)
        );

        CREATE TABLE IF NOT EXISTS events (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            date        TEXT NOT NULL,
            time        TEXT NOT NULL,
            location    TEXT NOT NULL,
            description TEXT NOT NULL,
            category    TEXT NOT NULL,
            created_by  TEXT NOT NULL REFERENCES users(id),
            lat         REAL NOT NULL,
            lng         REAL NOT NULL,
            share_count INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_events_category ON events(category);
        CREATE INDEX IF NOT EXISTS idx_events_location ON events(location);

        CREATE TABLE IF NOT EXISTS event_images (
            event_id    TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            url         TEXT NOT NULL,
            position    INTEGER NOT NULL,
            PRIMARY KEY (event_id, position)
        );

        -- Set semantics: a user appears at most once per event.
        CREATE TABLE IF NOT EXISTS event_likes (
            event_id    TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (event_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS event_interested (
            event_id    TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (event_id, user_id)
        );

        -- Ordered set of events a user has saved; position preserves
        -- save order, the primary key forbids duplicates.
        CREATE TABLE IF NOT EXISTS saved_events (
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            event_id    TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            position    INTEGER NOT NULL,
            PRIMARY KEY (user_id, event_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
