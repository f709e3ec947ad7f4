use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                username            TEXT NOT NULL UNIQUE,
                password            TEXT NOT NULL,
                email               TEXT,
                email_verified      INTEGER NOT NULL DEFAULT 0,
                email_interval      TEXT NOT NULL DEFAULT 'never',
                is_admin            INTEGER NOT NULL DEFAULT 0,
                disable_rich_text   INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE UNIQUE INDEX idx_users_email ON users(email) WHERE email IS NOT NULL;

            CREATE TABLE chains (
                id                      TEXT PRIMARY KEY,
                name                    TEXT NOT NULL,
                network                 TEXT NOT NULL,
                base                    TEXT NOT NULL DEFAULT '',
                symbol                  TEXT NOT NULL,
                description             TEXT,
                website                 TEXT,
                discord                 TEXT,
                telegram                TEXT,
                github                  TEXT,
                icon_url                TEXT,
                active                  INTEGER NOT NULL DEFAULT 1,
                collapsed_on_homepage   INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE chain_event_types (
                id          TEXT PRIMARY KEY,
                chain       TEXT NOT NULL REFERENCES chains(id),
                event_name  TEXT NOT NULL
            );

            CREATE TABLE chain_events (
                id                      TEXT PRIMARY KEY,
                chain_event_type_id     TEXT NOT NULL REFERENCES chain_event_types(id),
                block_number            INTEGER NOT NULL,
                event_data              TEXT NOT NULL,
                created_at              TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(chain_event_type_id, block_number, event_data)
            );

            CREATE TABLE addresses (
                id                          TEXT PRIMARY KEY,
                address                     TEXT NOT NULL,
                chain                       TEXT NOT NULL REFERENCES chains(id),
                user_id                     TEXT REFERENCES users(id),
                verification_token          TEXT NOT NULL,
                verification_token_expires  TEXT NOT NULL,
                verified_at                 TEXT,
                last_active                 TEXT,
                UNIQUE(chain, address)
            );

            CREATE INDEX idx_addresses_user ON addresses(user_id);

            CREATE TABLE communities (
                id                  TEXT PRIMARY KEY,
                name                TEXT NOT NULL,
                creator_address_id  TEXT NOT NULL REFERENCES addresses(id),
                default_chain       TEXT NOT NULL REFERENCES chains(id),
                description         TEXT,
                website             TEXT,
                discord             TEXT,
                element             TEXT,
                telegram            TEXT,
                github              TEXT,
                privacy_enabled     INTEGER NOT NULL DEFAULT 0,
                invites_enabled     INTEGER NOT NULL DEFAULT 0,
                webhook_url         TEXT,
                created_at          TEXT NOT NULL DEFAULT (datetime('now')),
                deleted_at          TEXT
            );

            CREATE TABLE threads (
                id                  TEXT PRIMARY KEY,
                author_address_id   TEXT NOT NULL REFERENCES addresses(id),
                community_id        TEXT REFERENCES communities(id),
                chain_id            TEXT REFERENCES chains(id),
                title               TEXT NOT NULL,
                body                TEXT NOT NULL,
                kind                TEXT NOT NULL,
                stage               TEXT NOT NULL,
                url                 TEXT,
                read_only           INTEGER NOT NULL DEFAULT 0,
                pinned              INTEGER NOT NULL DEFAULT 0,
                version_history     TEXT NOT NULL DEFAULT '[]',
                created_at          TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at          TEXT NOT NULL DEFAULT (datetime('now')),
                deleted_at          TEXT
            );

            CREATE INDEX idx_threads_community ON threads(community_id, created_at);
            CREATE INDEX idx_threads_chain ON threads(chain_id, created_at);

            CREATE TABLE comments (
                id                  TEXT PRIMARY KEY,
                thread_id           TEXT NOT NULL REFERENCES threads(id),
                author_address_id   TEXT NOT NULL REFERENCES addresses(id),
                parent_id           TEXT REFERENCES comments(id),
                text                TEXT NOT NULL,
                version_history     TEXT NOT NULL DEFAULT '[]',
                created_at          TEXT NOT NULL DEFAULT (datetime('now')),
                deleted_at          TEXT
            );

            CREATE INDEX idx_comments_thread ON comments(thread_id, created_at);

            CREATE TABLE reactions (
                id          TEXT PRIMARY KEY,
                address_id  TEXT NOT NULL REFERENCES addresses(id),
                thread_id   TEXT REFERENCES threads(id),
                comment_id  TEXT REFERENCES comments(id),
                reaction    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE UNIQUE INDEX idx_reactions_unique
                ON reactions(address_id, COALESCE(thread_id, ''), COALESCE(comment_id, ''), reaction);

            CREATE TABLE collaborations (
                address_id  TEXT NOT NULL REFERENCES addresses(id),
                thread_id   TEXT NOT NULL REFERENCES threads(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (address_id, thread_id)
            );

            CREATE TABLE subscriptions (
                id                   TEXT PRIMARY KEY,
                subscriber_id        TEXT NOT NULL REFERENCES users(id),
                category             TEXT NOT NULL,
                object_id            TEXT NOT NULL,
                is_active            INTEGER NOT NULL DEFAULT 1,
                immediate_email      INTEGER NOT NULL DEFAULT 0,
                chain_id             TEXT REFERENCES chains(id),
                community_id         TEXT REFERENCES communities(id),
                thread_id            TEXT REFERENCES threads(id),
                comment_id           TEXT REFERENCES comments(id),
                chain_event_type_id  TEXT REFERENCES chain_event_types(id),
                created_at           TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_subscriptions_object ON subscriptions(category, object_id);
            CREATE INDEX idx_subscriptions_subscriber ON subscriptions(subscriber_id);

            CREATE TABLE notifications (
                id               TEXT PRIMARY KEY,
                subscription_id  TEXT NOT NULL REFERENCES subscriptions(id) ON DELETE CASCADE,
                category         TEXT NOT NULL,
                data             TEXT NOT NULL,
                chain_event_id   TEXT REFERENCES chain_events(id),
                thread_id        TEXT,
                is_read          INTEGER NOT NULL DEFAULT 0,
                created_at       TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_notifications_subscription
                ON notifications(subscription_id, created_at);

            CREATE TABLE starred_communities (
                id            TEXT PRIMARY KEY,
                user_id       TEXT NOT NULL REFERENCES users(id),
                community_id  TEXT REFERENCES communities(id),
                chain_id      TEXT REFERENCES chains(id),
                created_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE UNIQUE INDEX idx_starred_unique
                ON starred_communities(user_id, COALESCE(community_id, ''), COALESCE(chain_id, ''));

            CREATE TABLE invite_codes (
                code           TEXT PRIMARY KEY,
                community_id   TEXT NOT NULL REFERENCES communities(id),
                creator_id     TEXT NOT NULL REFERENCES users(id),
                invited_email  TEXT,
                used           INTEGER NOT NULL DEFAULT 0,
                created_at     TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE waitlist_registrations (
                id          TEXT PRIMARY KEY,
                user_id     TEXT REFERENCES users(id),
                email       TEXT NOT NULL,
                chain       TEXT NOT NULL REFERENCES chains(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(email, chain)
            );

            -- Seed the chains the event labeler knows about
            INSERT INTO chains (id, name, network, base, symbol) VALUES
                ('edgeware', 'Edgeware', 'substrate', 'substrate', 'EDG'),
                ('moloch', 'Moloch DAO', 'moloch', 'ethereum', 'ETH'),
                ('marlin', 'Marlin', 'compound', 'ethereum', 'LIN'),
                ('aave', 'Aave', 'aave', 'ethereum', 'AAVE');

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
