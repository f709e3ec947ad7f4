pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

const READER_POOL_SIZE: usize = 4;

/// Agora database: WAL-mode SQLite with a single writer connection and a
/// small pool of read-only connections.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let writer = Connection::open(path)?;
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// In-memory database for tests. No reader pool; reads go through the
    /// writer connection.
    pub fn open_in_memory() -> Result<Self> {
        let writer = Connection::open_in_memory()?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&writer)?;
        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            reader_idx: AtomicUsize::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        if self.readers.is_empty() {
            return self.with_conn_mut(f);
        }
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| anyhow::anyhow!("Reader lock poisoned: {}", e))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Writer lock poisoned: {}", e))?;
        f(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Create a user with one verified edgeware address; returns (user_id, address_id).
    fn seed_user(db: &Database, username: &str, address: &str) -> (String, String) {
        let user_id = new_id();
        db.create_user(&user_id, username, "argon2-hash", None).unwrap();
        let address_id = new_id();
        db.create_address(
            &address_id,
            address,
            "edgeware",
            Some(&user_id),
            "token",
            "2099-01-01 00:00:00",
        )
        .unwrap();
        db.verify_address(&address_id, &user_id, "2024-01-01 00:00:00").unwrap();
        (user_id, address_id)
    }

    fn seed_thread(db: &Database, address_id: &str) -> String {
        let thread_id = new_id();
        db.insert_thread(
            &thread_id,
            address_id,
            None,
            Some("edgeware"),
            "title",
            "body",
            "discussion",
            "discussion",
            None,
            false,
        )
        .unwrap();
        thread_id
    }

    #[test]
    fn thread_query_through_collaborators() {
        let db = Database::open_in_memory().unwrap();
        let (_user, address_id) = seed_user(&db, "alice", "JhgYcbJOdWHLVFHJKLPhC12");
        let thread_id = seed_thread(&db, &address_id);

        assert!(db.add_collaborator(&thread_id, &address_id).unwrap());
        // second add is a no-op
        assert!(!db.add_collaborator(&thread_id, &address_id).unwrap());

        let thread = db.get_thread(&thread_id).unwrap().unwrap();
        assert_eq!(thread.author_address, "JhgYcbJOdWHLVFHJKLPhC12");

        let collaborators = db.get_collaborators(&thread_id).unwrap();
        assert_eq!(collaborators.len(), 1);
        assert_eq!(collaborators[0].id, address_id);
        assert!(db.is_collaborator(&thread_id, &address_id).unwrap());
    }

    #[test]
    fn merge_moves_only_owned_addresses() {
        let db = Database::open_in_memory().unwrap();
        let (old_user, addr1) = seed_user(&db, "old-account", "0xaaa");
        let (new_user, _addr2) = seed_user(&db, "new-account", "0xbbb");
        let (stranger, addr3) = seed_user(&db, "stranger", "0xccc");

        // addr3 belongs to the stranger; it must not move
        let moved = db
            .reassign_addresses(&[addr1.clone(), addr3.clone()], &old_user, &new_user)
            .unwrap();
        assert_eq!(moved, 1);

        let moved_row = db.get_address_by_id(&addr1).unwrap().unwrap();
        assert_eq!(moved_row.user_id.as_deref(), Some(new_user.as_str()));
        let stranger_row = db.get_address_by_id(&addr3).unwrap().unwrap();
        assert_eq!(stranger_row.user_id.as_deref(), Some(stranger.as_str()));
    }

    #[test]
    fn reaction_toggle_removes_on_second_call() {
        let db = Database::open_in_memory().unwrap();
        let (_user, address_id) = seed_user(&db, "alice", "0xaaa");
        let thread_id = seed_thread(&db, &address_id);

        let (added, _) = db
            .toggle_reaction(&new_id(), &address_id, Some(&thread_id), None, "like")
            .unwrap();
        assert!(added);
        assert_eq!(db.get_reactions_for_thread(&thread_id).unwrap().len(), 1);

        let (added, _) = db
            .toggle_reaction(&new_id(), &address_id, Some(&thread_id), None, "like")
            .unwrap();
        assert!(!added);
        assert!(db.get_reactions_for_thread(&thread_id).unwrap().is_empty());
    }

    #[test]
    fn chain_event_insert_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.get_or_create_event_type("edgeware-democracy-started", "edgeware", "democracy-started")
            .unwrap();

        let data = r#"{"kind":"democracy-started","referendumIndex":3}"#;
        let (first, created) = db
            .insert_chain_event(&new_id(), "edgeware-democracy-started", 100, data)
            .unwrap();
        assert!(created);

        let (replay, created) = db
            .insert_chain_event(&new_id(), "edgeware-democracy-started", 100, data)
            .unwrap();
        assert!(!created);
        assert_eq!(replay.id, first.id);
    }

    #[test]
    fn notification_read_state_is_per_user() {
        let db = Database::open_in_memory().unwrap();
        let (alice, _) = seed_user(&db, "alice", "0xaaa");
        let (bob, _) = seed_user(&db, "bob", "0xbbb");

        let sub_alice = new_id();
        db.insert_subscription(
            &sub_alice,
            &alice,
            "new-comment-creation",
            "thread-1",
            false,
            None,
            None,
            None,
            None,
            None,
        )
        .unwrap();
        let sub_bob = new_id();
        db.insert_subscription(
            &sub_bob,
            &bob,
            "new-comment-creation",
            "thread-1",
            false,
            None,
            None,
            None,
            None,
            None,
        )
        .unwrap();

        let n_alice = new_id();
        db.insert_notification(&n_alice, &sub_alice, "new-comment-creation", "{}", None, None)
            .unwrap();
        let n_bob = new_id();
        db.insert_notification(&n_bob, &sub_bob, "new-comment-creation", "{}", None, None)
            .unwrap();

        // bob cannot mark alice's notification read
        let changed = db
            .mark_notifications_read(&bob, &[n_alice.clone()])
            .unwrap();
        assert_eq!(changed, 0);
        assert_eq!(db.unread_notification_count(&alice).unwrap(), 1);

        let changed = db.mark_notifications_read(&alice, &[n_alice]).unwrap();
        assert_eq!(changed, 1);
        assert_eq!(db.unread_notification_count(&alice).unwrap(), 0);

        // clearRead only deletes read rows of the caller
        assert_eq!(db.clear_read_notifications(&alice).unwrap(), 1);
        assert_eq!(db.clear_read_notifications(&bob).unwrap(), 0);
        assert_eq!(db.unread_notification_count(&bob).unwrap(), 1);
    }

    #[test]
    fn invite_code_single_use() {
        let db = Database::open_in_memory().unwrap();
        let (user, address_id) = seed_user(&db, "alice", "0xaaa");
        db.create_community(
            "staking",
            "Staking",
            &address_id,
            "edgeware",
            None,
            queries::CommunityLinks::default(),
            false,
            true,
        )
        .unwrap();

        db.create_invite_code("CODE123", "staking", &user, None).unwrap();
        assert!(db.use_invite_code("CODE123").unwrap());
        assert!(!db.use_invite_code("CODE123").unwrap());
        assert!(!db.use_invite_code("NOPE").unwrap());
    }

    #[test]
    fn pinned_threads_do_not_repeat_on_cursored_pages() {
        let db = Database::open_in_memory().unwrap();
        let (_user, address_id) = seed_user(&db, "alice", "0xaaa");
        db.create_community(
            "gov",
            "Governance",
            &address_id,
            "edgeware",
            None,
            queries::CommunityLinks::default(),
            false,
            false,
        )
        .unwrap();

        let mut thread_ids = Vec::new();
        for day in 1..=3 {
            let thread_id = new_id();
            db.insert_thread(
                &thread_id,
                &address_id,
                Some("gov"),
                None,
                "title",
                "body",
                "discussion",
                "discussion",
                None,
                false,
            )
            .unwrap();
            db.with_conn_mut(|conn| {
                conn.execute(
                    "UPDATE threads SET created_at = ?1 WHERE id = ?2",
                    rusqlite::params![format!("2024-01-0{} 00:00:00", day), thread_id],
                )?;
                Ok(())
            })
            .unwrap();
            thread_ids.push(thread_id);
        }
        // pin the middle (oldest-but-one) thread
        db.with_conn_mut(|conn| {
            conn.execute("UPDATE threads SET pinned = 1 WHERE id = ?1", [&thread_ids[1]])?;
            Ok(())
        })
        .unwrap();

        let first_page = db.list_threads("gov", 2, None).unwrap();
        assert_eq!(first_page[0].id, thread_ids[1]);
        assert_eq!(first_page[1].id, thread_ids[2]);

        let cursor = first_page.last().unwrap().created_at.clone();
        let second_page = db.list_threads("gov", 2, Some(&cursor)).unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].id, thread_ids[0]);
    }

    #[test]
    fn touch_address_sets_last_active() {
        let db = Database::open_in_memory().unwrap();
        let (_user, address_id) = seed_user(&db, "alice", "0xaaa");

        assert!(db.get_address_by_id(&address_id).unwrap().unwrap().last_active.is_none());
        db.touch_address(&address_id).unwrap();
        assert!(db.get_address_by_id(&address_id).unwrap().unwrap().last_active.is_some());
    }

    #[test]
    fn star_toggle() {
        let db = Database::open_in_memory().unwrap();
        let (user, _) = seed_user(&db, "alice", "0xaaa");

        assert!(db.toggle_star(&new_id(), &user, None, Some("edgeware")).unwrap());
        assert_eq!(db.starred_community_ids(&user).unwrap(), vec!["edgeware".to_string()]);
        assert!(!db.toggle_star(&new_id(), &user, None, Some("edgeware")).unwrap());
        assert!(db.starred_community_ids(&user).unwrap().is_empty());
    }
}
