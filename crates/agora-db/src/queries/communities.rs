use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::CommunityRow;

const COMMUNITY_COLUMNS: &str = "id, name, creator_address_id, default_chain, description, \
     website, discord, element, telegram, github, privacy_enabled, invites_enabled, \
     created_at, deleted_at";

/// Optional profile fields on a community (links to external presences).
#[derive(Default)]
pub struct CommunityLinks<'a> {
    pub website: Option<&'a str>,
    pub discord: Option<&'a str>,
    pub element: Option<&'a str>,
    pub telegram: Option<&'a str>,
    pub github: Option<&'a str>,
}

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn create_community(
        &self,
        id: &str,
        name: &str,
        creator_address_id: &str,
        default_chain: &str,
        description: Option<&str>,
        links: CommunityLinks<'_>,
        privacy_enabled: bool,
        invites_enabled: bool,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO communities
                    (id, name, creator_address_id, default_chain, description, website,
                     discord, element, telegram, github, privacy_enabled, invites_enabled)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                rusqlite::params![
                    id,
                    name,
                    creator_address_id,
                    default_chain,
                    description,
                    links.website,
                    links.discord,
                    links.element,
                    links.telegram,
                    links.github,
                    privacy_enabled,
                    invites_enabled
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_community(&self, id: &str) -> Result<Option<CommunityRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM communities WHERE id = ?1 AND deleted_at IS NULL",
                COMMUNITY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_community_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_communities(&self) -> Result<Vec<CommunityRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM communities WHERE deleted_at IS NULL ORDER BY id",
                COMMUNITY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_community_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn soft_delete_community(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE communities SET deleted_at = datetime('now') WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }

    /// Toggle a community/chain star. Returns true when the star was added.
    pub fn toggle_star(
        &self,
        id: &str,
        user_id: &str,
        community_id: Option<&str>,
        chain_id: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM starred_communities
                     WHERE user_id = ?1
                       AND COALESCE(community_id, '') = COALESCE(?2, '')
                       AND COALESCE(chain_id, '') = COALESCE(?3, '')",
                    rusqlite::params![user_id, community_id, chain_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM starred_communities WHERE id = ?1", [&existing_id])?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO starred_communities (id, user_id, community_id, chain_id)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![id, user_id, community_id, chain_id],
                )?;
                Ok(true)
            }
        })
    }

    pub fn starred_community_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT COALESCE(community_id, chain_id) FROM starred_communities
                 WHERE user_id = ?1",
            )?;
            let rows = stmt
                .query_map([user_id], |row| row.get::<_, Option<String>>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().flatten().collect())
        })
    }

    pub fn set_community_webhook(&self, id: &str, webhook_url: Option<&str>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE communities SET webhook_url = ?1 WHERE id = ?2",
                rusqlite::params![webhook_url, id],
            )?;
            Ok(())
        })
    }

    pub fn community_webhook_url(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let url: Option<Option<String>> = conn
                .query_row(
                    "SELECT webhook_url FROM communities WHERE id = ?1 AND deleted_at IS NULL",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(url.flatten())
        })
    }
}

fn map_community_row(
    row: &rusqlite::Row<'_>,
) -> std::result::Result<CommunityRow, rusqlite::Error> {
    Ok(CommunityRow {
        id: row.get(0)?,
        name: row.get(1)?,
        creator_address_id: row.get(2)?,
        default_chain: row.get(3)?,
        description: row.get(4)?,
        website: row.get(5)?,
        discord: row.get(6)?,
        element: row.get(7)?,
        telegram: row.get(8)?,
        github: row.get(9)?,
        privacy_enabled: row.get(10)?,
        invites_enabled: row.get(11)?,
        created_at: row.get(12)?,
        deleted_at: row.get(13)?,
    })
}
