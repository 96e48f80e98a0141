//! Ministry closure-table repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Maintain `ministry_hierarchy`, the materialized transitive closure of the
//!   `ministries.parent_id` forest.
//! - Answer ancestor/descendant and depth aggregate queries without recursion.
//!
//! # Invariants
//! - Every ministry has exactly one self-edge `(id, id, 0)`.
//! - For each `parent -> child` and each ancestor `a` of `parent`,
//!   `(a, child, depth(a, parent) + 1)` exists.
//! - Every mutating call is one transaction; readers never see a partial
//!   edge set.
//! - Duplicate edge inserts are absorbed (`INSERT OR IGNORE`), never errors.

use crate::db::{run_in_transaction, DbError};
use crate::model::ministry::MinistryId;
use crate::repo::{ensure_table_ready, parse_uuid, placeholders, ReadinessError, SchemaError};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by closure-table repository operations.
pub type HierarchyRepoResult<T> = Result<T, HierarchyRepoError>;

/// Errors from closure-table repository operations.
#[derive(Debug)]
pub enum HierarchyRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Referenced ministry row does not exist.
    MinistryNotFound(MinistryId),
    /// Re-parent target sits inside the subtree being moved.
    WouldCreateCycle {
        moved_id: MinistryId,
        new_parent_id: MinistryId,
    },
    /// Connection is not ready for closure operations.
    Schema(SchemaError),
    /// Persisted data cannot be converted to valid read model.
    InvalidData(String),
}

impl Display for HierarchyRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::MinistryNotFound(id) => write!(f, "ministry not found: {id}"),
            Self::WouldCreateCycle {
                moved_id,
                new_parent_id,
            } => write!(
                f,
                "moving ministry {moved_id} under {new_parent_id} would create a cycle"
            ),
            Self::Schema(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid hierarchy data: {message}"),
        }
    }
}

impl Error for HierarchyRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::MinistryNotFound(_) => None,
            Self::WouldCreateCycle { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for HierarchyRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for HierarchyRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ReadinessError> for HierarchyRepoError {
    fn from(value: ReadinessError) -> Self {
        match value {
            ReadinessError::Sqlite(err) => err.into(),
            ReadinessError::Schema(err) => Self::Schema(err),
        }
    }
}

/// One materialized `(ancestor, descendant, depth)` fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClosureEdge {
    pub ancestor_id: MinistryId,
    pub descendant_id: MinistryId,
    pub depth: u32,
}

/// Candidate that won a min-of-max-depth query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescentDepth {
    pub ministry_id: MinistryId,
    /// Largest depth recorded on any edge ending at this ministry.
    pub depth: u32,
    pub name: String,
}

/// Repository interface for closure-table maintenance and queries.
pub trait HierarchyRepository {
    /// Inserts `(new_id, new_id, 0)` plus one edge per ancestor of `parent_id`.
    fn insert_self_and_ancestors(
        &self,
        new_id: MinistryId,
        parent_id: Option<MinistryId>,
    ) -> HierarchyRepoResult<()>;
    /// Re-links the subtree rooted at `moved_id` under `new_parent_id`
    /// (`None` = make it a root).
    fn move_subtree(
        &self,
        moved_id: MinistryId,
        new_parent_id: Option<MinistryId>,
    ) -> HierarchyRepoResult<()>;
    /// Discards every edge and recomputes the closure from `ministries.parent_id`.
    /// Returns the number of edges written.
    fn rebuild_all(&self) -> HierarchyRepoResult<usize>;
    /// Candidates whose max incoming depth equals the minimum over the set.
    fn min_of_max_depth_among(
        &self,
        candidate_ids: &BTreeSet<MinistryId>,
    ) -> HierarchyRepoResult<Vec<DescentDepth>>;
    /// Edges ending at `id`, self-edge first.
    fn ancestors_of(&self, id: MinistryId) -> HierarchyRepoResult<Vec<ClosureEdge>>;
    /// Edges starting at `id`, self-edge first.
    fn descendants_of(&self, id: MinistryId) -> HierarchyRepoResult<Vec<ClosureEdge>>;
    /// Whether `candidate` is `ancestor` itself or sits below it.
    fn is_descendant(
        &self,
        ancestor: MinistryId,
        candidate: MinistryId,
    ) -> HierarchyRepoResult<bool>;
    /// Full edge set in `(ancestor, descendant)` order.
    fn edges(&self) -> HierarchyRepoResult<Vec<ClosureEdge>>;
}

/// SQLite-backed closure-table repository.
pub struct SqliteHierarchyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHierarchyRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> HierarchyRepoResult<Self> {
        ensure_table_ready(
            conn,
            "ministry_hierarchy",
            &["ancestor_id", "descendant_id", "depth"],
        )?;
        Ok(Self { conn })
    }
}

impl HierarchyRepository for SqliteHierarchyRepository<'_> {
    fn insert_self_and_ancestors(
        &self,
        new_id: MinistryId,
        parent_id: Option<MinistryId>,
    ) -> HierarchyRepoResult<()> {
        run_in_transaction(self.conn, |tx| -> HierarchyRepoResult<()> {
            ensure_ministry_exists(tx, new_id)?;
            insert_self_edge(tx, new_id)?;

            if let Some(parent_id) = parent_id {
                ensure_ministry_exists(tx, parent_id)?;
                // The parent's own self-edge yields (parent, new, 1).
                tx.execute(
                    "INSERT OR IGNORE INTO ministry_hierarchy (ancestor_id, descendant_id, depth)
                     SELECT ancestor_id, ?1, depth + 1
                     FROM ministry_hierarchy
                     WHERE descendant_id = ?2;",
                    params![new_id.to_string(), parent_id.to_string()],
                )?;
            }
            Ok(())
        })
    }

    fn move_subtree(
        &self,
        moved_id: MinistryId,
        new_parent_id: Option<MinistryId>,
    ) -> HierarchyRepoResult<()> {
        run_in_transaction(self.conn, |tx| -> HierarchyRepoResult<()> {
            ensure_ministry_exists(tx, moved_id)?;
            insert_self_edge(tx, moved_id)?;

            if let Some(new_parent_id) = new_parent_id {
                ensure_ministry_exists(tx, new_parent_id)?;
                if edge_exists(tx, moved_id, new_parent_id)? {
                    return Err(HierarchyRepoError::WouldCreateCycle {
                        moved_id,
                        new_parent_id,
                    });
                }
            }

            // Detach: drop links from proper ancestors of `moved_id` into its
            // subtree. Edges starting inside the subtree stay untouched.
            tx.execute(
                "DELETE FROM ministry_hierarchy
                 WHERE descendant_id IN (
                         SELECT descendant_id
                         FROM ministry_hierarchy
                         WHERE ancestor_id = ?1
                     )
                   AND ancestor_id IN (
                         SELECT ancestor_id
                         FROM ministry_hierarchy
                         WHERE descendant_id = ?1
                           AND depth > 0
                     );",
                [moved_id.to_string()],
            )?;

            // Attach: cross every ancestor of the new parent (itself at depth 0)
            // with every subtree member.
            match new_parent_id {
                Some(new_parent_id) => tx.execute(
                    "INSERT OR IGNORE INTO ministry_hierarchy (ancestor_id, descendant_id, depth)
                     SELECT p.ancestor_id, s.descendant_id, p.depth + 1 + s.depth
                     FROM ministry_hierarchy AS p
                     CROSS JOIN ministry_hierarchy AS s
                     WHERE p.descendant_id = ?2
                       AND s.ancestor_id = ?1;",
                    params![moved_id.to_string(), new_parent_id.to_string()],
                )?,
                None => tx.execute(
                    "INSERT OR IGNORE INTO ministry_hierarchy (ancestor_id, descendant_id, depth)
                     SELECT ?1, descendant_id, depth
                     FROM ministry_hierarchy
                     WHERE ancestor_id = ?1;",
                    [moved_id.to_string()],
                )?,
            };
            Ok(())
        })
    }

    fn rebuild_all(&self) -> HierarchyRepoResult<usize> {
        run_in_transaction(self.conn, |tx| -> HierarchyRepoResult<usize> {
            tx.execute("DELETE FROM ministry_hierarchy;", [])?;
            // Depth is bounded by the ministry count so a corrupted, cyclic
            // parent graph still terminates.
            let written = tx.execute(
                "WITH RECURSIVE tree(ancestor_id, descendant_id, depth) AS (
                     SELECT id, id, 0
                     FROM ministries
                     UNION ALL
                     SELECT tree.ancestor_id, child.id, tree.depth + 1
                     FROM tree
                     INNER JOIN ministries AS child ON child.parent_id = tree.descendant_id
                     WHERE tree.depth < (SELECT COUNT(*) FROM ministries)
                 )
                 INSERT OR IGNORE INTO ministry_hierarchy (ancestor_id, descendant_id, depth)
                 SELECT ancestor_id, descendant_id, depth
                 FROM tree;",
                [],
            )?;
            Ok(written)
        })
    }

    fn min_of_max_depth_among(
        &self,
        candidate_ids: &BTreeSet<MinistryId>,
    ) -> HierarchyRepoResult<Vec<DescentDepth>> {
        if candidate_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "WITH max_depths AS (
                 SELECT descendant_id, MAX(depth) AS max_depth
                 FROM ministry_hierarchy
                 WHERE descendant_id IN ({})
                 GROUP BY descendant_id
             )
             SELECT md.descendant_id, md.max_depth, m.name
             FROM max_depths AS md
             INNER JOIN ministries AS m ON m.id = md.descendant_id
             WHERE md.max_depth = (SELECT MIN(max_depth) FROM max_depths)
             ORDER BY md.descendant_id ASC;",
            placeholders(candidate_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(candidate_ids.iter().map(|id| id.to_string())))?;

        let mut winners = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            winners.push(DescentDepth {
                ministry_id: parse_uuid(&id_text, "ministry_hierarchy.descendant_id")
                    .map_err(HierarchyRepoError::InvalidData)?,
                depth: parse_depth(row.get(1)?)?,
                name: row.get(2)?,
            });
        }
        Ok(winners)
    }

    fn ancestors_of(&self, id: MinistryId) -> HierarchyRepoResult<Vec<ClosureEdge>> {
        query_edges(
            self.conn,
            "SELECT ancestor_id, descendant_id, depth
             FROM ministry_hierarchy
             WHERE descendant_id = ?1
             ORDER BY depth ASC, ancestor_id ASC;",
            Some(id),
        )
    }

    fn descendants_of(&self, id: MinistryId) -> HierarchyRepoResult<Vec<ClosureEdge>> {
        query_edges(
            self.conn,
            "SELECT ancestor_id, descendant_id, depth
             FROM ministry_hierarchy
             WHERE ancestor_id = ?1
             ORDER BY depth ASC, descendant_id ASC;",
            Some(id),
        )
    }

    fn is_descendant(
        &self,
        ancestor: MinistryId,
        candidate: MinistryId,
    ) -> HierarchyRepoResult<bool> {
        edge_exists(self.conn, ancestor, candidate)
    }

    fn edges(&self) -> HierarchyRepoResult<Vec<ClosureEdge>> {
        query_edges(
            self.conn,
            "SELECT ancestor_id, descendant_id, depth
             FROM ministry_hierarchy
             ORDER BY ancestor_id ASC, descendant_id ASC;",
            None,
        )
    }
}

fn insert_self_edge(conn: &Connection, id: MinistryId) -> HierarchyRepoResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO ministry_hierarchy (ancestor_id, descendant_id, depth)
         VALUES (?1, ?1, 0);",
        [id.to_string()],
    )?;
    Ok(())
}

fn ensure_ministry_exists(conn: &Connection, id: MinistryId) -> HierarchyRepoResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM ministries WHERE id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(HierarchyRepoError::MinistryNotFound(id)),
    }
}

fn edge_exists(
    conn: &Connection,
    ancestor: MinistryId,
    descendant: MinistryId,
) -> HierarchyRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM ministry_hierarchy
            WHERE ancestor_id = ?1 AND descendant_id = ?2
        );",
        params![ancestor.to_string(), descendant.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn query_edges(
    conn: &Connection,
    sql: &str,
    id: Option<MinistryId>,
) -> HierarchyRepoResult<Vec<ClosureEdge>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = match id {
        Some(id) => stmt.query([id.to_string()])?,
        None => stmt.query([])?,
    };
    let mut edges = Vec::new();
    while let Some(row) = rows.next()? {
        edges.push(parse_edge_row(row)?);
    }
    Ok(edges)
}

fn parse_edge_row(row: &Row<'_>) -> HierarchyRepoResult<ClosureEdge> {
    let ancestor_text: String = row.get(0)?;
    let descendant_text: String = row.get(1)?;
    Ok(ClosureEdge {
        ancestor_id: parse_uuid(&ancestor_text, "ministry_hierarchy.ancestor_id")
            .map_err(HierarchyRepoError::InvalidData)?,
        descendant_id: parse_uuid(&descendant_text, "ministry_hierarchy.descendant_id")
            .map_err(HierarchyRepoError::InvalidData)?,
        depth: parse_depth(row.get(2)?)?,
    })
}

fn parse_depth(value: i64) -> HierarchyRepoResult<u32> {
    u32::try_from(value).map_err(|_| {
        HierarchyRepoError::InvalidData(format!(
            "invalid depth `{value}` in ministry_hierarchy.depth"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::{HierarchyRepoError, HierarchyRepository, SqliteHierarchyRepository};
    use crate::db::open_db_in_memory;
    use rusqlite::Connection;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn insert_ministry(conn: &Connection, name: &str, parent: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO ministries (id, name, parent_id) VALUES (?1, ?2, ?3);",
            rusqlite::params![id.to_string(), name, parent.map(|value| value.to_string())],
        )
        .expect("ministry row should insert");
        id
    }

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().expect("raw connection should open");
        let err = SqliteHierarchyRepository::try_new(&conn)
            .err()
            .expect("unmigrated connection must be rejected");
        assert!(matches!(err, HierarchyRepoError::Schema(_)));
    }

    #[test]
    fn insert_for_unknown_ministry_is_not_found() {
        let conn = open_db_in_memory().expect("db should open");
        let repo = SqliteHierarchyRepository::try_new(&conn).expect("repo should build");
        let ghost = Uuid::new_v4();
        let err = repo
            .insert_self_and_ancestors(ghost, None)
            .expect_err("missing row must fail");
        assert!(matches!(err, HierarchyRepoError::MinistryNotFound(id) if id == ghost));
        assert!(repo.edges().expect("edges should load").is_empty());
    }

    #[test]
    fn insert_links_every_ancestor() {
        let conn = open_db_in_memory().expect("db should open");
        let repo = SqliteHierarchyRepository::try_new(&conn).expect("repo should build");
        let root = insert_ministry(&conn, "Root", None);
        repo.insert_self_and_ancestors(root, None).expect("root insert");
        let mid = insert_ministry(&conn, "Mid", Some(root));
        repo.insert_self_and_ancestors(mid, Some(root)).expect("mid insert");
        let leaf = insert_ministry(&conn, "Leaf", Some(mid));
        repo.insert_self_and_ancestors(leaf, Some(mid)).expect("leaf insert");

        let ancestors: Vec<(Uuid, u32)> = repo
            .ancestors_of(leaf)
            .expect("ancestors should load")
            .into_iter()
            .map(|edge| (edge.ancestor_id, edge.depth))
            .collect();
        assert_eq!(ancestors, vec![(leaf, 0), (mid, 1), (root, 2)]);
        assert!(repo.is_descendant(root, leaf).expect("lookup"));
        assert!(!repo.is_descendant(leaf, root).expect("lookup"));
    }

    #[test]
    fn empty_candidate_set_yields_no_winners() {
        let conn = open_db_in_memory().expect("db should open");
        let repo = SqliteHierarchyRepository::try_new(&conn).expect("repo should build");
        let winners = repo
            .min_of_max_depth_among(&BTreeSet::new())
            .expect("empty query should succeed");
        assert!(winners.is_empty());
    }

    #[test]
    fn move_under_own_descendant_is_rejected_without_mutation() {
        let conn = open_db_in_memory().expect("db should open");
        let repo = SqliteHierarchyRepository::try_new(&conn).expect("repo should build");
        let root = insert_ministry(&conn, "Root", None);
        repo.insert_self_and_ancestors(root, None).expect("root insert");
        let child = insert_ministry(&conn, "Child", Some(root));
        repo.insert_self_and_ancestors(child, Some(root)).expect("child insert");
        let before = repo.edges().expect("edges should load");

        let err = repo
            .move_subtree(root, Some(child))
            .expect_err("cycle must be rejected");
        assert!(matches!(err, HierarchyRepoError::WouldCreateCycle { .. }));
        assert_eq!(repo.edges().expect("edges should load"), before);
    }
}
