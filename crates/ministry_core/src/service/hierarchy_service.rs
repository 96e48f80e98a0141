//! Ministry hierarchy engine.
//!
//! # Responsibility
//! - Drive closure-table maintenance from ministry lifecycle events.
//! - Reject structural changes that would corrupt the closure table.
//! - Expose the administrative full rebuild.
//!
//! # Invariants
//! - Re-parenting under self or under a descendant is rejected before any
//!   mutation.
//! - An unchanged parent is a no-op.
//! - `rebuild_all` is a repair tool, cost proportional to closure size; it
//!   needs an exclusive window with no concurrent structural mutation.

use crate::model::ministry::MinistryId;
use crate::repo::hierarchy_repo::{HierarchyRepoError, HierarchyRepository};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from hierarchy engine operations.
#[derive(Debug)]
pub enum HierarchyServiceError {
    /// Ministry being created/moved has no row.
    MinistryNotFound(MinistryId),
    /// Requested parent has no row.
    ParentNotFound(MinistryId),
    /// Move would place a ministry under itself or one of its descendants.
    CycleDetected {
        ministry_id: MinistryId,
        parent_id: MinistryId,
    },
    /// Repository-level failure.
    Repo(HierarchyRepoError),
}

impl Display for HierarchyServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MinistryNotFound(id) => write!(f, "ministry not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent ministry not found: {id}"),
            Self::CycleDetected {
                ministry_id,
                parent_id,
            } => write!(
                f,
                "move would create cycle: ministry {ministry_id} under parent {parent_id}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HierarchyServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HierarchyRepoError> for HierarchyServiceError {
    fn from(value: HierarchyRepoError) -> Self {
        match value {
            HierarchyRepoError::WouldCreateCycle {
                moved_id,
                new_parent_id,
            } => Self::CycleDetected {
                ministry_id: moved_id,
                parent_id: new_parent_id,
            },
            other => Self::Repo(other),
        }
    }
}

/// Hierarchy engine over a closure-table repository.
pub struct HierarchyService<H: HierarchyRepository> {
    repo: H,
}

impl<H: HierarchyRepository> HierarchyService<H> {
    pub fn new(repo: H) -> Self {
        Self { repo }
    }

    /// Read access to the underlying closure store.
    pub fn repo(&self) -> &H {
        &self.repo
    }

    /// Records closure edges for a freshly created ministry.
    ///
    /// # Contract
    /// - The ministry row (and its parent row) must already exist, ideally in
    ///   the same transaction.
    pub fn on_created(
        &self,
        ministry_id: MinistryId,
        parent_id: Option<MinistryId>,
    ) -> Result<(), HierarchyServiceError> {
        match self.repo.insert_self_and_ancestors(ministry_id, parent_id) {
            Ok(()) => {
                info!(
                    "event=hierarchy_insert module=hierarchy status=ok has_parent={}",
                    parent_id.is_some()
                );
                Ok(())
            }
            Err(HierarchyRepoError::MinistryNotFound(missing)) => {
                warn!(
                    "event=hierarchy_insert module=hierarchy status=rejected reason=not_found missing={}",
                    if missing == ministry_id { "ministry" } else { "parent" }
                );
                Err(not_found(ministry_id, missing))
            }
            Err(err) => {
                error!(
                    "event=hierarchy_insert module=hierarchy status=error error={}",
                    err
                );
                Err(err.into())
            }
        }
    }

    /// Re-links `ministry_id`'s subtree when its parent changed.
    ///
    /// Returns `true` when the closure table was touched.
    pub fn on_reparented(
        &self,
        ministry_id: MinistryId,
        old_parent_id: Option<MinistryId>,
        new_parent_id: Option<MinistryId>,
    ) -> Result<bool, HierarchyServiceError> {
        if old_parent_id == new_parent_id {
            return Ok(false);
        }

        if let Some(parent_id) = new_parent_id {
            self.ensure_not_within_subtree(ministry_id, parent_id)?;
        }

        let started_at = Instant::now();
        match self.repo.move_subtree(ministry_id, new_parent_id) {
            Ok(()) => {
                info!(
                    "event=hierarchy_move module=hierarchy status=ok to_root={} duration_ms={}",
                    new_parent_id.is_none(),
                    started_at.elapsed().as_millis()
                );
                Ok(true)
            }
            Err(HierarchyRepoError::MinistryNotFound(missing)) => {
                warn!(
                    "event=hierarchy_move module=hierarchy status=rejected reason=not_found missing={}",
                    if missing == ministry_id { "ministry" } else { "parent" }
                );
                Err(not_found(ministry_id, missing))
            }
            Err(err) => {
                error!(
                    "event=hierarchy_move module=hierarchy status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    /// Recomputes the whole closure table. Returns the number of edges written.
    pub fn rebuild_all(&self) -> Result<usize, HierarchyServiceError> {
        let started_at = Instant::now();
        info!("event=hierarchy_rebuild module=hierarchy status=start");
        match self.repo.rebuild_all() {
            Ok(edges) => {
                info!(
                    "event=hierarchy_rebuild module=hierarchy status=ok edges={} duration_ms={}",
                    edges,
                    started_at.elapsed().as_millis()
                );
                Ok(edges)
            }
            Err(err) => {
                error!(
                    "event=hierarchy_rebuild module=hierarchy status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    fn ensure_not_within_subtree(
        &self,
        ministry_id: MinistryId,
        parent_id: MinistryId,
    ) -> Result<(), HierarchyServiceError> {
        if parent_id == ministry_id || self.repo.is_descendant(ministry_id, parent_id)? {
            warn!("event=hierarchy_move module=hierarchy status=rejected reason=cycle");
            return Err(HierarchyServiceError::CycleDetected {
                ministry_id,
                parent_id,
            });
        }
        Ok(())
    }
}

fn not_found(ministry_id: MinistryId, missing: MinistryId) -> HierarchyServiceError {
    if missing == ministry_id {
        HierarchyServiceError::MinistryNotFound(missing)
    } else {
        HierarchyServiceError::ParentNotFound(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::{HierarchyService, HierarchyServiceError};
    use crate::db::open_db_in_memory;
    use crate::model::ministry::Ministry;
    use crate::repo::hierarchy_repo::{HierarchyRepository, SqliteHierarchyRepository};
    use crate::repo::ministry_repo::{MinistryRepository, SqliteMinistryRepository};
    use uuid::Uuid;

    #[test]
    fn missing_parent_and_missing_ministry_are_told_apart() {
        let conn = open_db_in_memory().unwrap();
        let root = Ministry::new("Root");
        SqliteMinistryRepository::try_new(&conn)
            .unwrap()
            .create_ministry(&root)
            .unwrap();
        let service = HierarchyService::new(SqliteHierarchyRepository::try_new(&conn).unwrap());
        let ghost = Uuid::new_v4();

        assert!(matches!(
            service.on_created(root.id, Some(ghost)),
            Err(HierarchyServiceError::ParentNotFound(id)) if id == ghost
        ));
        assert!(matches!(
            service.on_created(ghost, None),
            Err(HierarchyServiceError::MinistryNotFound(id)) if id == ghost
        ));
        assert!(matches!(
            service.on_reparented(root.id, None, Some(ghost)),
            Err(HierarchyServiceError::ParentNotFound(id)) if id == ghost
        ));
        assert!(matches!(
            service.on_reparented(ghost, None, Some(root.id)),
            Err(HierarchyServiceError::MinistryNotFound(id)) if id == ghost
        ));

        let repo = SqliteHierarchyRepository::try_new(&conn).unwrap();
        assert!(repo.edges().unwrap().is_empty());
    }
}
