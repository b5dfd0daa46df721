//! Keeps `sortorder` contiguous within a scope.
//!
//! Positions within a scope always read `0, 1, ..., n - 1` in ascending order
//! once an operation completes. Every operation here recomputes absolute
//! positions from what is currently stored, so re-running one after a failure
//! heals whatever part of an earlier attempt may have landed.
//!
//! The resequencer only issues writes; the caller is expected to hand it a
//! [`Store`] opened on a write transaction (see [`crate::persist::Persistor::write`]).

use tracing::debug;

use crate::construct::{Direction, Id, Kind, Member, Scope, NO_TARGET};
use crate::error::{FieldkeeperError, Result};
use crate::persist::Store;

/// True when the members, as listed by the store, sit at exactly `0..n`.
pub fn is_contiguous(members: &[Member]) -> bool {
    members
        .iter()
        .enumerate()
        .all(|(rank, member)| member.sortorder == rank as i64)
}

/// The order that results from taking `id` out of `members` and putting it
/// back immediately before `before`, or last when there is no target.
/// Returns `None` when the target is not among the members.
pub fn reinsert(members: &[Member], id: Id, before: Option<Id>) -> Option<Vec<Member>> {
    let moving = members.iter().find(|member| member.id == id).copied();
    let mut order: Vec<Member> = members
        .iter()
        .filter(|member| member.id != id)
        .copied()
        .collect();
    let index = match before {
        None => order.len(),
        Some(target) => order.iter().position(|member| member.id == target)?,
    };
    if let Some(moving) = moving {
        order.insert(index, moving);
    }
    Some(order)
}

/// Normalizes the "no target" spellings used by drag and drop requests.
pub fn target(before: Option<Id>) -> Option<Id> {
    before.filter(|&id| id != NO_TARGET)
}

pub struct Resequencer<'s, 'c> {
    store: &'s Store<'c>,
    now: i64,
}
impl<'s, 'c> Resequencer<'s, 'c> {
    pub fn new(store: &'s Store<'c>, now: i64) -> Self {
        Self { store, now }
    }

    fn place(&self, kind: Kind, id: Id, sortorder: i64) -> Result<()> {
        if self.store.set_sortorder(kind, id, sortorder, self.now)? {
            Ok(())
        } else {
            // the row went away underneath us
            Err(FieldkeeperError::PartialWriteFailure { kind, id })
        }
    }

    /// Writes each member's rank as its position, skipping those already there.
    fn write_ranks(&self, kind: Kind, order: &[Member]) -> Result<usize> {
        let mut written = 0;
        for (rank, member) in order.iter().enumerate() {
            let rank = rank as i64;
            if member.sortorder != rank {
                self.place(kind, member.id, rank)?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Puts a freshly inserted entity last in its scope and returns its position.
    pub fn append(&self, scope: &Scope, id: Id) -> Result<i64> {
        let kind = scope.kind();
        let siblings: Vec<Member> = self
            .store
            .list(scope)?
            .into_iter()
            .filter(|member| member.id != id)
            .collect();
        if !is_contiguous(&siblings) {
            let healed = self.write_ranks(kind, &siblings)?;
            debug!(%scope, healed, "renumbered inconsistent scope before append");
        }
        let position = siblings.len() as i64;
        self.place(kind, id, position)?;
        debug!(%scope, id, position, "appended");
        Ok(position)
    }

    /// Rewrites every member of the scope to its rank in the current order.
    /// Returns how many members actually moved.
    pub fn renumber(&self, scope: &Scope) -> Result<usize> {
        let members = self.store.list(scope)?;
        let written = self.write_ranks(scope.kind(), &members)?;
        if written > 0 {
            debug!(%scope, written, members = members.len(), "renumbered");
        }
        Ok(written)
    }

    /// Exchanges positions with the neighbour in the given direction.
    /// Returns false, without writing, when the entity is already at that end.
    pub fn swap_adjacent(&self, scope: &Scope, id: Id, direction: Direction) -> Result<bool> {
        let kind = scope.kind();
        let mut members = self.store.list(scope)?;
        if !is_contiguous(&members) {
            self.write_ranks(kind, &members)?;
            for (rank, member) in members.iter_mut().enumerate() {
                member.sortorder = rank as i64;
            }
        }
        let index = members
            .iter()
            .position(|member| member.id == id)
            .ok_or(FieldkeeperError::NotFound { kind, id })?;
        let neighbour = index as i64 + direction.offset();
        if neighbour < 0 || neighbour >= members.len() as i64 {
            return Ok(false);
        }
        let (this, other) = (members[index], members[neighbour as usize]);
        self.place(kind, this.id, other.sortorder)?;
        self.place(kind, other.id, this.sortorder)?;
        debug!(%scope, id, with = other.id, ?direction, "swapped");
        Ok(true)
    }

    /// Moves the entity to sit immediately before `before` (last when `None`)
    /// and renumbers the scope.
    pub fn move_before(&self, scope: &Scope, id: Id, before: Option<Id>) -> Result<()> {
        let kind = scope.kind();
        let before = target(before);
        let members = self.store.list(scope)?;
        if !members.iter().any(|member| member.id == id) {
            return Err(FieldkeeperError::NotFound { kind, id });
        }
        if before == Some(id) {
            self.write_ranks(kind, &members)?;
            return Ok(());
        }
        let order = reinsert(&members, id, before).ok_or(FieldkeeperError::InvalidTarget {
            id,
            target: before.unwrap_or(NO_TARGET),
        })?;
        let written = self.write_ranks(kind, &order)?;
        debug!(%scope, id, ?before, written, "moved");
        Ok(())
    }

    /// Re-homes a field into another category, placing it before `before`
    /// there (last when `None`), and renumbers both categories.
    pub fn move_across(&self, from: &Scope, to: &Scope, id: Id, before: Option<Id>) -> Result<()> {
        let categoryid = match to {
            Scope::Fields { categoryid } => *categoryid,
            Scope::Categories(_) => {
                return Err(FieldkeeperError::InvalidScope(format!(
                    "only fields can change scope, not {to}"
                )));
            }
        };
        let before = target(before);
        if let Some(target) = before {
            // reject before anything is written
            if !self.store.list(to)?.iter().any(|member| member.id == target) {
                return Err(FieldkeeperError::InvalidTarget { id, target });
            }
        }
        if !self.store.set_category(id, categoryid, self.now)? {
            return Err(FieldkeeperError::NotFound { kind: Kind::Field, id });
        }
        self.move_before(to, id, before)?;
        self.renumber(from)?;
        debug!(%from, %to, id, "moved across scopes");
        Ok(())
    }
}
