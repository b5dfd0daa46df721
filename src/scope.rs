//! Works out which ordering scope an entity belongs to, and refuses
//! operations that would mix scopes.

use crate::construct::{Area, Id, Scope};
use crate::error::{FieldkeeperError, Result};
use crate::persist::Store;

pub struct Resolver<'s, 'c> {
    store: &'s Store<'c>,
}
impl<'s, 'c> Resolver<'s, 'c> {
    pub fn new(store: &'s Store<'c>) -> Self {
        Self { store }
    }
    pub fn resolve_category(&self, id: Id) -> Result<Scope> {
        Ok(self.store.category(id)?.scope())
    }
    pub fn resolve_field(&self, id: Id) -> Result<Scope> {
        Ok(self.store.field(id)?.scope())
    }
    pub fn validate(&self, scope: &Scope) -> Result<()> {
        match scope {
            Scope::Categories(area) => validate_area(area),
            Scope::Fields { categoryid } => match self.store.find_category(*categoryid)? {
                Some(_) => Ok(()),
                None => Err(FieldkeeperError::InvalidScope(format!(
                    "category {categoryid} does not exist"
                ))),
            },
        }
    }
    /// The area a scope ultimately belongs to.
    pub fn area_of(&self, scope: &Scope) -> Result<Area> {
        match scope {
            Scope::Categories(area) => Ok(area.clone()),
            Scope::Fields { categoryid } => Ok(self.store.category(*categoryid)?.area),
        }
    }
}

pub fn validate_area(area: &Area) -> Result<()> {
    if area.component.trim().is_empty() {
        return Err(FieldkeeperError::InvalidScope("component is empty".into()));
    }
    if area.area.trim().is_empty() {
        return Err(FieldkeeperError::InvalidScope("area is empty".into()));
    }
    if area.itemid < 0 {
        return Err(FieldkeeperError::InvalidScope(format!(
            "itemid {} is negative",
            area.itemid
        )));
    }
    Ok(())
}

/// Fails with `InvalidTarget` unless `target` lives in the expected scope.
pub fn ensure_same(expected: &Scope, actual: &Scope, id: Id, target: Id) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(FieldkeeperError::InvalidTarget { id, target })
    }
}
