use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

// used for timestamps in the database
use chrono::Utc;
// shortnames are restricted to lowercase identifiers
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::construct::{
    Area, Category, CategoryWithFields, Direction, Field, FieldUpdate, Id, Kind, Member, NewField,
    Scope,
};
use crate::datatype::FieldTypeRegistry;
use crate::error::{FieldkeeperError, Result};
use crate::persist::{PersistenceMode, Persistor, Store};
use crate::scope::{ensure_same, validate_area, Resolver};
use crate::sequence::{target, Resequencer};
use crate::settings::Settings;

lazy_static! {
    static ref SHORTNAME: Regex = Regex::new(r"^[a-z0-9_]+$").unwrap();
}

/// Base of generated category names, numbered when already taken.
pub const DEFAULT_CATEGORY_NAME: &str = "Other fields";

/// First free name among "Other fields", "Other fields 1", "Other fields 2", ...
pub fn default_category_name(taken: &[String]) -> String {
    let mut name = DEFAULT_CATEGORY_NAME.to_string();
    let mut suffix = 0;
    while taken.iter().any(|t| t == &name) {
        suffix += 1;
        name = format!("{DEFAULT_CATEGORY_NAME} {suffix}");
    }
    name
}

/// The handler facing side: every entry point the admin screens need, with
/// each mutation run inside one write transaction and retried when it loses
/// a race against another writer.
pub struct Database {
    persistor: Mutex<Persistor>,
    registry: FieldTypeRegistry,
    settings: Settings,
}

impl Database {
    pub fn new(persistor: Persistor, registry: FieldTypeRegistry, settings: Settings) -> Self {
        Self {
            persistor: Mutex::new(persistor),
            registry,
            settings,
        }
    }
    /// Opens the database named in the settings with the built-in field types.
    pub fn open(settings: Settings) -> Result<Self> {
        let mode = if settings.database == ":memory:" {
            PersistenceMode::InMemory
        } else {
            PersistenceMode::File(settings.database.clone())
        };
        let persistor = Persistor::new(mode, settings.busy_timeout())?;
        Ok(Self::new(persistor, FieldTypeRegistry::builtin(), settings))
    }
    pub fn in_memory() -> Result<Self> {
        Self::open(Settings {
            database: ":memory:".into(),
            ..Settings::default()
        })
    }
    pub fn registry(&self) -> &FieldTypeRegistry {
        &self.registry
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ------------- locking and retries -------------

    fn lock(&self) -> Result<MutexGuard<'_, Persistor>> {
        let deadline = Instant::now() + self.settings.lock_timeout();
        loop {
            match self.persistor.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(e)) => return Err(FieldkeeperError::Lock(e.to_string())),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(FieldkeeperError::ConcurrentModification(
                            "timed out waiting for the store lock".into(),
                        ));
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
    }
    fn read<T>(&self, f: impl FnOnce(&Store<'_>) -> Result<T>) -> Result<T> {
        let persistor = self.lock()?;
        f(&persistor.store())
    }
    fn attempt<T>(&self, f: &impl Fn(&Store<'_>, i64) -> Result<T>) -> Result<T> {
        let mut persistor = self.lock()?;
        let transaction = persistor.write()?;
        let now = Utc::now().timestamp();
        let value = f(&Store::new(&transaction), now)?;
        transaction.commit()?;
        Ok(value)
    }
    /// Runs `f` in a write transaction. Transient failures roll back and the
    /// whole operation is run again, up to the configured number of attempts.
    fn mutate<T>(&self, operation: &'static str, f: impl Fn(&Store<'_>, i64) -> Result<T>) -> Result<T> {
        let attempts = self.settings.retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(&f) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(operation, attempt, error = %e, "transient failure, retrying");
                    thread::sleep(self.settings.retry_backoff() * attempt);
                    attempt += 1;
                }
                Err(e) => {
                    warn!(operation, attempt, error = %e, "operation failed");
                    return Err(e);
                }
            }
        }
    }

    // ------------- reads -------------

    pub fn category(&self, id: Id) -> Result<Category> {
        self.read(|store| store.category(id))
    }
    pub fn field(&self, id: Id) -> Result<Field> {
        self.read(|store| store.field(id))
    }
    pub fn categories(&self, area: &Area) -> Result<Vec<Category>> {
        self.read(|store| store.categories(area))
    }
    pub fn fields(&self, categoryid: Id) -> Result<Vec<Field>> {
        self.read(|store| store.fields(categoryid))
    }
    pub fn list(&self, scope: &Scope) -> Result<Vec<Member>> {
        self.read(|store| store.list(scope))
    }
    pub fn count(&self, scope: &Scope) -> Result<usize> {
        self.read(|store| store.count(scope))
    }
    /// Categories of an area with their fields, everything in display order.
    pub fn configuration(&self, area: &Area) -> Result<Vec<CategoryWithFields>> {
        self.read(|store| {
            store
                .categories(area)?
                .into_iter()
                .map(|category| -> Result<CategoryWithFields> {
                    let fields = store.fields(category.id)?;
                    Ok(CategoryWithFields { category, fields })
                })
                .collect()
        })
    }
    /// The area an entity belongs to, which is what a refreshed listing shows.
    pub fn area_of(&self, kind: Kind, id: Id) -> Result<Area> {
        self.read(|store| {
            let resolver = Resolver::new(store);
            let scope = match kind {
                Kind::Category => resolver.resolve_category(id)?,
                Kind::Field => resolver.resolve_field(id)?,
            };
            resolver.area_of(&scope)
        })
    }

    // ------------- categories -------------

    /// Creates a category last in its area. Without a name one is generated.
    pub fn create_category(&self, area: &Area, name: Option<&str>) -> Result<Category> {
        validate_area(area)?;
        let category = self.mutate("create_category", |store, now| {
            let name = match name.map(str::trim) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => default_category_name(&store.category_names(area)?),
            };
            let id = store.put_category(&Category {
                id: 0,
                name,
                description: String::new(),
                area: area.clone(),
                sortorder: -1,
                timecreated: now,
                timemodified: now,
            })?;
            Resequencer::new(store, now).append(&Scope::Categories(area.clone()), id)?;
            store.category(id)
        })?;
        info!(id = category.id, area = %area, name = %category.name, "category created");
        Ok(category)
    }
    pub fn rename_category(&self, id: Id, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FieldkeeperError::InvalidField("category name is empty".into()));
        }
        let category = self.mutate("rename_category", |store, now| {
            let mut category = store.category(id)?;
            category.name = name.to_string();
            category.timemodified = now;
            store.put_category(&category)?;
            Ok(category)
        })?;
        info!(id, name, "category renamed");
        Ok(category)
    }
    /// Deletes a category together with its fields, then closes the gap it
    /// leaves. Nothing is deleted if any part fails. Returns false when there
    /// was no such category.
    pub fn delete_category(&self, id: Id) -> Result<bool> {
        let deleted = self.mutate("delete_category", |store, now| {
            let Some(category) = store.find_category(id)? else {
                return Ok(None);
            };
            let fields = store.delete_fields_of(id)?;
            if !store.delete(Kind::Category, id)? {
                return Err(FieldkeeperError::PartialWriteFailure { kind: Kind::Category, id });
            }
            Resequencer::new(store, now).renumber(&category.scope())?;
            Ok(Some(fields))
        })?;
        match deleted {
            Some(fields) => {
                info!(id, fields, "category deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }
    /// Moves a category one step towards the top or bottom of its area.
    pub fn move_category(&self, id: Id, direction: Direction) -> Result<bool> {
        let moved = self.mutate("move_category", |store, now| {
            let scope = Resolver::new(store).resolve_category(id)?;
            Resequencer::new(store, now).swap_adjacent(&scope, id, direction)
        })?;
        info!(id, ?direction, moved, "category moved");
        Ok(moved)
    }
    /// Drag and drop: puts the category before `before`, or last.
    pub fn drag_category(&self, id: Id, before: Option<Id>) -> Result<()> {
        let before = target(before);
        self.mutate("drag_category", |store, now| {
            let resolver = Resolver::new(store);
            let scope = resolver.resolve_category(id)?;
            if let Some(before) = before {
                // a target removed by someone else is a bad target, not a missing category
                let target = store
                    .find_category(before)?
                    .ok_or(FieldkeeperError::InvalidTarget { id, target: before })?;
                ensure_same(&scope, &target.scope(), id, before)?;
            }
            Resequencer::new(store, now).move_before(&scope, id, before)
        })?;
        info!(id, ?before, "category dragged");
        Ok(())
    }

    // ------------- fields -------------

    /// Creates a field last in its category after validating its type,
    /// configdata and shortname.
    pub fn create_field(&self, categoryid: Id, field: &NewField) -> Result<Field> {
        let shortname = field.shortname.trim();
        if !SHORTNAME.is_match(shortname) {
            return Err(FieldkeeperError::InvalidField(format!(
                "shortname '{shortname}' may only contain lowercase letters, digits and underscores"
            )));
        }
        let name = field.name.trim();
        if name.is_empty() {
            return Err(FieldkeeperError::InvalidField("field name is empty".into()));
        }
        let configdata = self
            .registry
            .prepare(&field.field_type, field.configdata.as_ref())?;
        let created = self.mutate("create_field", |store, now| {
            let scope = Scope::Fields { categoryid };
            let resolver = Resolver::new(store);
            resolver.validate(&scope)?;
            let area = resolver.area_of(&scope)?;
            if store.field_by_shortname(&area, shortname)?.is_some() {
                return Err(FieldkeeperError::InvalidField(format!(
                    "shortname '{shortname}' is already used in {area}"
                )));
            }
            let id = store.put_field(&Field {
                id: 0,
                shortname: shortname.to_string(),
                name: name.to_string(),
                field_type: field.field_type.clone(),
                description: field.description.clone(),
                categoryid,
                sortorder: -1,
                configdata: configdata.clone(),
                timecreated: now,
                timemodified: now,
            })?;
            Resequencer::new(store, now).append(&scope, id)?;
            store.field(id)
        })?;
        info!(id = created.id, categoryid, shortname, field_type = %created.field_type, "field created");
        Ok(created)
    }
    pub fn update_field(&self, id: Id, update: &FieldUpdate) -> Result<Field> {
        if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(FieldkeeperError::InvalidField("field name is empty".into()));
        }
        let updated = self.mutate("update_field", |store, now| {
            let mut field = store.field(id)?;
            if let Some(name) = &update.name {
                field.name = name.trim().to_string();
            }
            if let Some(description) = &update.description {
                field.description = description.clone();
            }
            if let Some(configdata) = &update.configdata {
                field.configdata = self.registry.prepare(&field.field_type, Some(configdata))?;
            }
            field.timemodified = now;
            store.put_field(&field)?;
            Ok(field)
        })?;
        info!(id, "field updated");
        Ok(updated)
    }
    /// Deletes a field and closes the gap. Returns false when there was no such field.
    pub fn delete_field(&self, id: Id) -> Result<bool> {
        let deleted = self.mutate("delete_field", |store, now| {
            let Some(field) = store.find_field(id)? else {
                return Ok(false);
            };
            store.delete(Kind::Field, id)?;
            Resequencer::new(store, now).renumber(&field.scope())?;
            Ok(true)
        })?;
        if deleted {
            info!(id, "field deleted");
        }
        Ok(deleted)
    }
    /// Moves a field one step up or down within its category.
    pub fn move_field(&self, id: Id, direction: Direction) -> Result<bool> {
        let moved = self.mutate("move_field", |store, now| {
            let scope = Resolver::new(store).resolve_field(id)?;
            Resequencer::new(store, now).swap_adjacent(&scope, id, direction)
        })?;
        info!(id, ?direction, moved, "field moved");
        Ok(moved)
    }
    /// Drag and drop for fields. The destination category is `categoryid`
    /// when given, otherwise the category of `before`, otherwise the field's
    /// own. Fields never leave the area their category belongs to.
    pub fn drag_field(&self, id: Id, categoryid: Option<Id>, before: Option<Id>) -> Result<()> {
        let before = target(before);
        self.mutate("drag_field", |store, now| {
            let resolver = Resolver::new(store);
            let from = resolver.resolve_field(id)?;
            let target_scope = match before {
                Some(before) => Some(
                    store
                        .find_field(before)?
                        .ok_or(FieldkeeperError::InvalidTarget { id, target: before })?
                        .scope(),
                ),
                None => None,
            };
            let to = match (categoryid, &target_scope) {
                (Some(categoryid), _) => Scope::Fields { categoryid },
                (None, Some(scope)) => scope.clone(),
                (None, None) => from.clone(),
            };
            if let (Some(before), Some(scope)) = (before, &target_scope) {
                ensure_same(&to, scope, id, before)?;
            }
            let sequencer = Resequencer::new(store, now);
            if to == from {
                return sequencer.move_before(&from, id, before);
            }
            resolver.validate(&to)?;
            let (source, destination) = (resolver.area_of(&from)?, resolver.area_of(&to)?);
            if source != destination {
                return Err(FieldkeeperError::InvalidScope(format!(
                    "field {id} belongs to {source} and cannot move to {destination}"
                )));
            }
            sequencer.move_across(&from, &to, id, before)
        })?;
        info!(id, ?categoryid, ?before, "field dragged");
        Ok(())
    }
    /// Re-homes a field at the end of another category.
    pub fn move_field_to_category(&self, id: Id, categoryid: Id) -> Result<()> {
        self.drag_field(id, Some(categoryid), None)
    }

    /// Renumbers an area's categories and the fields of each, healing any
    /// gaps or duplicates. Returns how many rows were repositioned.
    pub fn reorder(&self, area: &Area) -> Result<usize> {
        validate_area(area)?;
        let written = self.mutate("reorder", |store, now| {
            let sequencer = Resequencer::new(store, now);
            let mut written = sequencer.renumber(&Scope::Categories(area.clone()))?;
            for category in store.categories(area)? {
                written += sequencer.renumber(&Scope::Fields { categoryid: category.id })?;
            }
            Ok(written)
        })?;
        info!(area = %area, written, "area reordered");
        Ok(written)
    }
}
