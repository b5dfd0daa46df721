// used for persistence
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::time::Duration;
use tracing::debug;

use crate::construct::{Area, Category, Field, Id, Kind, Member, Scope};
use crate::error::{FieldkeeperError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

// ------------- Persistence -------------
/// Owns the SQLite connection and the schema. Reads go through
/// [`Persistor::store`], anything that changes positions goes through
/// [`Persistor::write`] so that it happens inside one write transaction.
#[derive(Debug)]
pub struct Persistor {
    connection: Connection,
}
impl Persistor {
    pub fn new(mode: PersistenceMode, busy_timeout: Duration) -> Result<Self> {
        let connection = match &mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        // bounds how long a writer waits for another writer's lock
        connection.busy_timeout(busy_timeout)?;
        // The "STRICT" keyword introduced in 3.37.0 breaks JDBC connections, which makes
        // debugging using an external tool like DBeaver impossible
        connection.execute_batch(
            "
            pragma foreign_keys = on;
            create table if not exists Category (
                Category_Identity integer,
                Name text not null,
                Description text not null,
                Component text not null,
                Area text not null,
                Item_Identity integer not null,
                SortOrder integer not null,
                TimeCreated integer not null,
                TimeModified integer not null,
                constraint referenceable_Category_Identity primary key (
                    Category_Identity
                )
            );-- STRICT;
            create index if not exists Category_in_Area on Category (
                Component,
                Area,
                Item_Identity,
                SortOrder
            );
            create table if not exists Field (
                Field_Identity integer,
                ShortName text not null,
                Name text not null,
                FieldType text not null,
                Description text not null,
                Category_Identity integer not null,
                SortOrder integer not null,
                ConfigData text not null,
                TimeCreated integer not null,
                TimeModified integer not null,
                constraint Field_in_Category foreign key (
                    Category_Identity
                ) references Category(Category_Identity),
                constraint referenceable_Field_Identity primary key (
                    Field_Identity
                )
            );-- STRICT;
            create index if not exists Field_in_Category on Field (
                Category_Identity,
                SortOrder
            );
            ",
        )?;
        debug!(?mode, "schema ready");
        Ok(Self { connection })
    }
    pub fn in_memory() -> Result<Self> {
        Self::new(PersistenceMode::InMemory, Duration::from_secs(5))
    }
    /// Read access outside of any write transaction.
    pub fn store(&self) -> Store<'_> {
        Store::new(&self.connection)
    }
    /// Starts an IMMEDIATE transaction, which takes the database write lock up
    /// front so two resequencing runs can never interleave. Dropping the
    /// transaction without committing rolls everything back.
    pub fn write(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

// ------------- Store -------------
/// The ordered collection store. Works on a plain connection as well as on a
/// transaction, since the latter dereferences to the former.
pub struct Store<'c> {
    db: &'c Connection,
}

const CATEGORY_COLUMNS: &str = "
    Category_Identity, Name, Description, Component, Area, Item_Identity,
    SortOrder, TimeCreated, TimeModified";
const FIELD_COLUMNS: &str = "
    Field_Identity, ShortName, Name, FieldType, Description, Category_Identity,
    SortOrder, ConfigData, TimeCreated, TimeModified";

fn member_from_row(row: &Row) -> rusqlite::Result<Member> {
    Ok(Member {
        id: row.get(0)?,
        sortorder: row.get(1)?,
    })
}

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        area: Area {
            component: row.get(3)?,
            area: row.get(4)?,
            itemid: row.get(5)?,
        },
        sortorder: row.get(6)?,
        timecreated: row.get(7)?,
        timemodified: row.get(8)?,
    })
}

fn field_from_row(row: &Row) -> rusqlite::Result<Field> {
    Ok(Field {
        id: row.get(0)?,
        shortname: row.get(1)?,
        name: row.get(2)?,
        field_type: row.get(3)?,
        description: row.get(4)?,
        categoryid: row.get(5)?,
        sortorder: row.get(6)?,
        configdata: row.get(7)?,
        timecreated: row.get(8)?,
        timemodified: row.get(9)?,
    })
}

impl<'c> Store<'c> {
    pub fn new(db: &'c Connection) -> Self {
        Self { db }
    }

    // ---- generic access by scope, used by the resequencer ----

    /// Members of a scope, ascending by position with ties broken by id.
    pub fn list(&self, scope: &Scope) -> Result<Vec<Member>> {
        let members = match scope {
            Scope::Categories(area) => {
                let mut statement = self.db.prepare_cached(
                    "
                select Category_Identity, SortOrder
                    from Category
                    where Component = ?
                    and Area = ?
                    and Item_Identity = ?
                    order by SortOrder asc, Category_Identity asc
            ",
                )?;
                let rows = statement
                    .query_map(params![&area.component, &area.area, area.itemid], member_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            Scope::Fields { categoryid } => {
                let mut statement = self.db.prepare_cached(
                    "
                select Field_Identity, SortOrder
                    from Field
                    where Category_Identity = ?
                    order by SortOrder asc, Field_Identity asc
            ",
                )?;
                let rows = statement.query_map(params![categoryid], member_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(members)
    }
    pub fn count(&self, scope: &Scope) -> Result<usize> {
        let count: i64 = match scope {
            Scope::Categories(area) => self.db.query_row(
                "
                select count(*)
                    from Category
                    where Component = ?
                    and Area = ?
                    and Item_Identity = ?
            ",
                params![&area.component, &area.area, area.itemid],
                |r| r.get(0),
            )?,
            Scope::Fields { categoryid } => self.db.query_row(
                "
                select count(*)
                    from Field
                    where Category_Identity = ?
            ",
                params![categoryid],
                |r| r.get(0),
            )?,
        };
        Ok(count as usize)
    }
    /// Returns false when the row no longer exists.
    pub fn set_sortorder(&self, kind: Kind, id: Id, sortorder: i64, now: i64) -> Result<bool> {
        let sql = format!(
            "update {table} set SortOrder = ?, TimeModified = ? where {table}_Identity = ?",
            table = kind.table()
        );
        let changed = self.db.prepare_cached(&sql)?.execute(params![sortorder, now, id])?;
        Ok(changed == 1)
    }
    /// Removes an entity. Deleting something that is not there is not an error.
    pub fn delete(&self, kind: Kind, id: Id) -> Result<bool> {
        let sql = format!(
            "delete from {table} where {table}_Identity = ?",
            table = kind.table()
        );
        let changed = self.db.prepare_cached(&sql)?.execute(params![id])?;
        Ok(changed == 1)
    }

    // ---- categories ----

    pub fn category(&self, id: Id) -> Result<Category> {
        self.find_category(id)?
            .ok_or(FieldkeeperError::NotFound { kind: Kind::Category, id })
    }
    pub fn find_category(&self, id: Id) -> Result<Option<Category>> {
        let sql = format!(
            "select {CATEGORY_COLUMNS} from Category where Category_Identity = ?"
        );
        Ok(self
            .db
            .prepare_cached(&sql)?
            .query_row(params![id], category_from_row)
            .optional()?)
    }
    pub fn categories(&self, area: &Area) -> Result<Vec<Category>> {
        let sql = format!(
            "
                select {CATEGORY_COLUMNS}
                    from Category
                    where Component = ?
                    and Area = ?
                    and Item_Identity = ?
                    order by SortOrder asc, Category_Identity asc
            "
        );
        let mut statement = self.db.prepare_cached(&sql)?;
        let rows = statement.query_map(
            params![&area.component, &area.area, area.itemid],
            category_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
    /// Inserts a category when its id is 0, otherwise inserts or replaces it
    /// by id. Returns the id of the stored row.
    pub fn put_category(&self, category: &Category) -> Result<Id> {
        let area = &category.area;
        if category.id == 0 {
            self.db
                .prepare_cached(
                    "
                insert into Category (
                    Name,
                    Description,
                    Component,
                    Area,
                    Item_Identity,
                    SortOrder,
                    TimeCreated,
                    TimeModified
                ) values (?, ?, ?, ?, ?, ?, ?, ?)
            ",
                )?
                .execute(params![
                    &category.name,
                    &category.description,
                    &area.component,
                    &area.area,
                    area.itemid,
                    category.sortorder,
                    category.timecreated,
                    category.timemodified
                ])?;
            return Ok(self.db.last_insert_rowid());
        }
        // an upsert rather than "insert or replace", which would delete the row
        // first and trip the foreign key from Field
        self.db
            .prepare_cached(
                "
                insert into Category (
                    Category_Identity,
                    Name,
                    Description,
                    Component,
                    Area,
                    Item_Identity,
                    SortOrder,
                    TimeCreated,
                    TimeModified
                ) values (?, ?, ?, ?, ?, ?, ?, ?, ?)
                on conflict (Category_Identity) do update set
                    Name = excluded.Name,
                    Description = excluded.Description,
                    Component = excluded.Component,
                    Area = excluded.Area,
                    Item_Identity = excluded.Item_Identity,
                    SortOrder = excluded.SortOrder,
                    TimeModified = excluded.TimeModified
            ",
            )?
            .execute(params![
                category.id,
                &category.name,
                &category.description,
                &area.component,
                &area.area,
                area.itemid,
                category.sortorder,
                category.timecreated,
                category.timemodified
            ])?;
        Ok(category.id)
    }
    pub fn category_names(&self, area: &Area) -> Result<Vec<String>> {
        let mut statement = self.db.prepare_cached(
            "
                select Name
                    from Category
                    where Component = ?
                    and Area = ?
                    and Item_Identity = ?
            ",
        )?;
        let rows = statement.query_map(params![&area.component, &area.area, area.itemid], |r| {
            r.get(0)
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    // ---- fields ----

    pub fn field(&self, id: Id) -> Result<Field> {
        self.find_field(id)?
            .ok_or(FieldkeeperError::NotFound { kind: Kind::Field, id })
    }
    pub fn find_field(&self, id: Id) -> Result<Option<Field>> {
        let sql = format!("select {FIELD_COLUMNS} from Field where Field_Identity = ?");
        Ok(self
            .db
            .prepare_cached(&sql)?
            .query_row(params![id], field_from_row)
            .optional()?)
    }
    pub fn fields(&self, categoryid: Id) -> Result<Vec<Field>> {
        let sql = format!(
            "
                select {FIELD_COLUMNS}
                    from Field
                    where Category_Identity = ?
                    order by SortOrder asc, Field_Identity asc
            "
        );
        let mut statement = self.db.prepare_cached(&sql)?;
        let rows = statement.query_map(params![categoryid], field_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
    /// Shortnames are unique across every category of an area.
    pub fn field_by_shortname(&self, area: &Area, shortname: &str) -> Result<Option<Field>> {
        let sql = format!(
            "
                select {columns}
                    from Field f
                    join Category c
                    on c.Category_Identity = f.Category_Identity
                    where c.Component = ?
                    and c.Area = ?
                    and c.Item_Identity = ?
                    and f.ShortName = ?
            ",
            columns = FIELD_COLUMNS
                .split(',')
                .map(|column| format!("f.{}", column.trim()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(self
            .db
            .prepare_cached(&sql)?
            .query_row(
                params![&area.component, &area.area, area.itemid, shortname],
                field_from_row,
            )
            .optional()?)
    }
    /// Inserts a field when its id is 0, otherwise inserts or replaces it by id.
    pub fn put_field(&self, field: &Field) -> Result<Id> {
        if field.id == 0 {
            self.db
                .prepare_cached(
                    "
                insert into Field (
                    ShortName,
                    Name,
                    FieldType,
                    Description,
                    Category_Identity,
                    SortOrder,
                    ConfigData,
                    TimeCreated,
                    TimeModified
                ) values (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
                )?
                .execute(params![
                    &field.shortname,
                    &field.name,
                    &field.field_type,
                    &field.description,
                    field.categoryid,
                    field.sortorder,
                    &field.configdata,
                    field.timecreated,
                    field.timemodified
                ])?;
            return Ok(self.db.last_insert_rowid());
        }
        self.db
            .prepare_cached(
                "
                insert into Field (
                    Field_Identity,
                    ShortName,
                    Name,
                    FieldType,
                    Description,
                    Category_Identity,
                    SortOrder,
                    ConfigData,
                    TimeCreated,
                    TimeModified
                ) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                on conflict (Field_Identity) do update set
                    ShortName = excluded.ShortName,
                    Name = excluded.Name,
                    FieldType = excluded.FieldType,
                    Description = excluded.Description,
                    Category_Identity = excluded.Category_Identity,
                    SortOrder = excluded.SortOrder,
                    ConfigData = excluded.ConfigData,
                    TimeModified = excluded.TimeModified
            ",
            )?
            .execute(params![
                field.id,
                &field.shortname,
                &field.name,
                &field.field_type,
                &field.description,
                field.categoryid,
                field.sortorder,
                &field.configdata,
                field.timecreated,
                field.timemodified
            ])?;
        Ok(field.id)
    }
    /// Re-homes a field. Its position is left for the resequencer to fix.
    pub fn set_category(&self, field: Id, categoryid: Id, now: i64) -> Result<bool> {
        let changed = self
            .db
            .prepare_cached(
                "
                update Field
                    set Category_Identity = ?, TimeModified = ?
                    where Field_Identity = ?
            ",
            )?
            .execute(params![categoryid, now, field])?;
        Ok(changed == 1)
    }
    pub fn delete_fields_of(&self, categoryid: Id) -> Result<usize> {
        Ok(self
            .db
            .prepare_cached("delete from Field where Category_Identity = ?")?
            .execute(params![categoryid])?)
    }
}
