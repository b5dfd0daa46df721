//! Request/response interface for the admin screens.
//!
//! Each admin interaction (the inline "add category", the up/down arrows, the
//! drag and drop handles, ...) becomes one [`Action`]. Running an action
//! applies it through the [`Database`] and answers with the refreshed
//! configuration of the area it touched, so the caller can re-render the list
//! without a second round trip.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::construct::{Area, CategoryWithFields, Direction, Id, Kind, NewField};
use crate::database::Database;
use crate::error::{FieldkeeperError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateCategory {
        #[serde(flatten)]
        area: Area,
        #[serde(default)]
        name: Option<String>,
    },
    RenameCategory {
        id: Id,
        name: String,
    },
    DeleteCategory {
        id: Id,
    },
    CreateField {
        categoryid: Id,
        #[serde(flatten)]
        field: NewField,
    },
    DeleteField {
        id: Id,
    },
    MoveCategory {
        id: Id,
        direction: Direction,
    },
    MoveField {
        id: Id,
        direction: Direction,
    },
    DragCategory {
        id: Id,
        #[serde(default)]
        before: Option<Id>,
    },
    DragField {
        id: Id,
        #[serde(default)]
        categoryid: Option<Id>,
        #[serde(default)]
        before: Option<Id>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<Area>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CategoryWithFields>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the same action may succeed if simply sent again.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retry: bool,
}
impl ActionResponse {
    pub fn ok(id: Option<Id>, area: Area, categories: Vec<CategoryWithFields>) -> Self {
        Self {
            status: "ok".into(),
            id,
            area: Some(area),
            categories: Some(categories),
            error: None,
            retry: false,
        }
    }
    pub fn failed(error: &FieldkeeperError) -> Self {
        let retry = error.is_transient();
        let message = if retry {
            "the list was changed by someone else, please try again".to_string()
        } else {
            error.to_string()
        };
        Self {
            status: "error".into(),
            id: None,
            area: None,
            categories: None,
            error: Some(message),
            retry,
        }
    }
}

/// Runs actions against a shared database.
pub struct ActionInterface {
    db: Arc<Database>,
}
impl ActionInterface {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Applies the action and returns the id it concerns together with the
    /// area whose listing should be refreshed.
    fn apply(&self, action: &Action) -> Result<(Option<Id>, Area)> {
        let db = &self.db;
        match action {
            Action::CreateCategory { area, name } => {
                let category = db.create_category(area, name.as_deref())?;
                Ok((Some(category.id), category.area))
            }
            Action::RenameCategory { id, name } => {
                let category = db.rename_category(*id, name)?;
                Ok((Some(category.id), category.area))
            }
            Action::DeleteCategory { id } => {
                // the area has to be known before the category is gone
                let area = db.area_of(Kind::Category, *id)?;
                db.delete_category(*id)?;
                Ok((None, area))
            }
            Action::CreateField { categoryid, field } => {
                let created = db.create_field(*categoryid, field)?;
                Ok((Some(created.id), db.area_of(Kind::Field, created.id)?))
            }
            Action::DeleteField { id } => {
                let area = db.area_of(Kind::Field, *id)?;
                db.delete_field(*id)?;
                Ok((None, area))
            }
            Action::MoveCategory { id, direction } => {
                db.move_category(*id, *direction)?;
                Ok((Some(*id), db.area_of(Kind::Category, *id)?))
            }
            Action::MoveField { id, direction } => {
                db.move_field(*id, *direction)?;
                Ok((Some(*id), db.area_of(Kind::Field, *id)?))
            }
            Action::DragCategory { id, before } => {
                db.drag_category(*id, *before)?;
                Ok((Some(*id), db.area_of(Kind::Category, *id)?))
            }
            Action::DragField { id, categoryid, before } => {
                db.drag_field(*id, *categoryid, *before)?;
                Ok((Some(*id), db.area_of(Kind::Field, *id)?))
            }
        }
    }

    /// Runs an action, reporting failures in the response rather than as an error.
    pub fn run(&self, action: &Action) -> ActionResponse {
        match self.execute(action) {
            Ok(response) => response,
            Err(e) => ActionResponse::failed(&e),
        }
    }
    pub fn execute(&self, action: &Action) -> Result<ActionResponse> {
        let (id, area) = self.apply(action)?;
        let categories = self.db.configuration(&area)?;
        Ok(ActionResponse::ok(id, area, categories))
    }
}
