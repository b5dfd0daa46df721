// used to serialize constructs in responses and actions
use serde::{Deserialize, Serialize};

// used to print out readable forms of a construct
use std::fmt;

// ------------- Identity -------------
// Identities are handed out by the persistence layer (SQLite rowids).
pub type Id = i64;

/// Sentinel used by drag and drop requests to mean "no target", i.e. last.
pub const NO_TARGET: Id = 0;

// ------------- Kind -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Category,
    Field,
}
impl Kind {
    pub fn table(&self) -> &'static str {
        match self {
            Kind::Category => "Category",
            Kind::Field => "Field",
        }
    }
}
impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Kind::Category => write!(f, "category"),
            Kind::Field => write!(f, "field"),
        }
    }
}

// ------------- Area -------------
/// The host entity a field configuration belongs to, e.g.
/// `("core_course", "course", 0)`. Categories are ordered within an area.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Area {
    pub component: String,
    pub area: String,
    pub itemid: i64,
}
impl Area {
    pub fn new(component: impl Into<String>, area: impl Into<String>, itemid: i64) -> Self {
        Self {
            component: component.into(),
            area: area.into(),
            itemid,
        }
    }
}
impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}/{}", self.component, self.area, self.itemid)
    }
}

// ------------- Scope -------------
/// The partition under which a contiguous ordering is maintained.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Categories(Area),
    Fields { categoryid: Id },
}
impl Scope {
    pub fn kind(&self) -> Kind {
        match self {
            Scope::Categories(_) => Kind::Category,
            Scope::Fields { .. } => Kind::Field,
        }
    }
}
impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Scope::Categories(area) => write!(f, "categories of {}", area),
            Scope::Fields { categoryid } => write!(f, "fields of category {}", categoryid),
        }
    }
}

// ------------- Direction -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards position 0.
    Up,
    /// Towards the end.
    Down,
}
impl Direction {
    pub fn offset(&self) -> i64 {
        match self {
            Direction::Up => -1,
            Direction::Down => 1,
        }
    }
    pub fn reverse(&self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

// ------------- Member -------------
/// What the resequencer needs to know about an entity: who it is and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    pub id: Id,
    pub sortorder: i64,
}

// ------------- Category -------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub area: Area,
    pub sortorder: i64,
    pub timecreated: i64,
    pub timemodified: i64,
}
impl Category {
    pub fn scope(&self) -> Scope {
        Scope::Categories(self.area.clone())
    }
    pub fn member(&self) -> Member {
        Member {
            id: self.id,
            sortorder: self.sortorder,
        }
    }
}

// ------------- Field -------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: Id,
    pub shortname: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub description: String,
    pub categoryid: Id,
    pub sortorder: i64,
    // opaque to the core, interpreted by the field type
    pub configdata: String,
    pub timecreated: i64,
    pub timemodified: i64,
}
impl Field {
    pub fn scope(&self) -> Scope {
        Scope::Fields {
            categoryid: self.categoryid,
        }
    }
    pub fn member(&self) -> Member {
        Member {
            id: self.id,
            sortorder: self.sortorder,
        }
    }
}

/// Everything needed to create a field; position and identity are assigned on insert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewField {
    pub shortname: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub configdata: Option<serde_json::Value>,
}

/// Partial update of a field definition. Type and shortname are fixed after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub configdata: Option<serde_json::Value>,
}

/// A category together with its fields, both in ascending order.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithFields {
    #[serde(flatten)]
    pub category: Category,
    pub fields: Vec<Field>,
}
