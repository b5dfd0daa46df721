//! Fieldkeeper – custom field metadata with consistently ordered categories and fields.
//!
//! Administrators attach typed fields (text, textarea, select, checkbox, date)
//! to host entities such as courses. Fields are grouped into categories, and
//! both are shown in an order the administrator controls:
//! * A [`construct::Category`] is ordered among the categories of its
//!   [`construct::Area`], the `(component, area, itemid)` triple naming the host.
//! * A [`construct::Field`] is ordered among the fields of its category.
//! * A [`construct::Scope`] is one such partition. Within a scope the
//!   `sortorder` values always read `0, 1, ..., n - 1`, top to bottom.
//!
//! ## Modules
//! * [`construct`] – Categories, fields, areas, scopes and the small value types around them.
//! * [`persist`] – SQLite schema and the ordered collection store.
//! * [`sequence`] – The resequencer: append, renumber, swap, move before, move across.
//! * [`scope`] – Resolves and validates the scope of an entity.
//! * [`datatype`] – The [`datatype::FieldType`] trait, the built-in types and their registry.
//! * [`database`] – The entry points used by the admin screens.
//! * [`interface`] – Actions as sent by the admin screens, and their responses.
//! * [`server`] – HTTP routes for the action interface.
//! * [`settings`] – Configuration file and environment handling.
//!
//! ## Ordering
//! New entities go last. Deleting one closes the gap. Moving up or down swaps
//! with the neighbour, and drag and drop reinserts before a target and
//! renumbers. A field moved to another category lands in the destination
//! and both categories are renumbered. Every one of these runs in a single
//! write transaction; a transaction that loses a race is rolled back and the
//! whole operation is run again.
//!
//! ## Field Types
//! Types are looked up in a [`datatype::FieldTypeRegistry`] by their tag.
//! The store keeps a field's `type` and `configdata` as given once the type
//! has validated the latter; it never interprets them.
//!
//! ## Quick Start
//! ```
//! use fieldkeeper::construct::{Area, Direction, NewField};
//! use fieldkeeper::database::Database;
//! let db = Database::in_memory().unwrap();
//! let area = Area::new("core_course", "course", 0);
//! let category = db.create_category(&area, None).unwrap();
//! assert_eq!(category.name, "Other fields");
//! let field = NewField { shortname: "room".into(), name: "Room".into(), field_type: "text".into(), ..Default::default() };
//! let room = db.create_field(category.id, &field).unwrap();
//! assert_eq!(room.sortorder, 0);
//! assert!(!db.move_field(room.id, Direction::Up).unwrap());
//! ```

pub mod construct;
pub mod database;
pub mod datatype;
pub mod error;
pub mod interface;
pub mod persist;
pub mod scope;
pub mod sequence;
pub mod server;
pub mod settings;
