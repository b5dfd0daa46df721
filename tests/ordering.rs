use fieldkeeper::construct::{Area, Direction, Id, NewField, Scope};
use fieldkeeper::database::Database;
use fieldkeeper::error::FieldkeeperError;

fn course() -> Area {
    Area::new("core_course", "course", 0)
}

fn text(shortname: &str) -> NewField {
    NewField {
        shortname: shortname.into(),
        name: shortname.to_uppercase(),
        field_type: "text".into(),
        ..Default::default()
    }
}

/// (name, sortorder) of every category in the area, in listing order.
fn categories(db: &Database, area: &Area) -> Vec<(String, i64)> {
    db.categories(area)
        .expect("categories")
        .into_iter()
        .map(|c| (c.name, c.sortorder))
        .collect()
}

fn shortnames(db: &Database, categoryid: Id) -> Vec<(String, i64)> {
    db.fields(categoryid)
        .expect("fields")
        .into_iter()
        .map(|f| (f.shortname, f.sortorder))
        .collect()
}

fn pairs(expected: &[(&str, i64)]) -> Vec<(String, i64)> {
    expected.iter().map(|(n, s)| (n.to_string(), *s)).collect()
}

#[test]
fn append_swap_delete_move_scenario() {
    let db = Database::in_memory().expect("db");
    let area = course();
    let a = db.create_category(&area, Some("A")).expect("A");
    let b = db.create_category(&area, Some("B")).expect("B");
    let c = db.create_category(&area, Some("C")).expect("C");
    assert_eq!(categories(&db, &area), pairs(&[("A", 0), ("B", 1), ("C", 2)]));

    assert!(db.move_category(a.id, Direction::Down).expect("swap"));
    assert_eq!(categories(&db, &area), pairs(&[("B", 0), ("A", 1), ("C", 2)]));

    assert!(db.delete_category(b.id).expect("delete"));
    assert_eq!(categories(&db, &area), pairs(&[("A", 0), ("C", 1)]));

    db.drag_category(c.id, Some(a.id)).expect("move before");
    assert_eq!(categories(&db, &area), pairs(&[("C", 0), ("A", 1)]));
}

#[test]
fn same_scenario_for_fields() {
    let db = Database::in_memory().expect("db");
    let category = db.create_category(&course(), None).expect("category");
    let a = db.create_field(category.id, &text("a")).expect("a");
    let b = db.create_field(category.id, &text("b")).expect("b");
    let c = db.create_field(category.id, &text("c")).expect("c");
    assert_eq!(shortnames(&db, category.id), pairs(&[("a", 0), ("b", 1), ("c", 2)]));

    assert!(db.move_field(a.id, Direction::Down).expect("swap"));
    assert_eq!(shortnames(&db, category.id), pairs(&[("b", 0), ("a", 1), ("c", 2)]));

    assert!(db.delete_field(b.id).expect("delete"));
    assert_eq!(shortnames(&db, category.id), pairs(&[("a", 0), ("c", 1)]));

    db.drag_field(c.id, None, Some(a.id)).expect("move before");
    assert_eq!(shortnames(&db, category.id), pairs(&[("c", 0), ("a", 1)]));
}

#[test]
fn append_places_last_and_leaves_siblings_alone() {
    let db = Database::in_memory().expect("db");
    let area = course();
    for name in ["one", "two", "three"] {
        db.create_category(&area, Some(name)).expect("create");
    }
    let before: Vec<_> = db.categories(&area).expect("categories");
    let four = db.create_category(&area, Some("four")).expect("four");
    assert_eq!(four.sortorder, 3);
    let after = db.categories(&area).expect("categories");
    for (old, new) in before.iter().zip(after.iter()) {
        assert_eq!(old.id, new.id);
        assert_eq!(old.sortorder, new.sortorder);
        assert_eq!(old.timemodified, new.timemodified);
    }
}

#[test]
fn swap_is_its_own_inverse() {
    let db = Database::in_memory().expect("db");
    let area = course();
    for name in ["a", "b", "c", "d"] {
        db.create_category(&area, Some(name)).expect("create");
    }
    let original = categories(&db, &area);
    let c = db.categories(&area).expect("categories")[2].id;
    for direction in [Direction::Up, Direction::Down] {
        assert!(db.move_category(c, direction).expect("move"));
        assert!(db.move_category(c, direction.reverse()).expect("move back"));
        assert_eq!(categories(&db, &area), original);
    }
}

#[test]
fn swap_at_an_extreme_is_a_no_op() {
    let db = Database::in_memory().expect("db");
    let category = db.create_category(&course(), None).expect("category");
    let first = db.create_field(category.id, &text("first")).expect("first");
    let last = db.create_field(category.id, &text("last")).expect("last");
    assert!(!db.move_field(first.id, Direction::Up).expect("up at top"));
    assert!(!db.move_field(last.id, Direction::Down).expect("down at bottom"));
    assert_eq!(shortnames(&db, category.id), pairs(&[("first", 0), ("last", 1)]));
}

#[test]
fn delete_shifts_only_later_positions() {
    let db = Database::in_memory().expect("db");
    let category = db.create_category(&course(), None).expect("category");
    let ids: Vec<Id> = ["p0", "p1", "p2", "p3", "p4"]
        .iter()
        .map(|s| db.create_field(category.id, &text(s)).expect("create").id)
        .collect();
    db.delete_field(ids[2]).expect("delete");
    let after: Vec<(Id, i64)> = db
        .fields(category.id)
        .expect("fields")
        .into_iter()
        .map(|f| (f.id, f.sortorder))
        .collect();
    assert_eq!(after, vec![(ids[0], 0), (ids[1], 1), (ids[3], 2), (ids[4], 3)]);
}

#[test]
fn deleting_something_absent_is_not_an_error() {
    let db = Database::in_memory().expect("db");
    assert!(!db.delete_field(4242).expect("field"));
    assert!(!db.delete_category(4242).expect("category"));
}

#[test]
fn drag_without_target_moves_last() {
    let db = Database::in_memory().expect("db");
    let area = course();
    let first = db.create_category(&area, Some("first")).expect("first");
    db.create_category(&area, Some("second")).expect("second");
    db.create_category(&area, Some("third")).expect("third");
    db.drag_category(first.id, None).expect("to the end");
    assert_eq!(
        categories(&db, &area),
        pairs(&[("second", 0), ("third", 1), ("first", 2)])
    );
    // zero is what the drag handles send for "no target"
    let second = db.categories(&area).expect("categories")[0].id;
    db.drag_category(second, Some(0)).expect("to the end again");
    assert_eq!(
        categories(&db, &area),
        pairs(&[("third", 0), ("first", 1), ("second", 2)])
    );
}

#[test]
fn drag_before_itself_changes_nothing() {
    let db = Database::in_memory().expect("db");
    let area = course();
    db.create_category(&area, Some("a")).expect("a");
    let b = db.create_category(&area, Some("b")).expect("b");
    db.drag_category(b.id, Some(b.id)).expect("drag");
    assert_eq!(categories(&db, &area), pairs(&[("a", 0), ("b", 1)]));
}

#[test]
fn drag_onto_another_area_is_rejected() {
    let db = Database::in_memory().expect("db");
    let mine = db.create_category(&course(), Some("mine")).expect("mine");
    let theirs = db
        .create_category(&Area::new("core_course", "course", 7), Some("theirs"))
        .expect("theirs");
    let err = db.drag_category(mine.id, Some(theirs.id)).unwrap_err();
    assert!(matches!(err, FieldkeeperError::InvalidTarget { id, target } if id == mine.id && target == theirs.id));
    assert_eq!(categories(&db, &course()), pairs(&[("mine", 0)]));
}

#[test]
fn drag_onto_a_deleted_target_is_an_invalid_target() {
    let db = Database::in_memory().expect("db");
    let area = course();
    let a = db.create_category(&area, Some("a")).expect("a");
    let b = db.create_category(&area, Some("b")).expect("b");
    let x = db.create_field(a.id, &text("x")).expect("x");
    let y = db.create_field(a.id, &text("y")).expect("y");
    db.delete_category(b.id).expect("delete b");
    db.delete_field(y.id).expect("delete y");

    let err = db.drag_category(a.id, Some(b.id)).unwrap_err();
    assert!(matches!(err, FieldkeeperError::InvalidTarget { id, target } if id == a.id && target == b.id));
    let err = db.drag_field(x.id, None, Some(y.id)).unwrap_err();
    assert!(matches!(err, FieldkeeperError::InvalidTarget { id, target } if id == x.id && target == y.id));
    assert_eq!(categories(&db, &area), pairs(&[("a", 0)]));
    assert_eq!(shortnames(&db, a.id), pairs(&[("x", 0)]));
}

#[test]
fn areas_are_ordered_independently() {
    let db = Database::in_memory().expect("db");
    let one = Area::new("core_course", "course", 1);
    let two = Area::new("core_course", "course", 2);
    db.create_category(&one, Some("x")).expect("x");
    db.create_category(&two, Some("y")).expect("y");
    db.create_category(&one, Some("z")).expect("z");
    assert_eq!(categories(&db, &one), pairs(&[("x", 0), ("z", 1)]));
    assert_eq!(categories(&db, &two), pairs(&[("y", 0)]));
    assert_eq!(db.count(&Scope::Categories(one)).expect("count"), 2);
}

#[test]
fn moving_an_unknown_entity_is_not_found() {
    let db = Database::in_memory().expect("db");
    let err = db.move_field(99, Direction::Up).unwrap_err();
    assert!(matches!(err, FieldkeeperError::NotFound { id: 99, .. }));
    assert!(!err.is_transient());
}
