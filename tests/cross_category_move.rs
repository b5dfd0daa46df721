use fieldkeeper::construct::{Area, Id, NewField};
use fieldkeeper::database::Database;
use fieldkeeper::error::FieldkeeperError;

fn text(shortname: &str) -> NewField {
    NewField {
        shortname: shortname.into(),
        name: shortname.into(),
        field_type: "text".into(),
        ..Default::default()
    }
}

fn positions(db: &Database, categoryid: Id) -> Vec<(String, i64)> {
    db.fields(categoryid)
        .expect("fields")
        .into_iter()
        .map(|f| (f.shortname, f.sortorder))
        .collect()
}

fn pairs(expected: &[(&str, i64)]) -> Vec<(String, i64)> {
    expected.iter().map(|(n, s)| (n.to_string(), *s)).collect()
}

struct Setup {
    db: Database,
    cat1: Id,
    cat2: Id,
    f: Id,
}

/// Cat1 holds e, f, g; Cat2 holds h.
fn setup() -> Setup {
    let db = Database::in_memory().expect("db");
    let area = Area::new("core_course", "course", 0);
    let cat1 = db.create_category(&area, Some("Cat1")).expect("cat1").id;
    let cat2 = db.create_category(&area, Some("Cat2")).expect("cat2").id;
    db.create_field(cat1, &text("e")).expect("e");
    let f = db.create_field(cat1, &text("f")).expect("f").id;
    db.create_field(cat1, &text("g")).expect("g");
    db.create_field(cat2, &text("h")).expect("h");
    Setup { db, cat1, cat2, f }
}

#[test]
fn moved_field_lands_last_and_both_categories_stay_contiguous() {
    let Setup { db, cat1, cat2, f } = setup();
    db.move_field_to_category(f, cat2).expect("move");
    let moved = db.field(f).expect("f");
    assert_eq!(moved.categoryid, cat2);
    assert_eq!(moved.sortorder, 1);
    assert_eq!(positions(&db, cat2), pairs(&[("h", 0), ("f", 1)]));
    assert_eq!(positions(&db, cat1), pairs(&[("e", 0), ("g", 1)]));
}

#[test]
fn drag_onto_a_field_of_another_category_moves_across() {
    let Setup { db, cat1, cat2, f } = setup();
    let h = db.fields(cat2).expect("fields")[0].id;
    db.drag_field(f, None, Some(h)).expect("drag");
    assert_eq!(positions(&db, cat2), pairs(&[("f", 0), ("h", 1)]));
    assert_eq!(positions(&db, cat1), pairs(&[("e", 0), ("g", 1)]));
}

#[test]
fn drag_into_an_empty_category() {
    let Setup { db, cat1, f, .. } = setup();
    let area = db.category(cat1).expect("cat1").area;
    let empty = db.create_category(&area, Some("Empty")).expect("empty").id;
    db.drag_field(f, Some(empty), None).expect("drag");
    assert_eq!(positions(&db, empty), pairs(&[("f", 0)]));
    assert_eq!(positions(&db, cat1), pairs(&[("e", 0), ("g", 1)]));
}

#[test]
fn target_outside_the_destination_is_rejected_before_writing() {
    let Setup { db, cat1, cat2, f } = setup();
    let e = db.fields(cat1).expect("fields")[0].id;
    // destination says Cat2 but the target sits in Cat1
    let err = db.drag_field(f, Some(cat2), Some(e)).unwrap_err();
    assert!(matches!(err, FieldkeeperError::InvalidTarget { .. }));
    assert_eq!(positions(&db, cat1), pairs(&[("e", 0), ("f", 1), ("g", 2)]));
    assert_eq!(positions(&db, cat2), pairs(&[("h", 0)]));
}

#[test]
fn deleted_target_in_the_destination_leaves_both_categories_alone() {
    let Setup { db, cat1, cat2, f } = setup();
    let h = db.fields(cat2).expect("fields")[0].id;
    db.delete_field(h).expect("delete h");
    let err = db.drag_field(f, Some(cat2), Some(h)).unwrap_err();
    assert!(matches!(err, FieldkeeperError::InvalidTarget { id, target } if id == f && target == h));
    assert_eq!(db.field(f).expect("f").categoryid, cat1);
    assert_eq!(positions(&db, cat1), pairs(&[("e", 0), ("f", 1), ("g", 2)]));
    assert!(positions(&db, cat2).is_empty());
}

#[test]
fn fields_do_not_leave_their_area() {
    let Setup { db, cat1, f, .. } = setup();
    let elsewhere = db
        .create_category(&Area::new("core_course", "course", 9), Some("Elsewhere"))
        .expect("elsewhere")
        .id;
    let err = db.move_field_to_category(f, elsewhere).unwrap_err();
    assert!(matches!(err, FieldkeeperError::InvalidScope(_)));
    assert_eq!(db.field(f).expect("f").categoryid, cat1);
}

#[test]
fn moving_to_a_missing_category_is_an_invalid_scope() {
    let Setup { db, f, .. } = setup();
    let err = db.move_field_to_category(f, 777).unwrap_err();
    assert!(matches!(err, FieldkeeperError::InvalidScope(_)));
}
