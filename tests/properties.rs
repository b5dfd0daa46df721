use proptest::prelude::*;

use fieldkeeper::construct::{Area, Direction, Id, NewField, Scope};
use fieldkeeper::database::Database;
use fieldkeeper::sequence::is_contiguous;

#[derive(Debug, Clone)]
enum Op {
    Create(usize),
    Delete(usize),
    Swap(usize, Direction),
    Drag(usize, Option<usize>),
    MoveTo(usize, usize),
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Up), Just(Direction::Down)]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..3usize).prop_map(Op::Create),
        1 => any::<usize>().prop_map(Op::Delete),
        2 => (any::<usize>(), arb_direction()).prop_map(|(i, d)| Op::Swap(i, d)),
        2 => (any::<usize>(), proptest::option::of(any::<usize>())).prop_map(|(i, t)| Op::Drag(i, t)),
        1 => (any::<usize>(), 0..3usize).prop_map(|(i, c)| Op::MoveTo(i, c)),
    ]
}

fn field_ids(db: &Database, categories: &[Id]) -> Vec<Id> {
    categories
        .iter()
        .flat_map(|&c| db.fields(c).expect("fields"))
        .map(|f| f.id)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_scope_stays_contiguous(ops in prop::collection::vec(arb_op(), 1..40)) {
        let db = Database::in_memory().expect("db");
        let area = Area::new("core_course", "course", 0);
        let categories: Vec<Id> = (0..3)
            .map(|_| db.create_category(&area, None).expect("category").id)
            .collect();
        let mut created = 0;
        for op in ops {
            let fields = field_ids(&db, &categories);
            match op {
                Op::Create(c) => {
                    let field = NewField {
                        shortname: format!("f{created}"),
                        name: format!("Field {created}"),
                        field_type: "checkbox".into(),
                        ..Default::default()
                    };
                    created += 1;
                    let before = db.count(&Scope::Fields { categoryid: categories[c] }).expect("count");
                    let made = db.create_field(categories[c], &field).expect("create");
                    prop_assert_eq!(made.sortorder, before as i64);
                }
                Op::Delete(i) if !fields.is_empty() => {
                    db.delete_field(fields[i % fields.len()]).expect("delete");
                }
                Op::Swap(i, direction) if !fields.is_empty() => {
                    db.move_field(fields[i % fields.len()], direction).expect("swap");
                }
                Op::Drag(i, target) if !fields.is_empty() => {
                    let id = fields[i % fields.len()];
                    let before = target.map(|t| fields[t % fields.len()]);
                    db.drag_field(id, None, before).expect("drag");
                    if let Some(before) = before.filter(|&b| b != id) {
                        let scope = db.field(before).expect("target").scope();
                        let order: Vec<Id> = db.list(&scope).expect("list").iter().map(|m| m.id).collect();
                        let at = order.iter().position(|&m| m == id).expect("moved");
                        prop_assert_eq!(order[at + 1], before);
                    }
                }
                Op::MoveTo(i, c) if !fields.is_empty() => {
                    db.move_field_to_category(fields[i % fields.len()], categories[c]).expect("move");
                }
                _ => {}
            }
            for &categoryid in &categories {
                let members = db.list(&Scope::Fields { categoryid }).expect("list");
                prop_assert!(is_contiguous(&members), "category {} is {:?}", categoryid, members);
            }
        }
        prop_assert!(is_contiguous(&db.list(&Scope::Categories(area)).expect("list")));
    }
}
