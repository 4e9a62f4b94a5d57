use bson::doc;
use devcamper::engine::Engine;
use devcamper::models::{Bootcamp, Model};
use devcamper::query::{PageDefaults, parse_pairs};
use devcamper::results::materialize;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_skip_and_window(page in 1usize..50, limit in 1usize..100) {
        let q = parse_pairs(
            [("page", page.to_string()), ("limit", limit.to_string())],
            &PageDefaults::default(),
        ).unwrap();
        prop_assert_eq!(q.page, page);
        prop_assert_eq!(q.limit, limit);
        prop_assert_eq!(q.skip(), (page - 1) * limit);
    }

    #[test]
    fn prop_pagination_links(total in 0usize..40, page in 1usize..8, limit in 1usize..10) {
        let engine = Engine::in_memory();
        let col = engine.create_collection(Bootcamp::COLLECTION);
        for i in 0..total {
            col.insert_document(doc! {"n": i as i64}).unwrap();
        }
        let q = parse_pairs(
            [("page", page.to_string()), ("limit", limit.to_string()), ("sort", "n".to_string())],
            &PageDefaults::default(),
        ).unwrap();
        let env = materialize::<Bootcamp>(&engine, None, &q);

        prop_assert!(env.count <= limit);
        prop_assert_eq!(env.count, total.saturating_sub((page - 1) * limit).min(limit));
        prop_assert_eq!(env.pagination.next.is_some(), page * limit < total);
        prop_assert_eq!(env.pagination.prev.is_some(), page > 1);
        if let Some(first) = env.data.first() {
            prop_assert_eq!(first["n"].as_i64(), Some(((page - 1) * limit) as i64));
        }
    }

    #[test]
    fn prop_gt_selects_strictly_greater(values in proptest::collection::vec(-50i64..50, 0..30), pivot in -50i64..50) {
        let engine = Engine::in_memory();
        let col = engine.create_collection(Bootcamp::COLLECTION);
        for v in &values {
            col.insert_document(doc! {"v": *v}).unwrap();
        }
        let q = parse_pairs(
            [("v[gt]".to_string(), pivot.to_string()), ("limit".to_string(), "100".to_string())],
            &PageDefaults::default(),
        ).unwrap();
        let env = materialize::<Bootcamp>(&engine, None, &q);
        prop_assert_eq!(env.count, values.iter().filter(|v| **v > pivot).count());
        prop_assert!(env.data.iter().all(|d| d["v"].as_i64().unwrap() > pivot));
    }
}
