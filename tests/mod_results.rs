use bson::{Bson, doc};
use devcamper::engine::Engine;
use devcamper::models::{Bootcamp, Course, Model, User};
use devcamper::query::{PageDefaults, parse_pairs};
use devcamper::results::{Populate, materialize};
use serde_json::json;

fn seed(engine: &Engine) -> Vec<bson::oid::ObjectId> {
    let camps = engine.create_collection(Bootcamp::COLLECTION);
    let mut ids = Vec::new();
    for (i, (name, careers, cost)) in [
        ("Devworks", vec!["Web Development", "UI/UX", "Business"], 10000),
        ("ModernTech", vec!["Web Development", "UI/UX", "Mobile Development"], 8000),
        ("Codemasters", vec!["Web Development", "Data Science", "Business"], 12000),
        ("Devcentral", vec!["Mobile Development", "Web Development", "Data Science", "Business"], 6000),
    ]
    .into_iter()
    .enumerate()
    {
        let id = camps
            .insert_document(doc! {
                "name": name,
                "careers": careers,
                "averageCost": cost,
                "housing": i % 2 == 0,
                "createdAt": bson::DateTime::from_millis(1_600_000_000_000 + i as i64 * 1000),
            })
            .unwrap();
        ids.push(id);
    }
    ids
}

fn query(q: &[(&str, &str)]) -> devcamper::query::ListQuery {
    parse_pairs(q.iter().copied(), &PageDefaults::default()).unwrap()
}

#[test]
fn default_listing_is_newest_first_with_no_pagination() {
    let engine = Engine::in_memory();
    seed(&engine);
    let env = materialize::<Bootcamp>(&engine, None, &query(&[]));
    assert_eq!(env.count, 4);
    let names: Vec<_> = env.data.iter().map(|d| d["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Devcentral", "Codemasters", "ModernTech", "Devworks"]);
    assert_eq!(serde_json::to_value(&env.pagination).unwrap(), json!({}));
}

#[test]
fn range_and_equality_conditions_combine() {
    let engine = Engine::in_memory();
    seed(&engine);
    let env = materialize::<Bootcamp>(
        &engine,
        None,
        &query(&[("averageCost[lte]", "10000"), ("housing", "true"), ("select", "name"), ("sort", "name")]),
    );
    assert_eq!(env.data, vec![json!({"_id": env.data[0]["_id"], "name": "Devworks"})]);
}

#[test]
fn pages_walk_the_filtered_set() {
    let engine = Engine::in_memory();
    seed(&engine);
    let page = |p: &str| {
        materialize::<Bootcamp>(
            &engine,
            None,
            &query(&[("careers[in]", "Business"), ("sort", "averageCost"), ("limit", "2"), ("page", p)]),
        )
    };
    let first = page("1");
    assert_eq!(first.data.iter().map(|d| d["averageCost"].as_i64().unwrap()).collect::<Vec<_>>(), [6000, 10000]);
    assert_eq!(serde_json::to_value(&first.pagination).unwrap(), json!({"next": {"page": 2, "limit": 2}}));
    let second = page("2");
    assert_eq!(second.count, 1);
    assert_eq!(serde_json::to_value(&second.pagination).unwrap(), json!({"prev": {"page": 1, "limit": 2}}));
    assert_eq!(page("3").count, 0);
}

#[test]
fn reverse_populate_attaches_children_unless_projected_away() {
    let engine = Engine::in_memory();
    let ids = seed(&engine);
    let courses = engine.create_collection(Course::COLLECTION);
    for title in ["Front End", "Full Stack"] {
        courses.insert_document(doc! {"title": title, "bootcamp": ids[0]}).unwrap();
    }
    let populate = Populate::reverse("courses", Course::COLLECTION, "bootcamp");

    let env = materialize::<Bootcamp>(&engine, Some(&populate), &query(&[("name", "Devworks")]));
    let titles: Vec<_> =
        env.data[0]["courses"].as_array().unwrap().iter().map(|c| c["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["Front End", "Full Stack"]);

    let env = materialize::<Bootcamp>(&engine, Some(&populate), &query(&[("select", "name")]));
    assert!(env.data.iter().all(|d| d.get("courses").is_none()));
}

#[test]
fn forward_populate_nulls_dangling_references() {
    let engine = Engine::in_memory();
    let ids = seed(&engine);
    let courses = engine.create_collection(Course::COLLECTION);
    courses.insert_document(doc! {"title": "Kept", "bootcamp": ids[1]}).unwrap();
    courses.insert_document(doc! {"title": "Orphan", "bootcamp": bson::oid::ObjectId::new()}).unwrap();

    let populate = Populate::forward("bootcamp", Bootcamp::COLLECTION).select(&["name"]);
    let env = materialize::<Course>(&engine, Some(&populate), &query(&[("sort", "title")]));
    assert_eq!(env.data[0]["bootcamp"]["name"], "ModernTech");
    assert!(env.data[0]["bootcamp"].get("careers").is_none());
    assert_eq!(env.data[1]["bootcamp"], serde_json::Value::Null);
}

#[test]
fn hidden_fields_never_render() {
    let engine = Engine::in_memory();
    engine
        .create_collection(User::COLLECTION)
        .insert_document(doc! {"name": "x", "password": "$argon2id$", "resetPasswordToken": Bson::String("t".into())})
        .unwrap();
    let env = materialize::<User>(&engine, None, &query(&[("select", "name,password")]));
    assert!(env.data[0].get("password").is_none());
    assert_eq!(env.data[0]["name"], "x");
}
