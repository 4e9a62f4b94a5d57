use devcamper::engine::Engine;
use devcamper::errors::DbError;
use devcamper::models::course::refresh_average_cost;
use devcamper::models::{self, Bootcamp, BootcampInput, Course, CourseInput, Review, ReviewInput};
use bson::oid::ObjectId;

fn bootcamp(name: &str, user: ObjectId) -> Bootcamp {
    Bootcamp::new(
        BootcampInput {
            name: Some(name.into()),
            description: Some("A bootcamp".into()),
            address: Some("Boston MA 02118".into()),
            careers: Some(vec!["Business".into()]),
            ..BootcampInput::default()
        },
        user,
    )
}

fn course(title: &str, tuition: f64) -> CourseInput {
    CourseInput {
        title: Some(title.into()),
        description: Some("d".into()),
        weeks: Some("6".into()),
        tuition: Some(tuition),
        minimum_skill: Some("advanced".into()),
        scholarship_available: None,
    }
}

#[test]
fn model_writes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let user = ObjectId::new();
    let camp = bootcamp("Devworks", user);
    {
        let engine = Engine::open(dir.path()).unwrap();
        models::register_indexes(&engine).unwrap();
        models::create(&engine, &camp).unwrap();
        for (t, fee) in [("A", 1000.0), ("B", 2500.0)] {
            models::create(&engine, &Course::new(course(t, fee), camp.id, user)).unwrap();
        }
        refresh_average_cost(&engine, &camp.id).unwrap();
        engine.flush().unwrap();
    }

    let engine = Engine::open(dir.path()).unwrap();
    models::register_indexes(&engine).unwrap();
    let stored: Bootcamp = models::find_by_id(&engine, &camp.id).unwrap().unwrap();
    assert_eq!(stored.name, "Devworks");
    assert_eq!(stored.average_cost, Some(1750.0));
    assert_eq!(stored.slug, camp.slug);

    let dup = bootcamp("Devworks", ObjectId::new());
    assert!(matches!(models::create(&engine, &dup), Err(DbError::DuplicateKey { .. })));
}

#[test]
fn cascade_delete_removes_children() {
    let engine = Engine::in_memory();
    models::register_indexes(&engine).unwrap();
    let user = ObjectId::new();
    let camp = bootcamp("Devworks", user);
    models::create(&engine, &camp).unwrap();
    models::create(&engine, &Course::new(course("A", 100.0), camp.id, user)).unwrap();
    let review = Review::new(
        ReviewInput { title: Some("Fine".into()), text: Some("ok".into()), rating: Some(6.0) },
        camp.id,
        user,
    );
    models::create(&engine, &review).unwrap();

    let other = bootcamp("Elsewhere", user);
    models::create(&engine, &other).unwrap();
    models::create(&engine, &Course::new(course("B", 100.0), other.id, user)).unwrap();

    assert!(Bootcamp::delete_cascade(&engine, &camp.id).unwrap().is_some());
    let courses: Vec<Course> = models::find_all(&engine, &devcamper::query::Filter::True).unwrap();
    assert_eq!(courses.iter().map(|c| c.title.as_str()).collect::<Vec<_>>(), ["B"]);
    assert!(models::find_by_id::<Review>(&engine, &review.id).unwrap().is_none());
    assert!(Bootcamp::delete_cascade(&engine, &camp.id).unwrap().is_none());
}

#[test]
fn save_of_a_removed_record_is_not_found() {
    let engine = Engine::in_memory();
    let camp = bootcamp("Gone", ObjectId::new());
    models::create(&engine, &camp).unwrap();
    models::remove::<Bootcamp>(&engine, &camp.id).unwrap();
    assert!(matches!(models::save(&engine, &camp), Err(DbError::NoSuchDocument(_))));
}
