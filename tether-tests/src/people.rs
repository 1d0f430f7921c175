use crate::{Backend, recreate};
use rust_decimal::Decimal;
use std::sync::{
    Arc, LazyLock, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};
use tether::{
    Driver, DuplicateKeyError, FieldDef, Hooks, Model, NotSavedReason, ObjectNotSavedError,
    Record, Result, Schema, Value,
};
use time::macros::date;

static LOADED: AtomicUsize = AtomicUsize::new(0);
static SAVED: AtomicUsize = AtomicUsize::new(0);

struct Counters;

impl Hooks for Counters {
    fn on_load(&self, _record: &mut Record) {
        LOADED.fetch_add(1, Ordering::Relaxed);
    }
    fn on_save(&self, _record: &mut Record) {
        SAVED.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct Person(Record);

impl Person {
    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(Value::as_i64)
    }
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        self.0.set("name", name)
    }
    pub fn age(&self) -> Option<i64> {
        self.0.get("age").and_then(Value::as_i64)
    }
    pub fn set_age(&mut self, age: Option<i64>) -> Result<()> {
        self.0.set("age", age)
    }
}

impl Model for Person {
    fn schema() -> Arc<Schema> {
        static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
            Schema::builder("person")
                .field(FieldDef::int("id").primary_key())
                .field(FieldDef::text("name").column("full_name").max_length(50))
                .field(FieldDef::int("age").nullable())
                .field(FieldDef::boolean("active").default(true))
                .field(FieldDef::decimal("salary").nullable())
                .field(FieldDef::date("birthday").nullable())
                .field(FieldDef::bytes("badge").nullable())
                .hooks(Counters)
                .build()
                .expect("Invalid person schema")
        });
        SCHEMA.clone()
    }
    fn from_record(record: Record) -> Self {
        Person(record)
    }
    fn record(&self) -> &Record {
        &self.0
    }
    fn record_mut(&mut self) -> &mut Record {
        &mut self.0
    }
}

pub fn people(backend: &Backend) {
    static MUTEX: Mutex<()> = Mutex::new(());
    let _lock = MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
    let driver: &Arc<dyn Driver> = &backend.driver;

    // Setup
    recreate(
        driver.as_ref(),
        "person",
        &format!(
            "CREATE TABLE person (\n\
                id {},\n\
                full_name VARCHAR(50) NOT NULL,\n\
                age INTEGER,\n\
                active CHAR(1) NOT NULL,\n\
                salary NUMERIC(10, 2),\n\
                birthday DATE,\n\
                badge {}\n\
            )",
            backend.serial_key, backend.blob_type
        ),
    );
    let loaded = LOADED.load(Ordering::Relaxed);
    let saved = SAVED.load(Ordering::Relaxed);

    // Insert
    let mut ann = Person::create(driver.clone());
    assert!(ann.is_new());
    ann.set_name("Ann").expect("Failed to set the name");
    ann.set_age(Some(34)).expect("Failed to set the age");
    ann.record_mut()
        .set("salary", Decimal::new(120050, 2))
        .expect("Failed to set the salary");
    ann.record_mut()
        .set("birthday", date!(1990 - 05 - 17))
        .expect("Failed to set the birthday");
    ann.record_mut()
        .set("badge", vec![0xCAu8, 0xFE])
        .expect("Failed to set the badge");
    ann.save().expect("Failed to insert Ann");
    assert!(!ann.is_new());
    let id = ann.id().expect("The key of Ann was not recovered");
    assert_eq!(ann.record().get("active"), Some(&Value::Boolean(true)));
    assert_eq!(
        ann.record().snapshot().get("full_name"),
        Some(&Value::from("Ann"))
    );
    assert_eq!(
        ann.record().snapshot().get("active"),
        Some(&Value::from("Y"))
    );
    assert!(ann.record().to_string().starts_with("person: id="));
    assert_eq!(SAVED.load(Ordering::Relaxed), saved + 1);

    // Load
    let mut found = Person::find(driver.clone(), id)
        .expect("Failed to load Ann")
        .expect("Ann was not found");
    assert!(!found.is_new());
    assert_eq!(found.id(), Some(id));
    assert_eq!(found.name(), Some("Ann"));
    assert_eq!(found.age(), Some(34));
    assert_eq!(found.record().get("active"), Some(&Value::Boolean(true)));
    assert_eq!(
        found.record().get("salary").and_then(Value::as_decimal),
        Some(Decimal::new(120050, 2))
    );
    assert_eq!(
        found.record().get("birthday"),
        Some(&Value::Date(date!(1990 - 05 - 17)))
    );
    assert_eq!(
        found.record().get("badge").and_then(Value::as_bytes),
        Some(&[0xCAu8, 0xFE][..])
    );
    assert_eq!(LOADED.load(Ordering::Relaxed), loaded + 1);
    assert!(
        Person::find(driver.clone(), id + 1000)
            .expect("Failed to query a missing person")
            .is_none()
    );
    assert_eq!(LOADED.load(Ordering::Relaxed), loaded + 1);

    // Update
    found.set_age(Some(35)).expect("Failed to set the age");
    found
        .record_mut()
        .set("active", false)
        .expect("Failed to set active");
    found.save().expect("Failed to update Ann");
    assert_eq!(found.record().snapshot().get("age"), Some(&Value::Int64(35)));
    let found = Person::find(driver.clone(), id)
        .expect("Failed to load Ann")
        .expect("Ann was not found");
    assert_eq!(found.age(), Some(35));
    assert_eq!(found.record().get("active"), Some(&Value::Boolean(false)));
    assert_eq!(SAVED.load(Ordering::Relaxed), saved + 2);

    // Duplicate key
    let mut twin = Person::create(driver.clone());
    twin.record_mut().set("id", id).expect("Failed to set the key");
    twin.set_name("Bob").expect("Failed to set the name");
    let mut result = Ok(());
    crate::silent_logs! {
        result = twin.save();
    }
    let error = result.expect_err("The key of Ann is taken");
    assert_eq!(
        error
            .downcast_ref::<ObjectNotSavedError>()
            .map(|v| v.reason),
        Some(NotSavedReason::DuplicateKey)
    );
    assert!(error.downcast_ref::<DuplicateKeyError>().is_some());
    assert!(twin.is_new());
    assert_eq!(SAVED.load(Ordering::Relaxed), saved + 2);

    // Stale snapshot: the second writer no longer identifies the row
    let mut first = Person::find(driver.clone(), id)
        .expect("Failed to load Ann")
        .expect("Ann was not found");
    let mut second = Person::find(driver.clone(), id)
        .expect("Failed to load Ann")
        .expect("Ann was not found");
    first.set_age(Some(40)).expect("Failed to set the age");
    first.save().expect("Failed to update Ann");
    second.set_age(Some(50)).expect("Failed to set the age");
    crate::silent_logs! {
        second.save().expect("An update matching no row is not an error");
    }
    let found = Person::find(driver.clone(), id)
        .expect("Failed to load Ann")
        .expect("Ann was not found");
    assert_eq!(found.age(), Some(40));

    // Many
    for (name, age) in [("Carl", Some(20)), ("Dana", None), ("Eve", Some(61))] {
        let mut person = Person::create(driver.clone());
        person.set_name(name).expect("Failed to set the name");
        person.set_age(age).expect("Failed to set the age");
        person.save().expect("Failed to insert a person");
        assert!(person.id().is_some_and(|v| v != id));
    }
    let mut query = Person::query(driver.clone());
    query
        .order(["name"])
        .all(tether::Mode::Records)
        .expect("Failed to query people");
    let people = Person::from_query(&query);
    assert_eq!(
        people.iter().filter_map(Person::name).collect::<Vec<_>>(),
        ["Ann", "Carl", "Dana", "Eve"]
    );
    assert_eq!(people[2].age(), None);
}
