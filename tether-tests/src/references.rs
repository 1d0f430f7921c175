use crate::{Backend, recreate};
use std::sync::{Mutex, PoisonError};
use tether::{FieldDef, Mode, Query, Record, Schema, ValidationError, ValidationReason, Value};

pub fn references(backend: &Backend) {
    static MUTEX: Mutex<()> = Mutex::new(());
    let _lock = MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
    let driver = &backend.driver;

    // Setup
    recreate(
        driver.as_ref(),
        "country",
        &format!(
            "CREATE TABLE country (\n\
                id {},\n\
                name VARCHAR(60) NOT NULL\n\
            )",
            backend.serial_key
        ),
    );
    recreate(
        driver.as_ref(),
        "city",
        &format!(
            "CREATE TABLE city (\n\
                id {},\n\
                name VARCHAR(60) NOT NULL,\n\
                country_id INTEGER\n\
            )",
            backend.serial_key
        ),
    );
    let country = Schema::builder("country")
        .field(FieldDef::int("id").primary_key())
        .field(FieldDef::text("name").max_length(60))
        .build()
        .expect("Invalid country schema");
    let city = Schema::builder("city")
        .field(FieldDef::int("id").primary_key())
        .field(FieldDef::text("name").max_length(60))
        .field(
            FieldDef::reference("country", country.clone())
                .column("country_id")
                .nullable(),
        )
        .build()
        .expect("Invalid city schema");

    let mut italy = Record::new(country.clone(), driver.clone());
    italy.set("name", "Italy").expect("Failed to set the name");
    italy.save().expect("Failed to insert Italy");
    let italy_id = italy.primary_key().cloned().expect("Italy has a key");
    let mut spain = Record::new(country.clone(), driver.clone());
    spain.set("name", "Spain").expect("Failed to set the name");
    spain.save().expect("Failed to insert Spain");
    let spain_id = spain.primary_key().cloned().expect("Spain has a key");

    // Assign a record
    let mut rome = Record::new(city.clone(), driver.clone());
    rome.set("name", "Rome").expect("Failed to set the name");
    rome.set_record("country", italy)
        .expect("Failed to set the country");
    assert_eq!(rome.get("country"), Some(&italy_id));
    rome.save().expect("Failed to insert Rome");
    assert_eq!(rome.snapshot().get("country_id"), Some(&italy_id));

    // Loading resolves the referenced row
    let mut found = Record::new(city.clone(), driver.clone());
    assert!(
        found
            .load(rome.primary_key().cloned().expect("Rome has a key"))
            .expect("Failed to load Rome")
    );
    assert_eq!(found.get("country"), Some(&italy_id));
    assert_eq!(
        found
            .referenced("country")
            .and_then(|v| v.get("name"))
            .and_then(Value::as_str),
        Some("Italy")
    );

    // Assign a raw key
    found
        .set("country", spain_id.clone())
        .expect("Failed to move Rome");
    assert_eq!(
        found
            .referenced("country")
            .and_then(|v| v.get("name"))
            .and_then(Value::as_str),
        Some("Spain")
    );
    let missing = Value::Int64(spain_id.as_i64().unwrap_or_default() + 1000);
    let error = found
        .set("country", missing)
        .expect_err("No country has this key");
    assert_eq!(
        error.downcast_ref::<ValidationError>().map(|v| &v.reason),
        Some(&ValidationReason::NotFound)
    );
    assert_eq!(found.get("country"), Some(&spain_id));
    found.save().expect("Failed to update Rome");

    // Null reference
    let mut nowhere = Record::new(city.clone(), driver.clone());
    nowhere.set("name", "Atlantis").expect("Failed to set the name");
    nowhere.save().expect("Failed to insert Atlantis");
    assert!(nowhere.referenced("country").is_none());

    let mut query = Query::of(city, driver.clone());
    query
        .order(["name"])
        .all(Mode::Records)
        .expect("Failed to query the cities");
    assert_eq!(query.len(), 2);
    assert!(query.records()[0].get("country").is_some_and(Value::is_null));
    assert_eq!(
        query.records()[1]
            .referenced("country")
            .and_then(|v| v.get("name"))
            .and_then(Value::as_str),
        Some("Spain")
    );
}
