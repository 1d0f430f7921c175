use crate::{Backend, recreate};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, PoisonError};
use tether::{FieldDef, Mode, Query, Record, Schema, Value, filters};

fn names(query: &Query) -> Vec<String> {
    query
        .records()
        .iter()
        .filter_map(|v| v.get("name").and_then(Value::as_str))
        .map(ToString::to_string)
        .collect()
}

pub fn queries(backend: &Backend) {
    static MUTEX: Mutex<()> = Mutex::new(());
    let _lock = MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
    let driver = &backend.driver;

    // Setup
    recreate(
        driver.as_ref(),
        "item",
        &format!(
            "CREATE TABLE item (\n\
                id {},\n\
                name VARCHAR(40) NOT NULL,\n\
                category VARCHAR(20) NOT NULL,\n\
                price NUMERIC(8, 2) NOT NULL,\n\
                stock INTEGER\n\
            )",
            backend.serial_key
        ),
    );
    let schema = Schema::builder("item")
        .field(FieldDef::int("id").primary_key())
        .field(FieldDef::text("name").max_length(40))
        .field(FieldDef::text("category").choices(["food", "tools"]))
        .field(FieldDef::decimal("price"))
        .field(FieldDef::int("stock").nullable())
        .build()
        .expect("Invalid item schema");
    let items = [
        ("hammer", "tools", Decimal::new(1250, 2), Some(10)),
        ("wrench", "tools", Decimal::new(800, 2), Some(0)),
        ("apple", "food", Decimal::new(40, 2), None),
        ("pear", "food", Decimal::new(55, 2), Some(120)),
        ("saw", "tools", Decimal::new(2500, 2), None),
    ];
    for (name, category, price, stock) in items {
        let mut item = Record::new(schema.clone(), driver.clone());
        item.set("name", name).expect("Failed to set the name");
        item.set("category", category)
            .expect("Failed to set the category");
        item.set("price", price).expect("Failed to set the price");
        item.set("stock", stock).expect("Failed to set the stock");
        item.save().expect("Failed to insert an item");
    }
    let mut query = Query::of(schema.clone(), Arc::clone(driver));

    // Equality
    query
        .get(Mode::Records, filters!(category = "tools"))
        .expect("Failed to query the tools");
    assert_eq!(query.len(), 3);
    assert!(query.records().iter().all(|v| !v.is_new()));

    // Comparison and ordering
    query
        .order(["-price"])
        .get(Mode::Records, filters!(price__gte = Decimal::new(800, 2)))
        .expect("Failed to query by price");
    assert_eq!(names(&query), ["saw", "hammer", "wrench"]);

    query
        .order(["name"])
        .get(Mode::Records, filters!(name__like = "%a%"))
        .expect("Failed to query by name");
    assert_eq!(names(&query), ["apple", "hammer", "pear", "saw"]);

    query
        .order(["name"])
        .get(Mode::Records, filters!(name__not_like = "%a%"))
        .expect("Failed to query by name");
    assert_eq!(names(&query), ["wrench"]);

    // Null
    query
        .order(["name"])
        .get(Mode::Records, filters!(stock = Value::Null))
        .expect("Failed to query the missing stock");
    assert_eq!(names(&query), ["apple", "saw"]);
    query
        .get(Mode::Records, filters!(stock__not = Value::Null))
        .expect("Failed to query the known stock");
    assert_eq!(query.len(), 3);
    query
        .get(Mode::Records, filters!(stock__lt = 10))
        .expect("Failed to query the low stock");
    assert_eq!(names(&query), ["wrench"]);

    // Lists
    query
        .order(["name"])
        .get(
            Mode::Records,
            filters!(name__in = Value::list(["apple", "saw", "kiwi"])),
        )
        .expect("Failed to query a list of names");
    assert_eq!(names(&query), ["apple", "saw"]);
    query
        .get(Mode::Records, filters!(category__not_in = Value::list(["food"])))
        .expect("Failed to query excluding a category");
    assert_eq!(query.len(), 3);
    query
        .get(
            Mode::Records,
            filters!(name__in = Value::list(Vec::<&str>::new())),
        )
        .expect("Failed to query an empty list");
    assert!(query.is_empty());

    // Conjunction
    query
        .get(Mode::Records, filters!(category = "tools", stock__gt = 5))
        .expect("Failed to query combined filters");
    assert_eq!(names(&query), ["hammer"]);

    // Projections come back labeled
    query
        .select(["category"], true)
        .order(["category"])
        .get(Mode::Records, filters!())
        .expect("Failed to query the categories");
    assert_eq!(query.result().mode(), Mode::Maps);
    assert_eq!(
        query
            .maps()
            .iter()
            .filter_map(|v| v.get_column("category").and_then(Value::as_str))
            .collect::<Vec<_>>(),
        ["food", "tools"]
    );
    query
        .select(["(COUNT(*)) total"], false)
        .get(Mode::Maps, filters!(category = "food"))
        .expect("Failed to count the food");
    assert_eq!(
        query.maps()[0].get_column("total").and_then(Value::as_i64),
        Some(2)
    );

    // The projection applied to one execution only
    query.all(Mode::Rows).expect("Failed to query the rows");
    assert_eq!(query.rows().len(), 5);
    assert!(query.rows().iter().all(|v| v.len() == 5));

    // Restrictions over the resultset
    query
        .order(["name"])
        .all(Mode::Records)
        .expect("Failed to query the items");
    let only = query
        .only(filters!(category = "tools", stock = Value::Null))
        .expect("Failed to restrict the items");
    assert_eq!(only.len(), 1);
    assert_eq!(
        only.records()[0].get("name").and_then(Value::as_str),
        Some("saw")
    );
    assert_eq!(query.len(), 5);
    assert!(query.only(filters!(color = "red")).is_err());
    query
        .all(Mode::Maps)
        .expect("Failed to query the items as maps");
    assert_eq!(
        query
            .only(filters!(stock = 120))
            .expect("Failed to restrict the maps")
            .len(),
        1
    );

    // Unknown attributes are refused before reaching the database
    assert!(
        query
            .get(Mode::Records, filters!(color = "red"))
            .is_err()
    );

    // Delete
    query
        .get(Mode::Records, filters!(category = "tools"))
        .expect("Failed to query the tools");
    assert_eq!(query.delete_all().expect("Failed to delete the tools"), 3);
    assert!(query.is_empty());
    query
        .order(["name"])
        .all(Mode::Records)
        .expect("Failed to query the items");
    assert_eq!(names(&query), ["apple", "pear"]);
}
