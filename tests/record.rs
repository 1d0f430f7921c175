#[cfg(test)]
mod tests {
    use indoc::indoc;
    use std::sync::{Arc, LazyLock};
    use tether::{
        Dialect, DuplicateKeyError, FieldDef, Hooks, Model, NotConnectedError, NotSavedReason,
        ObjectNotSavedError, OracleDialect, Record, RowLabeled, RowSet, Schema, Value,
    };
    use tether_tests::{
        mock::{Kind, MockDriver, Response},
        silent_logs,
    };

    struct Upper;

    impl Hooks for Upper {
        fn on_load(&self, record: &mut Record) {
            if let Some(name) = record
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_uppercase)
            {
                let _ = record.set("name", name);
            }
        }
    }

    fn schema() -> Arc<Schema> {
        static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
            Schema::builder("person")
                .field(FieldDef::int("id").primary_key())
                .field(FieldDef::text("name").column("full_name"))
                .field(FieldDef::int("age").nullable())
                .field(FieldDef::boolean("active").default(true))
                .build()
                .expect("Valid schema")
        });
        SCHEMA.clone()
    }

    fn person_row(id: i64, name: &str, age: Value, active: &str) -> RowSet {
        RowSet::new(["id", "full_name", "age", "active"]).with_row([
            Value::Int64(id),
            Value::from(name),
            age,
            Value::from(active),
        ])
    }

    #[test]
    fn insert_then_update() {
        let mock = MockDriver::default();
        let mut record = Record::new(schema(), Arc::new(mock.clone()));
        assert!(record.is_new());
        record.set("name", "Ann").expect("Valid name");
        record.set("age", 30).expect("Valid age");
        mock.respond(Response::Affected(1)).respond(Response::Rows(
            RowSet::new(["id"]).with_row([Value::Int64(7)]),
        ));
        record.save().expect("Insert");
        assert!(!record.is_new());
        assert_eq!(record.primary_key(), Some(&Value::Int64(7)));
        assert_eq!(
            record.snapshot().iter().collect::<Vec<_>>(),
            [
                (&"id".to_string(), &Value::Int64(7)),
                (&"full_name".to_string(), &Value::from("Ann")),
                (&"age".to_string(), &Value::Int64(30)),
                (&"active".to_string(), &Value::from("Y")),
            ]
        );

        let executions = mock.executions();
        assert_eq!(executions.len(), 2);
        assert_eq!(executions[0].kind, Kind::Command);
        assert_eq!(
            executions[0].sql,
            indoc! {r#"
                INSERT INTO "person" ("full_name", "age", "active")
                VALUES (%(full_name)s, %(age)s, %(active)s)
            "#}
            .trim()
        );
        assert_eq!(executions[0].params.get("active"), Some(&Value::from("Y")));
        assert_eq!(executions[1].kind, Kind::QueryWithColumns);
        assert_eq!(
            executions[1].sql,
            indoc! {r#"
                SELECT "id"
                FROM "person"
                WHERE "full_name" = %(name)s AND "age" = %(age)s AND "active" = %(active)s
                ORDER BY "id" DESC
            "#}
            .trim()
        );
        assert_eq!(mock.connections(), (2, 2));

        mock.clear();
        record.set("age", 31).expect("Valid age");
        record.save().expect("Update");
        let executions = mock.executions();
        assert_eq!(executions.len(), 1);
        assert_eq!(
            executions[0].sql,
            indoc! {r#"
                UPDATE "person"
                SET "full_name" = %(full_name)s, "age" = %(age)s, "active" = %(active)s
                WHERE "id" = %(old__id)s AND "full_name" = %(old__full_name)s AND "age" = %(old__age)s AND "active" = %(old__active)s
            "#}
            .trim()
        );
        let params = &executions[0].params;
        assert_eq!(params.get("age"), Some(&Value::Int64(31)));
        assert_eq!(params.get("old__age"), Some(&Value::Int64(30)));
        assert_eq!(params.get("old__id"), Some(&Value::Int64(7)));
        assert_eq!(record.snapshot().get("age"), Some(&Value::Int64(31)));
        assert_eq!(record.to_string(), "person: id=7, name=Ann, age=31, ...");
    }

    #[test]
    fn null_snapshot_values() {
        let mock = MockDriver::default();
        let mut record = Record::new(schema(), Arc::new(mock.clone()));
        mock.respond(Response::Rows(person_row(3, "Bob", Value::Null, "N")));
        assert!(record.load(3).expect("Load"));
        mock.clear();
        record.set("active", true).expect("Valid flag");
        record.save().expect("Update");
        assert_eq!(
            mock.executions()[0].sql,
            indoc! {r#"
                UPDATE "person"
                SET "full_name" = %(full_name)s, "age" = %(age)s, "active" = %(active)s
                WHERE "id" = %(old__id)s AND "full_name" = %(old__full_name)s AND "age" IS NULL AND "active" = %(old__active)s
            "#}
            .trim()
        );
        assert_eq!(
            mock.executions()[0].params.get("old__active"),
            Some(&Value::from("N"))
        );
        assert!(!mock.executions()[0].params.contains_key("old__age"));
    }

    #[test]
    fn oracle_insert() {
        let mock = MockDriver::new(OracleDialect);
        let mut record = Record::new(schema(), Arc::new(mock.clone()));
        record.set("id", 1).expect("Valid key");
        record.set("name", "Ann").expect("Valid name");
        record.save().expect("Insert");
        let executions = mock.executions();
        assert_eq!(executions.len(), 1);
        assert_eq!(
            executions[0].sql,
            indoc! {"
                INSERT INTO person (id, full_name, age, active)
                VALUES (:id, :full_name, :age, :active)
            "}
            .trim()
        );
        assert_eq!(executions[0].params.get("age"), Some(&Value::Null));
    }

    #[test]
    fn inserted_key_query() {
        struct LastId;
        impl Dialect for LastId {
            fn name(&self) -> &'static str {
                "last_id"
            }
            fn write_placeholder(&self, out: &mut String, name: &str) {
                out.push('@');
                out.push_str(name);
            }
            fn write_inserted_key_query(
                &self,
                out: &mut String,
                _table: &str,
                _primary_key: &str,
            ) -> bool {
                out.push_str("SELECT last_id()");
                true
            }
        }
        let mock = MockDriver::new(LastId);
        let mut record = Record::new(schema(), Arc::new(mock.clone()));
        record.set("name", "Ann").expect("Valid name");
        mock.respond(Response::Affected(1))
            .respond(Response::Rows(RowSet::new(["id"]).with_row([Value::Int64(9)])));
        record.save().expect("Insert");
        assert_eq!(record.primary_key(), Some(&Value::Int64(9)));
        let executions = mock.executions();
        assert_eq!(executions.len(), 2);
        assert_eq!(executions[1].kind, Kind::Query);
        assert_eq!(executions[1].sql, "SELECT last_id()");
        assert_eq!(mock.connections(), (1, 1));
    }

    #[test]
    fn unrecovered_key() {
        let mock = MockDriver::default();
        let mut record = Record::new(schema(), Arc::new(mock.clone()));
        record.set("name", "Ann").expect("Valid name");
        silent_logs! {
            record.save().expect("Insert");
        }
        assert!(!record.is_new());
        assert_eq!(record.primary_key(), Some(&Value::Null));
    }

    #[test]
    fn key_lookup_failure_keeps_the_insert() {
        let mock = MockDriver::default();
        let mut record = Record::new(schema(), Arc::new(mock.clone()));
        record.set("name", "Ann").expect("Valid name");
        mock.respond(Response::Affected(1))
            .respond(Response::Fail("timeout".into()));
        silent_logs! {
            record.save().expect("The row was written");
        }
        assert!(!record.is_new());
        assert_eq!(record.primary_key(), Some(&Value::Null));
        assert_eq!(record.snapshot().get("full_name"), Some(&Value::from("Ann")));

        mock.clear();
        record.set("age", 20).expect("Valid age");
        record.save().expect("Update");
        let executions = mock.executions();
        assert_eq!(executions.len(), 1);
        assert!(executions[0].sql.starts_with("UPDATE "));
    }

    #[test]
    fn load() {
        let mock = MockDriver::new(tether::GenericDialect);
        let mut record = Record::new(schema(), Arc::new(mock.clone()));
        assert!(!record.load(5).expect("Query"));
        assert!(record.is_new());
        assert_eq!(
            mock.executions()[0].sql,
            indoc! {r#"
                SELECT "id", "full_name", "age", "active"
                FROM "person"
                WHERE "id" = %(id)s
            "#}
            .trim()
        );
        assert_eq!(mock.executions()[0].params.get("id"), Some(&Value::Int64(5)));

        mock.respond(Response::Rows(person_row(5, "Ann", Value::Int64(41), "N")));
        assert!(record.load(5).expect("Query"));
        assert!(!record.is_new());
        assert_eq!(record.get("name"), Some(&Value::from("Ann")));
        assert_eq!(record.get("age"), Some(&Value::Int64(41)));
        assert_eq!(record.get("active"), Some(&Value::Boolean(false)));
        assert_eq!(record.snapshot().get("active"), Some(&Value::from("N")));
    }

    #[test]
    fn load_data_is_atomic() {
        let mut record = Record::detached(schema());
        let labels: Arc<[String]> = ["ID".to_string(), "FULL_NAME".to_string()].into();
        record
            .load_data(&RowLabeled::new(
                labels.clone(),
                [Value::Int64(1), Value::from("Ann")].into(),
            ))
            .expect("Column names match ignoring case");
        assert_eq!(record.get("name"), Some(&Value::from("Ann")));
        assert_eq!(record.snapshot().get("full_name"), Some(&Value::from("Ann")));

        let error = record
            .load_data(&RowLabeled::new(
                ["id".to_string(), "age".to_string()].into(),
                [Value::Int64(2), Value::from("old")].into(),
            ))
            .expect_err("Text is not an integer");
        assert!(format!("{:#}", error).contains("While loading column `age` of `person`"));
        assert_eq!(record.primary_key(), Some(&Value::Int64(1)));

        silent_logs! {
            assert!(
                record
                    .load_data(&RowLabeled::new(
                        ["id".to_string(), "color".to_string()].into(),
                        [Value::Int64(3), Value::from("red")].into(),
                    ))
                    .is_err()
            );
        }
        assert_eq!(record.primary_key(), Some(&Value::Int64(1)));
        assert_eq!(record.snapshot().len(), 2);
    }

    #[test]
    fn hooks() {
        let schema = Schema::builder("person")
            .field(FieldDef::int("id").primary_key())
            .field(FieldDef::text("name").column("full_name"))
            .hooks(Upper)
            .build()
            .expect("Valid schema");
        let mock = MockDriver::default();
        let mut record = Record::new(schema, Arc::new(mock.clone()));
        mock.respond(Response::Rows(
            RowSet::new(["id", "full_name"]).with_row([Value::Int64(1), Value::from("ann")]),
        ));
        assert!(record.load(1).expect("Query"));
        assert_eq!(record.get("name"), Some(&Value::from("ANN")));
        assert_eq!(record.snapshot().get("full_name"), Some(&Value::from("ann")));
    }

    #[test]
    fn duplicate_key() {
        let mock = MockDriver::default();
        let mut record = Record::new(schema(), Arc::new(mock.clone()));
        record.set("id", 1).expect("Valid key");
        record.set("name", "Ann").expect("Valid name");
        mock.respond(Response::Duplicate("person_pkey".into()));
        let mut result = Ok(());
        silent_logs! {
            result = record.save();
        }
        let error = result.expect_err("The key is taken");
        assert_eq!(
            error.downcast_ref::<ObjectNotSavedError>().map(|v| v.reason),
            Some(NotSavedReason::DuplicateKey)
        );
        assert_eq!(
            error
                .downcast_ref::<DuplicateKeyError>()
                .map(|v| v.table.as_str()),
            Some("person")
        );
        assert!(record.is_new());
        assert!(record.snapshot().is_empty());

        mock.respond(Response::Fail("disk full".into()));
        let error = record.save().expect_err("Backend failure");
        assert!(error.downcast_ref::<ObjectNotSavedError>().is_none());
        assert_eq!(error.to_string(), "disk full");
    }

    #[test]
    fn not_connected() {
        let mut record = Record::detached(schema());
        record.set("name", "Ann").expect("Valid name");
        let mut result = Ok(());
        silent_logs! {
            result = record.save();
        }
        let error = result.expect_err("No backend");
        assert!(error.downcast_ref::<NotConnectedError>().is_some());
        assert!(record.is_new());

        let mock = MockDriver::default();
        mock.refuse_connections("connection refused");
        let mut record = Record::new(schema(), Arc::new(mock.clone()));
        let mut result = Ok(false);
        silent_logs! {
            result = record.load(1);
        }
        let error = result.expect_err("Refused");
        let error = error
            .downcast_ref::<NotConnectedError>()
            .expect("Reported as not connected");
        assert_eq!(error.backend, "mock");
        assert!(error.reason.contains("connection refused"));
        assert!(mock.executions().is_empty());
    }

    #[test]
    fn missing_snapshot() {
        let record = Record::detached(schema());
        let error = record.update_statement().expect_err("Never saved");
        assert_eq!(
            error.downcast_ref::<ObjectNotSavedError>().map(|v| v.reason),
            Some(NotSavedReason::MissingSnapshot)
        );
        assert!(record.delete_statement().is_err());
    }

    #[test]
    fn unknown_attribute() {
        let mut record = Record::detached(schema());
        assert!(record.set("color", "red").is_err());
        assert!(record.get("color").is_none());
        let error = record.set("age", "old").expect_err("Not an integer");
        assert!(error.downcast_ref::<tether::ValidationError>().is_some());
    }

    struct Person(Record);

    impl Model for Person {
        fn schema() -> Arc<Schema> {
            schema()
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

    #[test]
    fn model() {
        let mock = MockDriver::default();
        let driver = Arc::new(mock.clone());
        assert!(
            Person::find(driver.clone(), 1)
                .expect("Query")
                .is_none()
        );
        mock.respond(Response::Rows(person_row(1, "Ann", Value::Null, "Y")));
        let person = Person::find(driver.clone(), 1)
            .expect("Query")
            .expect("Found");
        assert!(!person.is_new());
        assert_eq!(person.record().get("name"), Some(&Value::from("Ann")));

        let mut person = Person::create(driver.clone());
        person
            .record_mut()
            .set("id", 2)
            .expect("Valid key");
        person
            .record_mut()
            .set("name", "Bob")
            .expect("Valid name");
        person.save().expect("Insert");
        assert!(!person.is_new());
    }
}
