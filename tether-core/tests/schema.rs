#[cfg(test)]
mod tests {
    use tether_core::{FieldDef, Record, Schema, Value};

    struct Invoice;

    #[test]
    fn mapping() {
        let schema = Schema::builder("person")
            .field(FieldDef::int("id").primary_key().column("person_id"))
            .field(FieldDef::text("name").column("full_name"))
            .field(FieldDef::int("age").nullable())
            .build()
            .expect("Valid schema");
        assert_eq!(schema.table_name(), "person");
        assert_eq!(schema.primary_key().map(|v| v.name()), Some("id"));
        assert_eq!(schema.column_name("name"), Some("full_name"));
        assert_eq!(schema.column_name("age"), Some("age"));
        assert_eq!(schema.attribute_name("full_name"), Some("name"));
        assert_eq!(schema.attribute_name("FULL_NAME"), Some("name"));
        assert_eq!(schema.attribute_name("missing"), None);
        assert_eq!(schema.resolve("person_id"), Some(0));
        assert_eq!(schema.resolve("id"), Some(0));
        assert_eq!(
            schema.columns().collect::<Vec<_>>(),
            ["person_id", "full_name", "age"]
        );
    }

    #[test]
    fn table_from_type() {
        let schema = Schema::builder_for::<Invoice>()
            .field(FieldDef::int("id").primary_key())
            .build()
            .expect("Valid schema");
        assert_eq!(schema.table_name(), "Invoice");
    }

    #[test]
    fn invalid_declarations() {
        assert!(
            Schema::builder("t")
                .field(FieldDef::int("a"))
                .field(FieldDef::text("a"))
                .build()
                .is_err()
        );
        assert!(
            Schema::builder("t")
                .field(FieldDef::int("a"))
                .field(FieldDef::text("b").column("a"))
                .build()
                .is_err()
        );
        assert!(
            Schema::builder("t")
                .field(FieldDef::int("a").primary_key())
                .field(FieldDef::int("b").primary_key())
                .build()
                .is_err()
        );
        assert!(
            Schema::builder("t")
                .field(FieldDef::int("a").default("ten"))
                .build()
                .is_err()
        );
        assert!(Schema::builder("").build().is_err());
        let target = Schema::builder("target")
            .field(FieldDef::int("id").primary_key())
            .build()
            .expect("Valid schema");
        assert!(
            Schema::builder("t")
                .field(FieldDef::reference("target", target).default(1))
                .build()
                .is_err()
        );
    }

    #[test]
    fn defaults_are_normalized() {
        let schema = Schema::builder("t")
            .field(FieldDef::decimal("price").default(2.5))
            .field(FieldDef::boolean("active").default("Y"))
            .build()
            .expect("Valid schema");
        let record = Record::detached(schema);
        assert_eq!(
            record.get("price"),
            Some(&Value::Decimal(rust_decimal::Decimal::new(25, 1)))
        );
        assert_eq!(record.get("active"), Some(&Value::Boolean(true)));
        assert!(record.is_new());
        assert!(record.snapshot().is_empty());
    }
}
