#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use tether_core::{
        Field, FieldDef, Record, Schema, ValidationError, ValidationReason, Value,
    };
    use time::macros::{date, datetime, time};

    #[test]
    fn text_limits() {
        let mut field = Field::new(FieldDef::text("name")).expect("Field without default");
        assert_eq!(field.get(), &Value::Null);
        field.set("Ann").expect("Short text is valid");
        assert_eq!(field.get(), &Value::Varchar("Ann".into()));

        let error = field.set("").expect_err("Empty text is rejected by default");
        assert_eq!(error.reason, ValidationReason::Empty);
        assert_eq!(error.field, "name");
        assert_eq!(field.get().as_str(), Some("Ann"));

        let error = field.set("x".repeat(256)).expect_err("256 characters are too many");
        assert_eq!(
            error.reason,
            ValidationReason::TooLong {
                max_length: 255,
                length: 256
            }
        );
        assert_eq!(field.get().as_str(), Some("Ann"));
        field
            .set("é".repeat(255))
            .expect("The limit counts characters, not bytes");

        let mut field = Field::new(FieldDef::text("note").max_length(4).accept_empty())
            .expect("Field without default");
        field.set("").expect("Empty text accepted");
        assert!(field.set("hello").is_err());
        assert_eq!(field.get().as_str(), Some(""));
    }

    #[test]
    fn nullability_and_default() {
        let mut field = Field::new(FieldDef::int("age")).expect("Field without default");
        field.set(30).expect("Integer");
        let error = field.set(Value::Null).expect_err("Not nullable");
        assert_eq!(error.reason, ValidationReason::Null);
        assert_eq!(field.get(), &Value::Int64(30));

        let mut field = Field::new(FieldDef::int("age").nullable()).expect("Field without default");
        field.set(30).expect("Integer");
        field.set(None::<i64>).expect("Nullable");
        assert!(field.is_null());

        let mut field = Field::new(FieldDef::int("age").default(18)).expect("Valid default");
        assert_eq!(field.get(), &Value::Int64(18));
        field.set(40).expect("Integer");
        field.set(Value::Null).expect("The default replaces null");
        assert_eq!(field.get(), &Value::Int64(18));

        assert!(Field::new(FieldDef::text("name").default("")).is_err());
    }

    #[test]
    fn default_is_normalized_on_null() {
        let mut field =
            Field::new(FieldDef::boolean("active").default("Y")).expect("Storage code default");
        assert_eq!(field.get(), &Value::Boolean(true));
        field.set(false).expect("Boolean");
        field.set(Value::Null).expect("The default replaces null");
        assert_eq!(field.get(), &Value::Boolean(true));

        let mut field = Field::new(FieldDef::decimal("price").default("2.50"))
            .expect("Decimal text default");
        field.set(Value::Null).expect("The default replaces null");
        assert_eq!(field.get(), &Value::Decimal(Decimal::new(250, 2)));

        let mut field = Field::new(FieldDef::text("color").choices(["red"]))
            .expect("Field without default");
        field.set("red").expect("Permitted choice");
        assert!(Field::new(FieldDef::text("color").choices(["red"]).default("blue")).is_err());
    }

    #[test]
    fn choices() {
        let mut field = Field::new(FieldDef::text("color").nullable().choices(["red", "green"]))
            .expect("Field without default");
        field.set("red").expect("Permitted choice");
        let error = field.set("blue").expect_err("Not a permitted choice");
        assert_eq!(error.reason, ValidationReason::NotInChoices);
        assert_eq!(error.value, "blue");
        assert_eq!(field.get().as_str(), Some("red"));
        field.set(Value::Null).expect("Null is not checked against the choices");
    }

    #[test]
    fn boolean_codes() {
        let mut field = Field::new(FieldDef::boolean("active")).expect("Field without default");
        field.set(true).expect("Boolean");
        assert_eq!(field.storage_value(), Value::Varchar("Y".into()));
        field.set("N").expect("Storage code");
        assert_eq!(field.get(), &Value::Boolean(false));
        assert_eq!(field.storage_value(), Value::Varchar("N".into()));
        let error = field.set("maybe").expect_err("Not a code");
        assert_eq!(
            error.reason,
            ValidationReason::WrongType {
                expected: "boolean",
                found: "text"
            }
        );
        assert!(field.set(1).is_err());
        assert_eq!(field.get(), &Value::Boolean(false));
    }

    #[test]
    fn decimal_conversions() {
        let mut field = Field::new(FieldDef::decimal("price")).expect("Field without default");
        field.set(0.1).expect("Float");
        assert_eq!(field.get(), &Value::Decimal(Decimal::new(1, 1)));
        assert_eq!(field.get().to_string(), "0.1");
        field.set(12.5f32).expect("Float");
        assert_eq!(field.get(), &Value::Decimal(Decimal::new(1250, 2)));
        field.set("3.25").expect("Decimal text read back from storage");
        assert_eq!(field.get(), &Value::Decimal(Decimal::new(325, 2)));
        field.set(7).expect("Integer");
        assert_eq!(field.get(), &Value::Decimal(Decimal::from(7)));
        assert!(field.set("seven").is_err());
        assert!(field.set(f64::NAN).is_err());
        assert_eq!(field.get(), &Value::Decimal(Decimal::from(7)));
    }

    #[test]
    fn temporal() {
        let mut field = Field::new(FieldDef::date("birthday")).expect("Field without default");
        field.set(date!(2000 - 02 - 29)).expect("Date");
        field
            .set(datetime!(2024-02-29 10:30))
            .expect("The date of a timestamp");
        assert_eq!(field.get(), &Value::Date(date!(2024 - 02 - 29)));
        field
            .set_formatted("31/12/2023", "[day]/[month]/[year]")
            .expect("Formatted date");
        assert_eq!(field.get(), &Value::Date(date!(2023 - 12 - 31)));
        let error = field
            .set_formatted("31-12-2023", "[day]/[month]/[year]")
            .expect_err("Does not match the format");
        assert!(matches!(error.reason, ValidationReason::Malformed(..)));
        assert_eq!(field.get(), &Value::Date(date!(2023 - 12 - 31)));
        field.set("1999-01-05").expect("ISO text");
        assert_eq!(field.get(), &Value::Date(date!(1999 - 01 - 05)));
        assert!(field.set(time!(10:00)).is_err());

        let mut field = Field::new(FieldDef::datetime("created")).expect("Field without default");
        field.set("2024-01-05 08:15:00").expect("ISO text");
        assert_eq!(field.get(), &Value::Timestamp(datetime!(2024-01-05 8:15)));
        field.set("2024-01-05T08:15:30.25").expect("ISO text with T");
        assert_eq!(
            field.get(),
            &Value::Timestamp(datetime!(2024-01-05 8:15:30.25))
        );
        field
            .set_formatted("05.01.2024 21:40", "[day].[month].[year] [hour]:[minute]")
            .expect("Formatted timestamp");
        assert_eq!(field.get(), &Value::Timestamp(datetime!(2024-01-05 21:40)));
        assert!(field.set(date!(2024 - 01 - 05)).is_err());

        let mut field = Field::new(FieldDef::time("alarm")).expect("Field without default");
        field.set("12:30:15.5").expect("ISO text");
        assert_eq!(field.get(), &Value::Time(time!(12:30:15.5)));
        assert_eq!(field.get().to_string(), "12:30:15.5");
        field.set("07:05").expect("Minutes precision");
        assert_eq!(field.get(), &Value::Time(time!(7:05)));

        let mut field = Field::new(FieldDef::int("count")).expect("Field without default");
        let error = field
            .set_formatted("10", "[hour]")
            .expect_err("Only temporal fields parse formatted text");
        assert!(matches!(error.reason, ValidationReason::WrongType { .. }));
    }

    #[test]
    fn bytes_only() {
        let mut field = Field::new(FieldDef::bytes("payload")).expect("Field without default");
        field.set(vec![1u8, 2, 3]).expect("Bytes");
        assert_eq!(field.get().as_bytes(), Some(&[1u8, 2, 3][..]));
        assert!(field.set("abc").is_err());
        assert_eq!(field.get().to_string(), "0x010203");
    }

    #[test]
    fn display_formatter() {
        let mut field = Field::new(
            FieldDef::decimal("price")
                .nullable()
                .display(|v| Value::Varchar(format!("$ {}", v))),
        )
        .expect("Field without default");
        assert_eq!(*field.display(), Value::Null);
        field.set(Decimal::new(1250, 2)).expect("Decimal");
        assert_eq!(*field.display(), Value::Varchar("$ 12.50".into()));
        assert_eq!(field.get(), &Value::Decimal(Decimal::new(1250, 2)));
    }

    #[test]
    fn reference() {
        let country = Schema::builder("country")
            .field(FieldDef::int("id").primary_key())
            .field(FieldDef::text("name"))
            .build()
            .expect("Valid schema");
        let city = Schema::builder("city")
            .field(FieldDef::int("id").primary_key())
            .build()
            .expect("Valid schema");
        let mut field = Field::new(FieldDef::reference("country", country.clone()))
            .expect("Field without default");

        let error = field.set(7).expect_err("A raw key needs a lookup");
        assert_eq!(error.reason, ValidationReason::Unresolved);

        let unsaved = Record::detached(country.clone());
        let error = field.set_record(unsaved).expect_err("No key yet");
        assert_eq!(error.reason, ValidationReason::MissingKey);

        let mut other = Record::detached(city);
        other.set("id", 7).expect("Integer key");
        let error = field.set_record(other).expect_err("Different table");
        assert!(matches!(error.reason, ValidationReason::ForeignSchema { .. }));

        let mut italy = Record::detached(country.clone());
        italy.set("id", 39).expect("Integer key");
        italy.set("name", "Italy").expect("Name");
        field.set_record(italy).expect("Record of the target table");
        assert_eq!(field.get(), &Value::Int64(39));
        assert_eq!(
            field.referenced().and_then(|v| v.get("name")),
            Some(&Value::Varchar("Italy".into()))
        );

        let error = field
            .resolve(40, |schema, key| {
                assert_eq!(schema.table_name(), "country");
                assert_eq!(key, &Value::Int64(40));
                Ok(None)
            })
            .expect_err("No row matches");
        let error = error
            .downcast_ref::<ValidationError>()
            .expect("Validation error");
        assert_eq!(error.reason, ValidationReason::NotFound);
        assert_eq!(field.get(), &Value::Int64(39));

        let target = country.clone();
        field
            .resolve(44, |_, key| {
                let mut record = Record::detached(Arc::clone(&target));
                record.set("id", key.clone())?;
                Ok(Some(record))
            })
            .expect("The lookup finds the row");
        assert_eq!(field.get(), &Value::Int64(44));
        assert!(field.referenced().is_some());
    }
}
