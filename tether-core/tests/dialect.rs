#[cfg(test)]
mod tests {
    use indoc::indoc;
    use tether_core::{
        Comparison, Condition, Delete, Dialect, GenericDialect, Insert, Operator, OracleDialect,
        OrderTerm, Select, Update,
    };

    fn select() -> Select {
        Select {
            table: "person".into(),
            columns: vec!["id".into(), "name".into(), "(COUNT(*)) total".into()],
            distinct: false,
            conditions: vec![
                Condition {
                    column: "age".into(),
                    comparison: Comparison::Binary(Operator::Gte, "age__gte".into()),
                },
                Condition {
                    column: "nickname".into(),
                    comparison: Comparison::IsNull,
                },
                Condition {
                    column: "city".into(),
                    comparison: Comparison::List(
                        Operator::In,
                        vec!["city__in_0".into(), "city__in_1".into()],
                    ),
                },
            ],
            order: vec![OrderTerm::parse("-age"), OrderTerm::parse("name")],
        }
    }

    #[test]
    fn generic_select() {
        let mut out = String::new();
        GenericDialect.write_select(&mut out, &select());
        assert_eq!(
            out,
            indoc! {r#"
                SELECT "id", "name", (COUNT(*)) "total"
                FROM "person"
                WHERE "age" >= %(age__gte)s AND "nickname" IS NULL AND "city" IN (%(city__in_0)s, %(city__in_1)s)
                ORDER BY "age" DESC, "name" ASC
            "#}
            .trim()
        );
    }

    #[test]
    fn oracle_select() {
        let mut out = String::new();
        OracleDialect.write_select(&mut out, &select());
        assert_eq!(
            out,
            indoc! {"
                SELECT id, name, (COUNT(*)) total
                FROM person
                WHERE age >= :age__gte AND nickname IS NULL AND city IN (:city__in_0, :city__in_1)
                ORDER BY age DESC, name ASC
            "}
            .trim()
        );
    }

    #[test]
    fn select_without_conditions() {
        let mut out = String::new();
        GenericDialect.write_select(
            &mut out,
            &Select {
                table: "my \"odd\" table".into(),
                columns: vec!["a".into()],
                distinct: true,
                ..Default::default()
            },
        );
        assert_eq!(
            out,
            indoc! {r#"
                SELECT DISTINCT "a"
                FROM "my ""odd"" table"
            "#}
            .trim()
        );
    }

    #[test]
    fn empty_lists() {
        let mut out = String::new();
        GenericDialect.write_delete(
            &mut out,
            &Delete {
                table: "person".into(),
                conditions: vec![
                    Condition {
                        column: "id".into(),
                        comparison: Comparison::List(Operator::In, vec![]),
                    },
                    Condition {
                        column: "id".into(),
                        comparison: Comparison::List(Operator::NotIn, vec![]),
                    },
                ],
            },
        );
        assert_eq!(
            out,
            indoc! {r#"
                DELETE FROM "person"
                WHERE 1 = 0 AND 1 = 1
            "#}
            .trim()
        );
    }

    #[test]
    fn insert_update_delete() {
        let mut out = String::new();
        GenericDialect.write_insert(
            &mut out,
            &Insert {
                table: "person".into(),
                values: vec![
                    ("name".into(), "name".into()),
                    ("age".into(), "age".into()),
                ],
            },
        );
        assert_eq!(
            out,
            indoc! {r#"
                INSERT INTO "person" ("name", "age")
                VALUES (%(name)s, %(age)s)
            "#}
            .trim()
        );

        let mut out = String::new();
        OracleDialect.write_update(
            &mut out,
            &Update {
                table: "person".into(),
                assignments: vec![("name".into(), "name".into())],
                conditions: vec![
                    Condition {
                        column: "id".into(),
                        comparison: Comparison::Binary(Operator::Eq, "old__id".into()),
                    },
                    Condition {
                        column: "nickname".into(),
                        comparison: Comparison::IsNull,
                    },
                ],
            },
        );
        assert_eq!(
            out,
            indoc! {"
                UPDATE person
                SET name = :name
                WHERE id = :old__id AND nickname IS NULL
            "}
            .trim()
        );

        let mut out = String::new();
        GenericDialect.write_insert(
            &mut out,
            &Insert {
                table: "counter".into(),
                values: vec![],
            },
        );
        assert_eq!(out, r#"INSERT INTO "counter" DEFAULT VALUES"#);
    }

    #[test]
    fn oracle_alias_matches_order_by() {
        let mut out = String::new();
        OracleDialect.write_select(
            &mut out,
            &Select {
                table: "person".into(),
                columns: vec!["city".into(), "(COUNT(*)) total".into()],
                order: vec![OrderTerm::parse("-total")],
                ..Default::default()
            },
        );
        assert_eq!(
            out,
            indoc! {"
                SELECT city, (COUNT(*)) total
                FROM person
                ORDER BY total DESC
            "}
            .trim()
        );
    }

    #[test]
    fn inserted_key() {
        let mut out = String::new();
        assert!(!GenericDialect.write_inserted_key_query(&mut out, "person", "id"));
        assert!(out.is_empty());
        assert_eq!(GenericDialect.name(), "generic");
        assert_eq!(OracleDialect.name(), "oracle");
    }
}
