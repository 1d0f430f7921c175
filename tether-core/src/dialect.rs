use crate::{
    Comparison, Condition, Delete, Insert, Operator, OrderTerm, Select, Update, separated_by,
};

/// Per backend printer for identifiers, bind parameters and the statements built from them.
///
/// Only `name` and `write_placeholder` are required, everything else renders ANSI SQL with
/// double quoted identifiers and can be overridden where a backend differs.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', "\"\"");
        out.push('"');
    }

    fn write_table(&self, out: &mut String, table: &str) {
        self.write_identifier(out, table);
    }

    /// Render a column name, or a parenthesized expression followed by its alias (`(COUNT(*)) total`).
    fn write_column(&self, out: &mut String, column: &str) {
        if column.starts_with('(') {
            match column.rsplit_once(' ') {
                Some((expression, alias)) if !alias.is_empty() && !alias.contains(')') => {
                    out.push_str(expression.trim_end());
                    out.push(' ');
                    self.write_identifier(out, alias);
                }
                _ => out.push_str(column),
            }
        } else {
            self.write_identifier(out, column);
        }
    }

    /// Render the reference to the named bind parameter.
    fn write_placeholder(&self, out: &mut String, name: &str);

    fn write_condition(&self, out: &mut String, condition: &Condition) {
        match &condition.comparison {
            Comparison::List(operator, params) if params.is_empty() => {
                // Nothing is in an empty list
                out.push_str(if *operator == Operator::NotIn {
                    "1 = 1"
                } else {
                    "1 = 0"
                });
                return;
            }
            _ => {}
        }
        self.write_column(out, &condition.column);
        match &condition.comparison {
            Comparison::IsNull => out.push_str(" IS NULL"),
            Comparison::IsNotNull => out.push_str(" IS NOT NULL"),
            Comparison::Binary(operator, param) => {
                out.push(' ');
                out.push_str(operator.sql());
                out.push(' ');
                self.write_placeholder(out, param);
            }
            Comparison::List(operator, params) => {
                out.push(' ');
                out.push_str(operator.sql());
                out.push_str(" (");
                separated_by(out, params, |out, v| self.write_placeholder(out, v), ", ");
                out.push(')');
            }
        }
    }

    /// Emit the WHERE clause, nothing when there are no conditions.
    fn write_where(&self, out: &mut String, conditions: &[Condition]) {
        if conditions.is_empty() {
            return;
        }
        out.push_str("\nWHERE ");
        separated_by(out, conditions, |out, v| self.write_condition(out, v), " AND ");
    }

    fn write_order_by(&self, out: &mut String, order: &[OrderTerm]) {
        if order.is_empty() {
            return;
        }
        out.push_str("\nORDER BY ");
        separated_by(
            out,
            order,
            |out, v| {
                self.write_column(out, &v.column);
                out.push_str(if v.descending { " DESC" } else { " ASC" });
            },
            ", ",
        );
    }

    fn write_select(&self, out: &mut String, select: &Select) {
        out.reserve(128 + select.columns.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("SELECT ");
        if select.distinct {
            out.push_str("DISTINCT ");
        }
        if select.columns.is_empty() {
            out.push('*');
        }
        separated_by(out, &select.columns, |out, v| self.write_column(out, v), ", ");
        out.push_str("\nFROM ");
        self.write_table(out, &select.table);
        self.write_where(out, &select.conditions);
        self.write_order_by(out, &select.order);
    }

    fn write_insert(&self, out: &mut String, insert: &Insert) {
        out.reserve(128 + insert.values.len() * 48);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("INSERT INTO ");
        self.write_table(out, &insert.table);
        if insert.values.is_empty() {
            out.push_str(" DEFAULT VALUES");
            return;
        }
        out.push_str(" (");
        separated_by(
            out,
            &insert.values,
            |out, (column, _)| self.write_identifier(out, column),
            ", ",
        );
        out.push_str(")\nVALUES (");
        separated_by(
            out,
            &insert.values,
            |out, (_, param)| self.write_placeholder(out, param),
            ", ",
        );
        out.push(')');
    }

    fn write_update(&self, out: &mut String, update: &Update) {
        out.reserve(128 + update.assignments.len() * 48);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("UPDATE ");
        self.write_table(out, &update.table);
        out.push_str("\nSET ");
        separated_by(
            out,
            &update.assignments,
            |out, (column, param)| {
                self.write_identifier(out, column);
                out.push_str(" = ");
                self.write_placeholder(out, param);
            },
            ", ",
        );
        self.write_where(out, &update.conditions);
    }

    fn write_delete(&self, out: &mut String, delete: &Delete) {
        out.reserve(128 + delete.conditions.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("DELETE FROM ");
        self.write_table(out, &delete.table);
        self.write_where(out, &delete.conditions);
    }

    /// Write the statement that fetches the key of the row just inserted on the same connection.
    ///
    /// Returns false when the backend has no such statement, the key is then recovered by
    /// querying for a row with the inserted values.
    fn write_inserted_key_query(&self, _out: &mut String, _table: &str, _primary_key: &str) -> bool {
        false
    }
}

/// Double quoted identifiers and `%(name)s` parameters (PostgreSQL, SQL Server).
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDialect;

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn write_placeholder(&self, out: &mut String, name: &str) {
        out.push_str("%(");
        out.push_str(name);
        out.push_str(")s");
    }
}

/// Unquoted names and `:name` parameters.
///
/// Aliases of `(expression) alias` projections stay unquoted too, so they fold to upper case like
/// the `ORDER BY` terms referring to them.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push_str(value);
    }

    fn write_placeholder(&self, out: &mut String, name: &str) {
        out.push(':');
        out.push_str(name);
    }
}
