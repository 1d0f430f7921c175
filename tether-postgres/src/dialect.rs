use tether_core::{Dialect, GenericDialect};

/// The generic dialect, plus retrieval of the key generated by a serial column.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn write_placeholder(&self, out: &mut String, name: &str) {
        GenericDialect.write_placeholder(out, name);
    }

    fn write_inserted_key_query(&self, out: &mut String, table: &str, primary_key: &str) -> bool {
        let mut quoted = String::new();
        self.write_table(&mut quoted, table);
        out.push_str("SELECT currval(pg_get_serial_sequence('");
        self.write_escaped(out, &quoted, '\'', "''");
        out.push_str("', '");
        self.write_escaped(out, primary_key, '\'', "''");
        out.push_str("'))");
        true
    }
}
