use tether_core::Dialect;

/// Double quoted identifiers, `:name` parameters and `rowid` based key retrieval.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write_placeholder(&self, out: &mut String, name: &str) {
        out.push(':');
        out.push_str(name);
    }

    fn write_inserted_key_query(&self, out: &mut String, table: &str, primary_key: &str) -> bool {
        out.push_str("SELECT ");
        self.write_identifier(out, primary_key);
        out.push_str("\nFROM ");
        self.write_table(out, table);
        out.push_str("\nWHERE rowid = last_insert_rowid()");
        true
    }
}
