pub mod mock;
mod people;
mod queries;
mod references;

use crate::{people::people, queries::queries, references::references};
use log::LevelFilter;
use std::{env, sync::Arc};
use tether::{ConnectionGuard, Driver, Params};

/// Backend under test together with the DDL fragments it spells differently.
pub struct Backend {
    pub driver: Arc<dyn Driver>,
    /// Column definition of an integer key generated by the database.
    pub serial_key: &'static str,
    /// Column type of binary values.
    pub blob_type: &'static str,
}

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

pub fn execute_tests(backend: &Backend) {
    people(backend);
    queries(backend);
    references(backend);
}

/// Run raw SQL through a fresh connection, panicking on failure.
pub fn execute(driver: &dyn Driver, sql: &str) {
    let mut connection = ConnectionGuard::acquire(driver)
        .unwrap_or_else(|e| panic!("Could not connect to {}: {:#}", driver.name(), e));
    connection
        .command(sql, &Params::new())
        .unwrap_or_else(|e| panic!("Failed to execute:\n{}\n{:#}", sql, e));
}

/// Drop and create again the table.
pub(crate) fn recreate(driver: &dyn Driver, table: &str, ddl: &str) {
    execute(driver, &format!("DROP TABLE IF EXISTS {}", table));
    execute(driver, ddl);
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
