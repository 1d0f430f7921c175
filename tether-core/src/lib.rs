mod connection;
mod dialect;
mod error;
mod field;
mod filter;
mod model;
mod query;
mod record;
mod row;
mod schema;
mod statement;
mod util;
mod value;

pub use ::anyhow::Context;
pub use connection::*;
pub use dialect::*;
pub use error::*;
pub use field::*;
pub use filter::*;
pub use model::*;
pub use query::*;
pub use record::*;
pub use row::*;
pub use schema::*;
pub use statement::*;
pub use util::*;
pub use value::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
