mod connection;
mod dialect;
mod driver;
mod placeholders;
mod value_holder;

pub use connection::*;
pub use dialect::*;
pub use driver::*;
pub use placeholders::*;
