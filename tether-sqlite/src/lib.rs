mod connection;
mod dialect;
mod driver;
mod extract;

pub use connection::*;
pub use dialect::*;
pub use driver::*;
