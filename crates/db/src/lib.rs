pub mod connection;
pub mod migrations;
pub mod sink;

pub use connection::{connect, DbPool};
pub use sink::SqlForecastSink;
