//! Port traits: the narrow contracts between the domain and the outside world.

pub mod config_port;
pub mod market_data_port;
pub mod store_port;
pub mod universe_port;
