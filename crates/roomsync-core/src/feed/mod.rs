//! Remote booking-calendar feed: transport and decoding.

pub mod gateway;
pub mod parser;

pub use gateway::FeedGateway;
pub use parser::{parse, FeedEntry};
