//! HTTP request handlers.

pub mod health;
pub mod logs;
pub mod streams;
pub mod velocity;
pub mod warnings;

pub use health::health;
