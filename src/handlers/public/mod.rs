// handlers/public/mod.rs - Handlers that need no authentication

pub mod health;

pub use health::{health, ready, root};
