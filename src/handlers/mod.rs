// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) -> Protected (bearer token + provisioned user)
pub mod protected;
pub mod public;
