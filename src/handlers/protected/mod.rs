// handlers/protected/mod.rs - Handlers behind the auth middleware
//
// Every route here runs after auth_middleware, which verifies the bearer
// token, provisions the user row, and injects AuthUser.

pub mod notes;
pub mod user;

pub use notes::create as notes_create;
pub use notes::delete as notes_delete;
pub use notes::list as notes_list;
pub use notes::update as notes_update;

pub use user::profile as user_profile;
