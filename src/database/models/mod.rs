pub mod note;
pub mod user;

pub use note::{NewNote, Note, NoteChanges};
pub use user::{UpsertUser, User, UserProfile};
