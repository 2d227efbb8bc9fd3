pub mod notes;
pub mod provisioning;

pub use notes::{CreateNoteRequest, NoteRules, UpdateNoteRequest, ValidationError};
pub use provisioning::Provisioner;
