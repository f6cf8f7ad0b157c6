//! Collaborator traits the history core consumes.

mod directory;

pub use directory::*;
