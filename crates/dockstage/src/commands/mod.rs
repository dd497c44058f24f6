pub mod build;
pub mod flags;
pub mod push;
pub mod stage;
