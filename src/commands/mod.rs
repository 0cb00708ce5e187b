pub mod install;
pub mod prune;
pub mod remove;
pub mod status;
pub mod sync;
pub mod update;
