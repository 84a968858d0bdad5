// Hiring workflow: the four concrete steps (profile → match → offer → confirm)
// built on top of the generic pipeline runner.

pub mod hiring;
pub mod prompts;

pub use hiring::{HiringRun, HiringWorkflow};
