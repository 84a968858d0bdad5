// Pipeline Runner: executes a fixed, ordered list of named steps exactly once each.
// Reasoning is delegated to an injected InferenceEndpoint; the runner only assembles
// instructions and records outputs.

pub mod runner;
pub mod step;

pub use runner::{PipelineError, PipelineRunner};
pub use step::{find_output, PipelineStepResult, StepDefinition};
