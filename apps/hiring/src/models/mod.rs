pub mod candidate;
pub mod profile;

pub use candidate::{CandidateInput, CandidateRecord};
pub use profile::CandidateProfile;
