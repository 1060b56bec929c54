pub mod inference;

pub use inference::{InferenceOutcome, InferenceRunner};
