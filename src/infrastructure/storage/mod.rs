pub mod local;

pub use local::{StagedFile, StorageLayout};
