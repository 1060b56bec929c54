use rand::Rng;
use std::fmt;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 8;

/// Opaque per-request token. Both the staged input and the expected output
/// are named after it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..ID_LEN)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn input_filename(&self, extension: &str) -> String {
        format!("input_{}.{}", self.0, extension)
    }

    pub fn output_filename(&self) -> String {
        format!("output_{}.mp4", self.0)
    }

    /// Public URL the client polls for the result.
    pub fn output_url(&self) -> String {
        format!("/output/{}", self.output_filename())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
