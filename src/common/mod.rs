pub mod error;
pub mod job_id;
pub mod response;
pub mod upload;
