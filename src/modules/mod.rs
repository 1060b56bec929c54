pub mod output;
pub mod predict;
