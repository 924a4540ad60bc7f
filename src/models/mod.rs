pub mod api;
pub mod batch;
pub mod payload;
