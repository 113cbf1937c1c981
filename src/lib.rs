pub mod config;
pub mod pipeline;
pub mod project;
pub mod raw;
pub mod schema;
pub mod store;
pub mod validate;
