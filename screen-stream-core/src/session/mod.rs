pub mod context;
pub mod manager;
