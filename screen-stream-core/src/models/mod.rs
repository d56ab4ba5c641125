pub mod audio_models;
pub mod authorization;
pub mod config;
pub mod error;
pub mod state;
pub mod status;
