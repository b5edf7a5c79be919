pub mod api;
pub mod config;
pub mod errors;
pub mod files;
pub mod navigation;
pub mod path;
pub mod render;
pub mod state;
pub mod version;
