pub mod loader;
pub mod map;
pub mod scale;
pub mod types;
