pub mod headless;
pub mod style;
pub mod traits;
pub mod types;
