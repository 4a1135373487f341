pub mod file_loader;
pub mod settings_loader;

pub use file_loader::load_all_files;
pub use settings_loader::{load_generation_settings, resolve_generation_settings};
