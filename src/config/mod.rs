//! Configuration
//!
//! [`Config`] is the optional file; [`Settings`] is the immutable value built
//! once from the command line and the file, then passed down by reference.

mod file;
mod settings;

pub use file::{Config, CONFIG_DIR_ENV};
pub use settings::{Settings, DEFAULT_CURL_PROGRAM};
