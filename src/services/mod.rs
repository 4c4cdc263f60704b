//! Remote and system collaborators used by the command interpreter

pub mod browser;
pub mod image;
pub mod lookup;

pub use browser::{Browser, SystemBrowser};
pub use image::{ImageConfig, ImageGenerator, StabilityImageGenerator};
pub use lookup::{Lookup, LookupConfig, WikipediaLookup};
