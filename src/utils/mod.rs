// Utility functions

pub mod logger;
pub mod mime;
pub mod paths;

pub use logger::*;
pub use mime::content_type_for;
pub use paths::*;
