//! CLI command implementations.

pub mod build;
pub mod extensions;
pub mod pages;

pub use build::build_site;
pub use extensions::list_extensions;
pub use pages::list_pages;
