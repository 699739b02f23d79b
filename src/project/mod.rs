//! Workspace layer: locating the files a document depends on.

pub mod schema_locator;

pub use schema_locator::{SchemaLocation, SchemaLocator, SchemaOrigin, schema_files_in};
