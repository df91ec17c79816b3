//! Remote tools: the catalog of available tools and their execution.

pub mod catalog;
pub mod executor;

pub use catalog::{
    CatalogEntry, CatalogListing, ServerStatus, ToolCatalog, ToolSpec, empty_object_schema,
    selection_key,
};
pub use executor::{DEFAULT_TOOL_FAILURE, HttpToolExecutor, ToolExecutor};
