//! Clients for the services the watcher talks to: the video catalog and the
//! page-side transport that hands over request configuration.

pub mod catalog;
pub mod traits;

pub use catalog::{CatalogClient, CatalogError};
pub use traits::{
    AncestorTitle, AiringDate, CatalogService, CatalogTitle, ContentType, PageConfiguration,
    Runtime, Transport, TransportError,
};
