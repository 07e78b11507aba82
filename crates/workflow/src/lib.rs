//! Generation tree model and its view pipeline.
//!
//! Backend snapshots are decoded into [`Node`]s, filtered by collapse state,
//! laid out left to right and projected into a [`TreeView`] that any renderer
//! can draw. Nothing in this crate performs I/O.
use thiserror::Error;

mod catalog;
pub use catalog::*;
mod form;
pub use form::*;
mod model;
pub use model::*;
mod wire;
pub use wire::*;
mod prompt;
pub use prompt::*;
mod visibility;
pub use visibility::*;
mod layout;
pub use layout::*;
mod viewport;
pub use viewport::*;
mod card;
pub use card::*;
mod interaction;
pub use interaction::*;
mod selection;
pub use selection::*;
mod view;
pub use view::*;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("node {node_id}: field `{field}` is not valid JSON: {source}")]
    BadJson {
        node_id: String,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("node {node_id}: field `{field}` must be a JSON object")]
    NotAnObject {
        node_id: String,
        field: &'static str,
    },
    #[error("node {node_id}: field `assets` is malformed: {source}")]
    BadAssets {
        node_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("node id {0} appears more than once")]
    DuplicateId(String),
    #[error("node with an empty id")]
    EmptyId,
}

/// Parent-count rules checked before a generation request leaves the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("{module} needs a parent node that provides input media")]
    MissingParent { module: String },
    #[error("{module} needs exactly two parent nodes, got {got}")]
    TwoParentsRequired { module: String, got: usize },
}
