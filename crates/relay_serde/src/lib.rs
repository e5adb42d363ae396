//! Document persistence for the relay-logic circuit simulator: the JSON
//! wire format (`schema`), schema <-> model translation in both
//! directions (`translate`, `save`), and the two top-level entry points
//! a host application actually calls, `load_str`/`save_to_string`.
//!
//! Mirrors `digilogic_serde`'s split (a `circuitfile` schema module plus
//! a translation layer that spawns into the `relay_core::model::Document`'s
//! `World`), minus the `bevy_app`/event-driven load path -- this crate has
//! no UI to notify, so loading is a plain function call instead of a
//! system reacting to a `LoadEvent`.

pub mod save;
pub mod schema;
pub mod translate;

pub use schema::{DocumentFile, CURRENT_VERSION};
pub use translate::{build_document, SUPPORTED_MAJOR_VERSION};

use relay_core::error::LoadError;
use relay_core::model::Document;

/// Parse and validate a document from its JSON text (section 6.1, load
/// algorithm steps 1-2 of section 10.3). No partial `Document` is ever
/// returned once any step past parsing fails.
pub fn load_str(json: &str) -> Result<Document, LoadError> {
    let file: DocumentFile = serde_json::from_str(json)?;
    build_document(file)
}

/// Serialize a document back to its JSON text (section 10.4). VNETs and
/// bridges are runtime-only and are never part of the saved form.
pub fn save_to_string(document: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&save::document_to_file(document))
}
