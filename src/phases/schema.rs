//! Phase 3: Schema
//!
//! This phase decides which schema governs the root library's data values.
//!
//! | schema document | schemas enabled | result |
//! |---|---|---|
//! | absent  | no  | [`AnySchema`] |
//! | absent  | yes | schema policy error |
//! | present | no  | warning, then [`AnySchema`] |
//! | present | yes | [`DocumentSchema`] inferred from the document |
//!
//! Schema documents declared inside child libraries are ignored with a
//! warning.

use log::{info, warn};

use super::Library;
use crate::error::{Error, Result};
use crate::schema::{AnySchema, DocumentSchema, Schema};
use crate::suggestions;

/// Executes Phase 3 of the pipeline.
pub fn execute(root: &Library, schema_enabled: bool) -> Result<Box<dyn Schema>> {
    resolve(root, schema_enabled)
}

/// Pick the schema for the root library's values.
pub fn resolve(root: &Library, schema_enabled: bool) -> Result<Box<dyn Schema>> {
    for child in root.children.values() {
        warn_nested_schemas(child);
    }

    let document = root.schema_documents().into_iter().next();
    match (document, schema_enabled) {
        (None, false) => Ok(Box::new(AnySchema)),
        (None, true) => Err(Error::SchemaPolicy {
            message: "Schema feature is enabled but no schema document was provided".to_string(),
            hint: Some(suggestions::schema_document_missing_hint()),
        }),
        (Some(document), false) => {
            warn!("{}", suggestions::schema_disabled_warning(&document.source));
            Ok(Box::new(AnySchema))
        }
        (Some(document), true) => {
            info!("Using data values schema from {}", document.source);
            let schema = DocumentSchema::from_document(&document.value, document.source.clone())?;
            Ok(Box::new(schema))
        }
    }
}

fn warn_nested_schemas(library: &Library) {
    for document in library.schema_documents() {
        warn!(
            "Schema document in {} (library {}) is ignored; only the root library's schema applies",
            document.source, library.path
        );
    }
    for child in library.children.values() {
        warn_nested_schemas(child);
    }
}
