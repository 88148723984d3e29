//! Phase 2: Data Values
//!
//! This phase computes the data values of a single library scope by layering
//! overlays on top of each other.
//!
//! ## Process
//!
//! 1.  **Partition (`partition`)**: The scope's data values documents are
//!     split into its own layers and outbound library values (documents whose
//!     `#@library/ref` names a different library). Own layers are ordered by
//!     file declaration order, then path, then document index.
//!
//! 2.  **Layering (`resolve`)**: Starting from the initial values, every own
//!     layer is applied, then every inbound overlay (flag overlays and library
//!     values routed here from other scopes), in order.
//!
//! 3.  **Inheritance (`resolve_inherited`)**: A library scope starts from its
//!     parent's final values instead. The scope's first layer is its base and
//!     may add keys next to the inherited ones; later layers are checked
//!     against the parent's keys and the earlier layers.
//!
//! Each layer is merged with [`overlay_values`]: maps are unioned, arrays
//! and scalars are replaced. A key missing from the earlier layers is a
//! merge conflict unless the layer may add keys, either on its own or through
//! `implicit_map_key_overrides`.

use log::trace;
use serde_yaml::Value as YamlValue;

use super::Library;
use crate::config::TemplateOptions;
use crate::documents::{LibraryValues, ValuesDocument};
use crate::error::Result;
use crate::merge::yaml::{overlay_values, MergeOptions, MergeSource};

/// A scope's own layers and the documents it sends elsewhere
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub own: Vec<ValuesDocument>,
    pub outbound: Vec<LibraryValues>,
}

/// Final values of a scope
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValues {
    pub values: YamlValue,
    /// Library values declared by the scope for other libraries
    pub outbound: Vec<LibraryValues>,
}

/// Split a scope's data values documents into own layers and outbound
/// library values.
pub fn partition(library: &Library) -> Partition {
    let mut entries: Vec<_> = library
        .files
        .iter()
        .flat_map(|file| {
            file.values
                .iter()
                .map(move |entry| ((file.file.order, file.path(), entry.index), entry))
        })
        .collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut partition = Partition::default();
    for (_, entry) in entries {
        match &entry.target {
            Some(target) => partition.outbound.push(LibraryValues {
                target: target.clone(),
                origin: library.path.clone(),
                doc: entry.doc.clone(),
            }),
            None => partition.own.push(entry.doc.clone()),
        }
    }
    partition
}

/// Resolve the values of one scope.
pub fn resolve(
    library: &Library,
    initial: YamlValue,
    inbound: &[ValuesDocument],
    options: &TemplateOptions,
) -> Result<ResolvedValues> {
    resolve_layers(library, initial, false, inbound, options)
}

/// Resolve the values of a library scope on top of its parent's values.
pub fn resolve_inherited(
    library: &Library,
    inherited: YamlValue,
    inbound: &[ValuesDocument],
    options: &TemplateOptions,
) -> Result<ResolvedValues> {
    resolve_layers(library, inherited, true, inbound, options)
}

fn resolve_layers(
    library: &Library,
    initial: YamlValue,
    open_base: bool,
    inbound: &[ValuesDocument],
    options: &TemplateOptions,
) -> Result<ResolvedValues> {
    let Partition { own, outbound } = partition(library);
    let values = apply_layers(
        &library.path.to_string(),
        initial,
        open_base,
        own.iter().chain(inbound.iter()),
        options,
    )?;
    Ok(ResolvedValues { values, outbound })
}

/// Apply layers in order onto `initial`. With `open_base`, the first layer
/// may add keys.
pub fn apply_layers<'a, I>(
    library: &str,
    initial: YamlValue,
    open_base: bool,
    layers: I,
    options: &TemplateOptions,
) -> Result<YamlValue>
where
    I: IntoIterator<Item = &'a ValuesDocument>,
{
    let mut values = initial;
    for (position, layer) in layers.into_iter().enumerate() {
        trace!("library {}: applying {}", library, layer.source);
        let merge_options = MergeOptions {
            allow_new_keys: (open_base && position == 0)
                || layer.allow_new_keys
                || options.implicit_map_key_overrides,
            strict: options.strict_yaml,
        };
        let origin = MergeSource {
            library,
            source_name: &layer.source,
        };
        overlay_values(&mut values, &layer.value, merge_options, origin)?;
    }
    Ok(values)
}
