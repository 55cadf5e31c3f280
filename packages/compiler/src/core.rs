//! Core Types
//!
//! Runtime-facing enums shared between the template AST, the schema and the pipeline.

use serde::{Deserialize, Serialize};

/// Sanitization category of a DOM property or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SecurityContext {
    NONE = 0,
    HTML = 1,
    STYLE = 2,
    SCRIPT = 3,
    URL = 4,
    ResourceUrl = 5,
}

/// Markers that separate sections of a flattened element attribute array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Ord, PartialOrd)]
#[repr(u8)]
pub enum AttributeMarker {
    NamespaceURI = 0,
    Classes = 1,
    Styles = 2,
    Bindings = 3,
    Template = 4,
    ProjectAs = 5,
    I18n = 6,
}

/// Bit flags passed to the `ɵɵdefer` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TDeferDetailsFlags {
    Default = 0,
    HasHydrateTriggers = 1 << 0,
}
