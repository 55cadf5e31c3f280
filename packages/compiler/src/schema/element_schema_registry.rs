//! Element Schema Registry
//!
//! The schema lookups the pipeline needs while lowering bindings.

use crate::core::SecurityContext;

/// Knowledge about DOM elements consulted during ingestion.
pub trait ElementSchemaRegistry {
    /// Security context of binding `prop_name` on `element_name`. Attribute names are mapped
    /// to their property names first.
    fn security_context(&self, element_name: &str, prop_name: &str, is_attribute: bool) -> SecurityContext;

    /// The DOM property an attribute name maps to (`class` to `className` and so on).
    fn get_mapped_prop_name(&self, prop_name: &str) -> String;
}
