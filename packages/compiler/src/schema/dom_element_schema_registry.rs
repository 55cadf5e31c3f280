//! DOM Element Schema Registry
//!
//! Security contexts for standard DOM elements, backed by the security schema table.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::core::SecurityContext;
use crate::schema::dom_security_schema::security_schema;
use crate::schema::element_schema_registry::ElementSchemaRegistry;

static ATTR_TO_PROP: Lazy<IndexMap<&'static str, &'static str>> = Lazy::new(|| {
    IndexMap::from([
        ("class", "className"),
        ("for", "htmlFor"),
        ("formaction", "formAction"),
        ("innerHtml", "innerHTML"),
        ("readonly", "readOnly"),
        ("tabindex", "tabIndex"),
    ])
});

#[derive(Debug, Clone, Copy, Default)]
pub struct DomElementSchemaRegistry;

impl DomElementSchemaRegistry {
    pub fn new() -> Self {
        DomElementSchemaRegistry
    }
}

impl ElementSchemaRegistry for DomElementSchemaRegistry {
    fn security_context(&self, element_name: &str, prop_name: &str, is_attribute: bool) -> SecurityContext {
        // The mapped property name decides, never the raw attribute name.
        let prop_name = if is_attribute {
            self.get_mapped_prop_name(prop_name)
        } else {
            prop_name.to_string()
        };

        let tag = element_name.to_lowercase();
        let prop = prop_name.to_lowercase();
        let schema = security_schema();
        schema
            .get(format!("{}|{}", tag, prop).as_str())
            .or_else(|| schema.get(format!("*|{}", prop).as_str()))
            .copied()
            .unwrap_or(SecurityContext::NONE)
    }

    fn get_mapped_prop_name(&self, prop_name: &str) -> String {
        ATTR_TO_PROP
            .get(prop_name)
            .map(|p| p.to_string())
            .unwrap_or_else(|| prop_name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_specific_entries_win_over_wildcards() {
        let registry = DomElementSchemaRegistry::new();
        assert_eq!(registry.security_context("a", "href", false), SecurityContext::URL);
        assert_eq!(registry.security_context("IFRAME", "src", false), SecurityContext::ResourceUrl);
        assert_eq!(registry.security_context("div", "innerHTML", false), SecurityContext::HTML);
        assert_eq!(registry.security_context("div", "title", false), SecurityContext::NONE);
    }

    #[test]
    fn attributes_are_mapped_to_properties() {
        let registry = DomElementSchemaRegistry::new();
        assert_eq!(registry.get_mapped_prop_name("tabindex"), "tabIndex");
        assert_eq!(registry.get_mapped_prop_name("id"), "id");
        assert_eq!(registry.security_context("button", "formaction", true), SecurityContext::URL);
    }
}
