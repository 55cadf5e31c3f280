//! Schema Module
//!
//! Element schemas and the security contexts of DOM properties and attributes.

pub mod dom_element_schema_registry;
pub mod dom_security_schema;
pub mod element_schema_registry;

pub use dom_element_schema_registry::DomElementSchemaRegistry;
pub use dom_security_schema::is_iframe_security_sensitive_attr;
pub use element_schema_registry::ElementSchemaRegistry;
