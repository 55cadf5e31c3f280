//! DOM Security Schema
//!
//! Properties whose bound values must be sanitized, keyed `tag|property` with `*` for
//! every tag. Changes to this table need a security review.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::core::SecurityContext;

const HTML_PROPS: &[&str] = &["iframe|srcdoc", "*|innerhtml", "*|outerhtml"];

const STYLE_PROPS: &[&str] = &["*|style"];

const URL_PROPS: &[&str] = &[
    "*|formaction",
    "area|href",
    "area|ping",
    "audio|src",
    "a|href",
    "a|ping",
    "blockquote|cite",
    "body|background",
    "del|cite",
    "form|action",
    "img|src",
    "input|src",
    "ins|cite",
    "q|cite",
    "source|src",
    "track|src",
    "video|poster",
    "video|src",
];

const RESOURCE_URL_PROPS: &[&str] = &[
    "applet|code",
    "applet|codebase",
    "base|href",
    "embed|src",
    "frame|src",
    "head|profile",
    "html|manifest",
    "iframe|src",
    "link|href",
    "media|src",
    "object|codebase",
    "object|data",
    "script|src",
];

// No SCRIPT entries: script content is stripped before it reaches a binding.
static SECURITY_SCHEMA: Lazy<HashMap<&'static str, SecurityContext>> = Lazy::new(|| {
    [
        (SecurityContext::HTML, HTML_PROPS),
        (SecurityContext::STYLE, STYLE_PROPS),
        (SecurityContext::URL, URL_PROPS),
        (SecurityContext::ResourceUrl, RESOURCE_URL_PROPS),
    ]
    .into_iter()
    .flat_map(|(ctx, specs)| specs.iter().map(move |spec| (*spec, ctx)))
    .collect()
});

/// Attributes of an `<iframe>` that may only be set statically.
static IFRAME_SECURITY_SENSITIVE_ATTRS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["sandbox", "allow", "allowfullscreen", "referrerpolicy", "csp", "fetchpriority"]
        .into_iter()
        .collect()
});

pub fn security_schema() -> &'static HashMap<&'static str, SecurityContext> {
    &SECURITY_SCHEMA
}

/// Whether binding `attr_name` on an `<iframe>` needs runtime validation.
pub fn is_iframe_security_sensitive_attr(attr_name: &str) -> bool {
    IFRAME_SECURITY_SENSITIVE_ATTRS.contains(attr_name.to_lowercase().as_str())
}
