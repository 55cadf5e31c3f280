//! Selector Parsing
//!
//! Parses `<ng-content select="...">` selectors and converts them into the flat array form the
//! runtime's projection matching consumes.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::output::output_ast::{self as o, Expression};

static SELECTOR_REGEXP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\:not\()|(([\.\#]?)[-\w]+)|(?:\[([-.\w*\\$]+)(?:=(?:"([^"]*)"|'([^']*)'|([^\]]*)))?\])|(\))|(\s*,\s*)"#)
        .unwrap()
});

/// Match groups in the selector regex
#[derive(Debug, Clone, Copy)]
enum SelectorRegexp {
    Not = 1,
    Tag = 2,
    Prefix = 3,
    Attribute = 4,
    AttributeValueDouble = 5,
    AttributeValueSingle = 6,
    AttributeValueUnquoted = 7,
    NotEnd = 8,
    Separator = 9,
}

/// Flags marking the kind of the entries that follow in a runtime selector array.
pub mod selector_flags {
    pub const NOT: u32 = 0b0001;
    pub const ATTRIBUTE: u32 = 0b0010;
    pub const ELEMENT: u32 = 0b0100;
    pub const CLASS: u32 = 0b1000;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CssSelector {
    pub element: Option<String>,
    pub class_names: Vec<String>,
    /// Attributes stored in pairs: [name, value, name, value, ...]
    pub attrs: Vec<String>,
    pub not_selectors: Vec<CssSelector>,
}

impl CssSelector {
    pub fn new() -> Self {
        CssSelector::default()
    }

    /// Parse CSS selector string into CssSelector objects
    pub fn parse(selector: &str) -> Result<Vec<CssSelector>, String> {
        let mut results = Vec::new();
        let mut css_selector = CssSelector::new();
        let mut in_not = false;

        for cap in SELECTOR_REGEXP.captures_iter(selector) {
            if cap.get(SelectorRegexp::Not as usize).is_some() {
                if in_not {
                    return Err("Nesting :not in a selector is not allowed".to_string());
                }
                in_not = true;
                css_selector.not_selectors.push(CssSelector::new());
            }

            let current = if in_not {
                match css_selector.not_selectors.last_mut() {
                    Some(not_selector) => not_selector,
                    None => return Err(format!("Unbalanced :not in selector \"{}\"", selector)),
                }
            } else {
                &mut css_selector
            };

            if let Some(tag_match) = cap.get(SelectorRegexp::Tag as usize) {
                let tag = tag_match.as_str();
                match cap.get(SelectorRegexp::Prefix as usize).map(|m| m.as_str()) {
                    Some("#") => current.add_attribute("id", &tag[1..]),
                    Some(".") => current.add_class_name(&tag[1..]),
                    _ => current.set_element(tag),
                }
            }

            if let Some(attr_match) = cap.get(SelectorRegexp::Attribute as usize) {
                let value = [
                    SelectorRegexp::AttributeValueDouble,
                    SelectorRegexp::AttributeValueSingle,
                    SelectorRegexp::AttributeValueUnquoted,
                ]
                .iter()
                .find_map(|group| cap.get(*group as usize))
                .map_or("", |m| m.as_str());
                current.add_attribute(&unescape_attribute(attr_match.as_str())?, value);
            }

            if cap.get(SelectorRegexp::NotEnd as usize).is_some() {
                in_not = false;
            }

            if cap.get(SelectorRegexp::Separator as usize).is_some() {
                if in_not {
                    return Err("Multiple selectors in :not are not supported".to_string());
                }
                add_result(&mut results, std::mem::take(&mut css_selector));
            }
        }

        add_result(&mut results, css_selector);
        Ok(results)
    }

    pub fn set_element(&mut self, element: &str) {
        self.element = Some(element.to_string());
    }

    pub fn add_attribute(&mut self, name: &str, value: &str) {
        self.attrs.push(name.to_string());
        self.attrs.push(value.to_lowercase());
    }

    pub fn add_class_name(&mut self, name: &str) {
        self.class_names.push(name.to_lowercase());
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .chunks(2)
            .find(|pair| pair[0] == name)
            .and_then(|pair| pair.get(1))
            .map(String::as_str)
    }
}

fn add_result(results: &mut Vec<CssSelector>, mut css_sel: CssSelector) {
    if !css_sel.not_selectors.is_empty()
        && css_sel.element.is_none()
        && css_sel.class_names.is_empty()
        && css_sel.attrs.is_empty()
    {
        css_sel.element = Some("*".to_string());
    }
    results.push(css_sel);
}

/// Unescape \$ sequences from CSS attribute selector
fn unescape_attribute(attr: &str) -> Result<String, String> {
    let mut result = String::new();
    let mut escaping = false;

    for ch in attr.chars() {
        if ch == '\\' {
            escaping = true;
            continue;
        }
        if ch == '$' && !escaping {
            return Err(format!(
                "Error in attribute selector \"{}\". Unescaped \"$\" is not supported. Please escape with \"\\$\".",
                attr
            ));
        }
        escaping = false;
        result.push(ch);
    }

    Ok(result)
}

/// One entry of a runtime selector array.
#[derive(Debug, Clone, PartialEq)]
pub enum R3SelectorPart {
    Text(String),
    Flags(u32),
}

impl R3SelectorPart {
    fn to_expression(&self) -> Expression {
        match self {
            R3SelectorPart::Text(text) => o::literal(text.as_str()),
            R3SelectorPart::Flags(flags) => o::literal(*flags as usize),
        }
    }
}

fn texts(values: &[String]) -> impl Iterator<Item = R3SelectorPart> + '_ {
    values.iter().cloned().map(R3SelectorPart::Text)
}

fn class_parts(selector: &CssSelector) -> Vec<R3SelectorPart> {
    if selector.class_names.is_empty() {
        return Vec::new();
    }
    std::iter::once(R3SelectorPart::Flags(selector_flags::CLASS))
        .chain(texts(&selector.class_names))
        .collect()
}

fn simple_selector(selector: &CssSelector) -> Vec<R3SelectorPart> {
    let element = match selector.element.as_deref() {
        Some(element) if element != "*" => element.to_string(),
        _ => String::new(),
    };
    std::iter::once(R3SelectorPart::Text(element))
        .chain(texts(&selector.attrs))
        .chain(class_parts(selector))
        .collect()
}

fn negative_selector(selector: &CssSelector) -> Vec<R3SelectorPart> {
    if let Some(element) = &selector.element {
        return [
            R3SelectorPart::Flags(selector_flags::NOT | selector_flags::ELEMENT),
            R3SelectorPart::Text(element.clone()),
        ]
        .into_iter()
        .chain(texts(&selector.attrs))
        .chain(class_parts(selector))
        .collect();
    }
    if !selector.attrs.is_empty() {
        return std::iter::once(R3SelectorPart::Flags(selector_flags::NOT | selector_flags::ATTRIBUTE))
            .chain(texts(&selector.attrs))
            .chain(class_parts(selector))
            .collect();
    }
    if selector.class_names.is_empty() {
        return Vec::new();
    }
    std::iter::once(R3SelectorPart::Flags(selector_flags::NOT | selector_flags::CLASS))
        .chain(texts(&selector.class_names))
        .collect()
}

/// The runtime form of each comma-separated selector: the positive part followed by every
/// `:not()` part.
pub fn parse_selector_to_r3_selector(selector: &str) -> Result<Vec<Vec<R3SelectorPart>>, String> {
    if selector.is_empty() {
        return Ok(Vec::new());
    }
    Ok(CssSelector::parse(selector)?
        .iter()
        .map(|parsed| {
            let mut parts = simple_selector(parsed);
            for not_selector in &parsed.not_selectors {
                parts.extend(negative_selector(not_selector));
            }
            parts
        })
        .collect())
}

/// `[[..selector 1..], [..selector 2..]]` as an output literal.
pub fn r3_selector_literal(selectors: &[Vec<R3SelectorPart>]) -> Expression {
    o::literal_arr(
        selectors
            .iter()
            .map(|parts| o::literal_arr(parts.iter().map(R3SelectorPart::to_expression).collect()))
            .collect(),
    )
}
