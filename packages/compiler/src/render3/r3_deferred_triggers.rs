//! Render3 Deferred Triggers
//!
//! Validation of the `on`/`when` triggers of a `@defer` block. Invalid triggers are
//! reported as `ParseError`s and dropped; the rest are collected per modifier with at most
//! one trigger of each kind.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::expression_parser::ast::{LiteralMap, AST};
use crate::parse_util::{ParseError, ParseSourceSpan};

use super::r3_ast::{DeferredTriggerSyntax, TriggerParameter};

/// Pattern for a timing value in a trigger
static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+\.?\d*)(ms|s)?$").expect("valid time pattern"));

/// Possible types of `on` triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnTriggerType {
    Idle,
    Timer,
    Interaction,
    Immediate,
    Hover,
    Viewport,
    Never,
}

impl OnTriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnTriggerType::Idle => "idle",
            OnTriggerType::Timer => "timer",
            OnTriggerType::Interaction => "interaction",
            OnTriggerType::Immediate => "immediate",
            OnTriggerType::Hover => "hover",
            OnTriggerType::Viewport => "viewport",
            OnTriggerType::Never => "never",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(OnTriggerType::Idle),
            "timer" => Some(OnTriggerType::Timer),
            "interaction" => Some(OnTriggerType::Interaction),
            "immediate" => Some(OnTriggerType::Immediate),
            "hover" => Some(OnTriggerType::Hover),
            "viewport" => Some(OnTriggerType::Viewport),
            "never" => Some(OnTriggerType::Never),
            _ => None,
        }
    }
}

/// A validated trigger.
#[derive(Debug, Clone)]
pub enum DeferredTrigger {
    When { value: AST },
    Idle,
    Immediate,
    Never,
    Timer { delay: usize },
    Hover { reference: Option<String> },
    Interaction { reference: Option<String> },
    Viewport {
        reference: Option<String>,
        options: Option<LiteralMap>,
    },
}

impl DeferredTrigger {
    pub fn name(&self) -> &'static str {
        match self {
            DeferredTrigger::When { .. } => "when",
            DeferredTrigger::Idle => "idle",
            DeferredTrigger::Immediate => "immediate",
            DeferredTrigger::Never => "never",
            DeferredTrigger::Timer { .. } => "timer",
            DeferredTrigger::Hover { .. } => "hover",
            DeferredTrigger::Interaction { .. } => "interaction",
            DeferredTrigger::Viewport { .. } => "viewport",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackedTrigger {
    pub trigger: DeferredTrigger,
    pub source_span: ParseSourceSpan,
}

/// The triggers of one modifier (none, `prefetch` or `hydrate`), at most one per kind.
#[derive(Debug, Clone, Default)]
pub struct DeferredBlockTriggers {
    triggers: Vec<TrackedTrigger>,
}

impl DeferredBlockTriggers {
    pub fn get(&self, name: &str) -> Option<&TrackedTrigger> {
        self.triggers.iter().find(|t| t.trigger.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    /// Triggers in the canonical instruction order: `on` kinds first, `when` last.
    pub fn in_order(&self) -> impl Iterator<Item = &TrackedTrigger> {
        const ORDER: [&str; 8] = [
            "idle",
            "immediate",
            "timer",
            "hover",
            "interaction",
            "viewport",
            "never",
            "when",
        ];
        ORDER.into_iter().filter_map(move |name| self.get(name))
    }

    fn track(&mut self, trigger: DeferredTrigger, source_span: ParseSourceSpan, errors: &mut Vec<ParseError>) {
        let name = trigger.name();
        if self.get(name).is_some() {
            errors.push(ParseError::new(
                source_span,
                format!("Duplicate \"{}\" trigger is not allowed", name),
            ));
        } else {
            self.triggers.push(TrackedTrigger { trigger, source_span });
        }
    }
}

/// Validates the triggers written for one modifier. Errors are appended to `errors`.
pub fn resolve_triggers(
    syntax: &[DeferredTriggerSyntax],
    is_hydration_trigger: bool,
    errors: &mut Vec<ParseError>,
) -> DeferredBlockTriggers {
    let mut triggers = DeferredBlockTriggers::default();
    for raw in syntax {
        match create_trigger(raw, is_hydration_trigger) {
            Ok(trigger) => triggers.track(trigger, raw.source_span.clone(), errors),
            Err(msg) => errors.push(ParseError::new(raw.source_span.clone(), msg)),
        }
    }
    triggers
}

fn create_trigger(raw: &DeferredTriggerSyntax, is_hydration_trigger: bool) -> Result<DeferredTrigger, String> {
    if raw.name == "when" {
        return match &raw.value {
            Some(AST::Interpolation(_)) | None => {
                Err("\"when\" trigger must have an expression".to_string())
            }
            Some(value) => Ok(DeferredTrigger::When { value: value.clone() }),
        };
    }

    let trigger_type = OnTriggerType::parse(&raw.name)
        .ok_or_else(|| format!("Unrecognized trigger type \"{}\"", raw.name))?;
    let parameters = &raw.parameters;

    match trigger_type {
        OnTriggerType::Idle | OnTriggerType::Immediate => {
            if !parameters.is_empty() {
                return Err(format!("\"{}\" trigger cannot have parameters", trigger_type.as_str()));
            }
            Ok(if trigger_type == OnTriggerType::Idle {
                DeferredTrigger::Idle
            } else {
                DeferredTrigger::Immediate
            })
        }
        OnTriggerType::Never => {
            if !is_hydration_trigger {
                return Err("\"never\" trigger is only supported on hydrate".to_string());
            }
            if !parameters.is_empty() {
                return Err("\"never\" trigger cannot have parameters".to_string());
            }
            Ok(DeferredTrigger::Never)
        }
        OnTriggerType::Timer => {
            if parameters.len() != 1 {
                return Err("\"timer\" trigger must have exactly one parameter".to_string());
            }
            let delay = match &parameters[0] {
                TriggerParameter::Text(text) => parse_deferred_time(text),
                TriggerParameter::Parsed(_) => None,
            };
            delay
                .map(|delay| DeferredTrigger::Timer { delay })
                .ok_or_else(|| "Could not parse time value of trigger \"timer\"".to_string())
        }
        OnTriggerType::Hover | OnTriggerType::Interaction => {
            validate_reference_trigger(trigger_type, parameters, is_hydration_trigger)?;
            let reference = parameters.first().map(reference_text).transpose()?;
            Ok(if trigger_type == OnTriggerType::Hover {
                DeferredTrigger::Hover { reference }
            } else {
                DeferredTrigger::Interaction { reference }
            })
        }
        OnTriggerType::Viewport => {
            validate_reference_trigger(trigger_type, parameters, is_hydration_trigger)?;
            create_viewport_trigger(parameters, is_hydration_trigger)
        }
    }
}

fn reference_text(parameter: &TriggerParameter) -> Result<String, String> {
    match parameter {
        TriggerParameter::Text(text) => Ok(text.trim().to_string()),
        TriggerParameter::Parsed(AST::PropertyRead(read)) if read.receiver.is_implicit_receiver() => {
            Ok(read.name.clone())
        }
        TriggerParameter::Parsed(_) => Err("Trigger reference must be an identifier".to_string()),
    }
}

fn validate_reference_trigger(
    trigger_type: OnTriggerType,
    parameters: &[TriggerParameter],
    is_hydration_trigger: bool,
) -> Result<(), String> {
    if is_hydration_trigger {
        if trigger_type == OnTriggerType::Viewport {
            if parameters.len() > 1 {
                return Err(format!(
                    "Hydration trigger \"{}\" cannot have more than one parameter",
                    trigger_type.as_str()
                ));
            }
            return Ok(());
        }
        if !parameters.is_empty() {
            return Err(format!(
                "Hydration trigger \"{}\" cannot have parameters",
                trigger_type.as_str()
            ));
        }
        return Ok(());
    }

    if parameters.len() > 1 {
        return Err(format!(
            "\"{}\" trigger can only have zero or one parameters",
            trigger_type.as_str()
        ));
    }
    Ok(())
}

fn create_viewport_trigger(
    parameters: &[TriggerParameter],
    is_hydration_trigger: bool,
) -> Result<DeferredTrigger, String> {
    let (reference, options) = match parameters.first() {
        None => (None, None),
        Some(TriggerParameter::Text(text)) if !text.trim_start().starts_with('{') => {
            (Some(text.trim().to_string()), None)
        }
        Some(TriggerParameter::Parsed(AST::LiteralMap(map))) => viewport_options(map)?,
        Some(TriggerParameter::Parsed(AST::PropertyRead(read))) if read.receiver.is_implicit_receiver() => {
            (Some(read.name.clone()), None)
        }
        Some(_) => {
            return Err(
                "Options parameter of the \"viewport\" trigger must be an object literal".to_string(),
            )
        }
    };

    if is_hydration_trigger && reference.is_some() {
        return Err("\"viewport\" hydration trigger cannot have a \"trigger\"".to_string());
    }

    if let Some(options) = &options {
        if let Some(found) = options.values.iter().find_map(find_dynamic_node) {
            return Err(format!(
                "Options of the \"viewport\" trigger must be an object literal containing only literal values, but \"{}\" was found",
                found
            ));
        }
    }

    Ok(DeferredTrigger::Viewport { reference, options })
}

/// Splits a `trigger` key off the options map; it names the reference instead.
fn viewport_options(map: &LiteralMap) -> Result<(Option<String>, Option<LiteralMap>), String> {
    if map.keys.iter().any(|k| k.key == "root") {
        return Err(
            "The \"root\" option is not supported in the options parameter of the \"viewport\" trigger"
                .to_string(),
        );
    }

    let Some(trigger_index) = map.keys.iter().position(|k| k.key == "trigger") else {
        return Ok((None, Some(map.clone())));
    };

    let reference = match &map.values[trigger_index] {
        AST::PropertyRead(read) if read.receiver.is_implicit_receiver() => read.name.clone(),
        _ => return Err("\"trigger\" option of the \"viewport\" trigger must be an identifier".to_string()),
    };

    let mut remaining = map.clone();
    remaining.keys.remove(trigger_index);
    remaining.values.remove(trigger_index);
    Ok((Some(reference), Some(remaining)))
}

/// Returns the node name of the first non-literal expression inside `ast`.
fn find_dynamic_node(ast: &AST) -> Option<&'static str> {
    match ast {
        AST::LiteralPrimitive(_) => None,
        AST::LiteralArray(arr) => arr.expressions.iter().find_map(find_dynamic_node),
        AST::LiteralMap(map) => map.values.iter().find_map(find_dynamic_node),
        AST::PropertyRead(_) => Some("PropertyRead"),
        AST::SafePropertyRead(_) => Some("SafePropertyRead"),
        AST::KeyedRead(_) => Some("KeyedRead"),
        AST::Call(_) => Some("Call"),
        AST::BindingPipe(_) => Some("BindingPipe"),
        AST::Binary(_) => Some("Binary"),
        AST::Conditional(_) => Some("Conditional"),
        _ => Some("Expression"),
    }
}

/// Parses a time expression from a deferred trigger to milliseconds.
/// Returns `None` if it cannot be parsed.
pub fn parse_deferred_time(value: &str) -> Option<usize> {
    let captures = TIME_PATTERN.captures(value.trim())?;
    let number: f64 = captures.get(1)?.as_str().parse().ok()?;
    let multiplier = match captures.get(2).map(|m| m.as_str()) {
        Some("s") => 1000.0,
        _ => 1.0,
    };
    Some((number * multiplier) as usize)
}
