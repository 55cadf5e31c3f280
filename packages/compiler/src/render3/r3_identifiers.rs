//! Render3 Identifiers
//!
//! Runtime symbols referenced by generated instruction programs.

use crate::output::output_ast::ExternalReference;

const CORE: &str = "@angular/core";

macro_rules! instructions {
    ($($(#[$meta:meta])* $fn_name:ident => $symbol:literal,)*) => {
        impl Identifiers {
            $(
                $(#[$meta])*
                pub fn $fn_name() -> ExternalReference {
                    Self::make_ref($symbol)
                }
            )*
        }
    };
}

/// Runtime identifiers used in generated code.
pub struct Identifiers;

impl Identifiers {
    fn make_ref(name: &str) -> ExternalReference {
        ExternalReference {
            module_name: Some(CORE.to_string()),
            name: Some(name.to_string()),
        }
    }

    /// `base` for arity 0, `base{arity}` otherwise.
    fn numbered(base: &str, arity: usize) -> ExternalReference {
        if arity == 0 {
            Self::make_ref(base)
        } else {
            Self::make_ref(&format!("{}{}", base, arity))
        }
    }

    pub fn text_interpolate_n(arity: usize) -> ExternalReference {
        Self::numbered("ɵɵtextInterpolate", arity)
    }

    pub fn property_interpolate_n(arity: usize) -> ExternalReference {
        Self::numbered("ɵɵpropertyInterpolate", arity)
    }

    pub fn attribute_interpolate_n(arity: usize) -> ExternalReference {
        Self::numbered("ɵɵattributeInterpolate", arity)
    }

    pub fn style_prop_interpolate_n(arity: usize) -> ExternalReference {
        Self::numbered("ɵɵstylePropInterpolate", arity)
    }

    pub fn style_map_interpolate_n(arity: usize) -> ExternalReference {
        Self::numbered("ɵɵstyleMapInterpolate", arity)
    }

    pub fn class_map_interpolate_n(arity: usize) -> ExternalReference {
        Self::numbered("ɵɵclassMapInterpolate", arity)
    }

    pub fn pure_function_n(arity: usize) -> ExternalReference {
        Self::make_ref(&format!("ɵɵpureFunction{}", arity))
    }

    pub fn pipe_bind_n(arity: usize) -> ExternalReference {
        Self::make_ref(&format!("ɵɵpipeBind{}", arity))
    }

    /// `ɵɵdeferOn*`, `ɵɵdeferPrefetchOn*` or `ɵɵdeferHydrateOn*` for a trigger name such as
    /// `Idle` or `Viewport`.
    pub fn defer_on(modifier_prefix: &str, trigger: &str) -> ExternalReference {
        Self::make_ref(&format!("ɵɵdefer{}On{}", modifier_prefix, trigger))
    }
}

instructions! {
    namespace_html => "ɵɵnamespaceHTML",
    namespace_math_ml => "ɵɵnamespaceMathML",
    namespace_svg => "ɵɵnamespaceSVG",

    disable_bindings => "ɵɵdisableBindings",
    enable_bindings => "ɵɵenableBindings",

    element => "ɵɵelement",
    element_start => "ɵɵelementStart",
    element_end => "ɵɵelementEnd",
    element_container => "ɵɵelementContainer",
    element_container_start => "ɵɵelementContainerStart",
    element_container_end => "ɵɵelementContainerEnd",

    /// DOM-only element instructions, used when no directives can match.
    dom_element => "ɵɵdomElement",
    dom_element_start => "ɵɵdomElementStart",
    dom_element_end => "ɵɵdomElementEnd",
    dom_element_container => "ɵɵdomElementContainer",
    dom_element_container_start => "ɵɵdomElementContainerStart",
    dom_element_container_end => "ɵɵdomElementContainerEnd",
    dom_template => "ɵɵdomTemplate",
    dom_listener => "ɵɵdomListener",
    dom_property => "ɵɵdomProperty",

    template_create => "ɵɵtemplate",
    template_ref_extractor => "ɵɵtemplateRefExtractor",
    conditional_create => "ɵɵconditionalCreate",
    conditional_branch_create => "ɵɵconditionalBranchCreate",
    conditional => "ɵɵconditional",

    text => "ɵɵtext",
    text_interpolate_v => "ɵɵtextInterpolateV",

    listener => "ɵɵlistener",
    two_way_listener => "ɵɵtwoWayListener",
    two_way_property => "ɵɵtwoWayProperty",
    two_way_binding_set => "ɵɵtwoWayBindingSet",
    resolve_window => "ɵɵresolveWindow",
    resolve_document => "ɵɵresolveDocument",
    resolve_body => "ɵɵresolveBody",

    property => "ɵɵproperty",
    property_interpolate_v => "ɵɵpropertyInterpolateV",
    attribute => "ɵɵattribute",
    attribute_interpolate_v => "ɵɵattributeInterpolateV",
    style_prop => "ɵɵstyleProp",
    style_prop_interpolate_v => "ɵɵstylePropInterpolateV",
    class_prop => "ɵɵclassProp",
    style_map => "ɵɵstyleMap",
    style_map_interpolate_v => "ɵɵstyleMapInterpolateV",
    class_map => "ɵɵclassMap",
    class_map_interpolate_v => "ɵɵclassMapInterpolateV",

    advance => "ɵɵadvance",

    pipe => "ɵɵpipe",
    pipe_bind_v => "ɵɵpipeBindV",
    pure_function_v => "ɵɵpureFunctionV",

    next_context => "ɵɵnextContext",
    reference => "ɵɵreference",
    get_current_view => "ɵɵgetCurrentView",
    restore_view => "ɵɵrestoreView",
    reset_view => "ɵɵresetView",

    declare_let => "ɵɵdeclareLet",
    store_let => "ɵɵstoreLet",
    read_context_let => "ɵɵreadContextLet",

    projection_def => "ɵɵprojectionDef",
    projection => "ɵɵprojection",

    defer => "ɵɵdefer",
    defer_when => "ɵɵdeferWhen",
    defer_prefetch_when => "ɵɵdeferPrefetchWhen",
    defer_hydrate_when => "ɵɵdeferHydrateWhen",
    defer_hydrate_never => "ɵɵdeferHydrateNever",
    defer_enable_timer_scheduling => "ɵɵdeferEnableTimerScheduling",

    repeater_create => "ɵɵrepeaterCreate",
    repeater => "ɵɵrepeater",
    repeater_track_by_index => "ɵɵrepeaterTrackByIndex",
    repeater_track_by_identity => "ɵɵrepeaterTrackByIdentity",
    component_instance => "ɵɵcomponentInstance",

    i18n_start => "ɵɵi18nStart",
    i18n_end => "ɵɵi18nEnd",
    i18n_exp => "ɵɵi18nExp",
    i18n_apply => "ɵɵi18nApply",

    sanitize_html => "ɵɵsanitizeHtml",
    sanitize_style => "ɵɵsanitizeStyle",
    sanitize_resource_url => "ɵɵsanitizeResourceUrl",
    sanitize_script => "ɵɵsanitizeScript",
    sanitize_url => "ɵɵsanitizeUrl",
    sanitize_url_or_resource_url => "ɵɵsanitizeUrlOrResourceUrl",
    validate_iframe_attribute => "ɵɵvalidateIframeAttribute",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_families_omit_zero_suffix() {
        assert_eq!(
            Identifiers::text_interpolate_n(0).name.as_deref(),
            Some("ɵɵtextInterpolate")
        );
        assert_eq!(
            Identifiers::text_interpolate_n(3).name.as_deref(),
            Some("ɵɵtextInterpolate3")
        );
        assert_eq!(
            Identifiers::pure_function_n(0).name.as_deref(),
            Some("ɵɵpureFunction0")
        );
    }

    #[test]
    fn defer_triggers_compose_modifier_and_kind() {
        assert_eq!(
            Identifiers::defer_on("Prefetch", "Viewport").name.as_deref(),
            Some("ɵɵdeferPrefetchOnViewport")
        );
        assert_eq!(Identifiers::defer_on("", "Idle").name.as_deref(), Some("ɵɵdeferOnIdle"));
    }
}
