//! Create Operations
//!
//! Ops of a view's create list, executed once when the view is instantiated.

use crate::core::{SecurityContext, TDeferDetailsFlags};
use crate::output::output_ast::Expression;
use crate::parse_util::ParseSourceSpan;
use crate::template::pipeline::ir::enums::{
    BindingKind, DeferOpModifierKind, DeferTriggerKind, Namespace, OpKind, TemplateKind,
};
use crate::template::pipeline::ir::expression::{
    transform_expression_in_place, transform_expressions_in_op, ExpressionTransform,
    TransformExpressions, VisitorContextFlag,
};
use crate::template::pipeline::ir::handle::{ConstIndex, SlotHandle, XrefId};
use crate::template::pipeline::ir::operations::{Op, OpList};
use crate::template::pipeline::ir::ops::shared::{StatementOp, VariableOp};
use crate::template::pipeline::ir::ops::update::UpdateOp;

/// Local reference on an element
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRef {
    /// User-defined name of the local ref variable
    pub name: String,
    /// Target of the local reference variable (often empty string)
    pub target: String,
}

/// Logical operation representing the start of an element (or an element with no children
/// once empty elements are collapsed).
#[derive(Debug, Clone)]
pub struct ElementStartOp {
    pub xref: XrefId,
    pub handle: SlotHandle,
    pub tag: String,
    pub namespace: Namespace,
    /// Attributes index in consts array
    pub attributes: Option<ConstIndex>,
    pub local_refs: Vec<LocalRef>,
    /// Local references index in consts array
    pub local_refs_index: Option<ConstIndex>,
    /// Set by `ngNonBindable`: bindings are disabled for everything inside the element.
    pub non_bindable: bool,
    pub start_source_span: ParseSourceSpan,
    pub whole_source_span: ParseSourceSpan,
}

/// Start of an `ng-container`.
#[derive(Debug, Clone)]
pub struct ContainerStartOp {
    pub xref: XrefId,
    pub handle: SlotHandle,
    pub attributes: Option<ConstIndex>,
    pub local_refs: Vec<LocalRef>,
    pub local_refs_index: Option<ConstIndex>,
    pub non_bindable: bool,
    pub start_source_span: ParseSourceSpan,
    pub whole_source_span: ParseSourceSpan,
}

/// Turns binding evaluation off (`DisableBindings`) or back on (`EnableBindings`) around the
/// contents of a non-bindable element.
#[derive(Debug, Clone)]
pub struct ToggleBindingsOp {
    /// The element or container marked `ngNonBindable`.
    pub xref: XrefId,
}

/// End of an element or container started earlier in the list.
#[derive(Debug, Clone)]
pub struct ElementEndOp {
    /// The `XrefId` of the element declared via `ElementStart`.
    pub xref: XrefId,
    pub source_span: Option<ParseSourceSpan>,
}

/// Declares an embedded view: an `ng-template`, a structural directive host, a block, or a
/// branch of a conditional.
#[derive(Debug, Clone)]
pub struct TemplateOp {
    /// The xref of the embedded view.
    pub xref: XrefId,
    pub handle: SlotHandle,
    pub template_kind: TemplateKind,
    pub tag: Option<String>,
    /// Suffix appended to the view function name, e.g. `Conditional` or `Defer`.
    pub fn_name_suffix: String,
    pub namespace: Namespace,
    pub attributes: Option<ConstIndex>,
    pub local_refs: Vec<LocalRef>,
    pub local_refs_index: Option<ConstIndex>,
    /// The number of declaration slots used by this template, populated by slot allocation.
    pub decls: Option<usize>,
    /// The number of binding variable slots used by this template, populated by var counting.
    pub vars: Option<usize>,
    pub start_source_span: ParseSourceSpan,
    pub whole_source_span: ParseSourceSpan,
}

/// Names of the contextual variables of an `@for` block.
#[derive(Debug, Clone, Default)]
pub struct RepeaterVarNames {
    /// Every name `$index` is visible under.
    pub dollar_index: Vec<String>,
    /// Every name `$count` is visible under.
    pub dollar_count: Vec<String>,
    /// Name of the loop item.
    pub dollar_implicit: String,
}

/// Creates the repeated view (and optional empty view) of an `@for` block.
#[derive(Debug, Clone)]
pub struct RepeaterCreateOp {
    /// The xref of the repeated view.
    pub xref: XrefId,
    pub handle: SlotHandle,
    pub empty_view: Option<XrefId>,
    /// The track expression, in terms of the loop variables.
    pub track: Box<Expression>,
    /// Reference to the function implementing `track`, set by track function optimization.
    pub track_by_fn: Option<Expression>,
    /// Whether the track function reads the component instance.
    pub uses_component_instance: bool,
    pub var_names: RepeaterVarNames,
    pub tag: Option<String>,
    pub attributes: Option<ConstIndex>,
    pub empty_tag: Option<String>,
    pub empty_attributes: Option<ConstIndex>,
    pub decls: Option<usize>,
    pub vars: Option<usize>,
    pub empty_decls: Option<usize>,
    pub empty_vars: Option<usize>,
    pub start_source_span: ParseSourceSpan,
    pub whole_source_span: ParseSourceSpan,
}

/// Logical operation representing a text node.
#[derive(Debug, Clone)]
pub struct TextOp {
    pub xref: XrefId,
    pub handle: SlotHandle,
    pub initial_value: String,
    pub source_span: Option<ParseSourceSpan>,
}

/// An event listener on an element, or on the host when `host_listener` is set.
#[derive(Debug)]
pub struct ListenerOp {
    /// The element the listener is attached to.
    pub target: XrefId,
    pub target_slot: SlotHandle,
    pub tag: Option<String>,
    pub host_listener: bool,
    /// Name of the event which is being listened to.
    pub name: String,
    /// A list of `UpdateOp`s representing the body of the event listener.
    pub handler_ops: OpList<UpdateOp>,
    /// Name of the function, assigned by the naming pass.
    pub handler_fn_name: Option<String>,
    /// Whether the handler reads `$event`.
    pub consumes_dollar_event: bool,
    /// `window`, `document` or `body` for global event targets.
    pub event_target: Option<String>,
    pub source_span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct PipeOp {
    pub xref: XrefId,
    pub handle: SlotHandle,
    pub name: String,
}

/// Switches the active namespace for the elements that follow.
#[derive(Debug, Clone)]
pub struct NamespaceOp {
    pub active: Namespace,
}

/// Declares the content projection selectors of the component template.
#[derive(Debug, Clone)]
pub struct ProjectionDefOp {
    pub def: Option<Expression>,
}

/// A content projection slot (`<ng-content>`).
#[derive(Debug, Clone)]
pub struct ProjectionOp {
    pub xref: XrefId,
    pub handle: SlotHandle,
    pub projection_slot_index: usize,
    /// The serialized static attributes of the `<ng-content>` element, filled in by const
    /// collection. Unlike elements, projections take their attributes inline.
    pub attributes: Option<Expression>,
    pub selector: String,
    /// The view rendered when nothing is projected.
    pub fallback_view: Option<XrefId>,
    pub fallback_decls: Option<usize>,
    pub fallback_vars: Option<usize>,
    pub source_span: ParseSourceSpan,
}

/// A static attribute or binding name collected into the element's consts.
#[derive(Debug, Clone)]
pub struct ExtractedAttributeOp {
    /// The element the attribute belongs to.
    pub target: XrefId,
    pub binding_kind: BindingKind,
    pub namespace: Option<String>,
    pub name: String,
    /// The value of a static attribute, `None` for names registered for directive matching.
    pub expression: Option<Expression>,
    pub security_context: SecurityContext,
}

/// Configures a `@defer` block and its secondary views.
#[derive(Debug, Clone)]
pub struct DeferOp {
    pub xref: XrefId,
    pub handle: SlotHandle,
    pub main_view: XrefId,
    pub main_slot: SlotHandle,
    pub loading_view: Option<XrefId>,
    pub loading_slot: Option<SlotHandle>,
    pub placeholder_view: Option<XrefId>,
    pub placeholder_slot: Option<SlotHandle>,
    pub error_view: Option<XrefId>,
    pub error_slot: Option<SlotHandle>,
    pub loading_minimum_time: Option<usize>,
    pub loading_after_time: Option<usize>,
    pub placeholder_minimum_time: Option<usize>,
    pub loading_config: Option<Expression>,
    pub placeholder_config: Option<Expression>,
    /// Function loading the block's dependencies, if any.
    pub resolver_fn: Option<Expression>,
    pub flags: TDeferDetailsFlags,
    pub source_span: ParseSourceSpan,
}

/// The element a trigger observes, resolved in steps.
#[derive(Debug, Clone, Default)]
pub struct DeferTriggerTarget {
    /// The local reference naming the element, if one was given.
    pub target_name: Option<String>,
    pub target_xref: Option<XrefId>,
    pub target_slot: Option<SlotHandle>,
    /// The view containing the target.
    pub target_view: Option<XrefId>,
    /// Views to walk from the defer block to the target; -1 for the placeholder view.
    pub target_slot_view_steps: Option<isize>,
}

impl DeferTriggerTarget {
    pub fn named(target_name: Option<String>) -> Self {
        DeferTriggerTarget {
            target_name,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub enum DeferTrigger {
    Idle,
    Immediate,
    Never,
    Timer { delay: usize },
    Hover(DeferTriggerTarget),
    Interaction(DeferTriggerTarget),
    Viewport {
        target: DeferTriggerTarget,
        options: Option<Expression>,
    },
}

impl DeferTrigger {
    pub fn kind(&self) -> DeferTriggerKind {
        match self {
            DeferTrigger::Idle => DeferTriggerKind::Idle,
            DeferTrigger::Immediate => DeferTriggerKind::Immediate,
            DeferTrigger::Never => DeferTriggerKind::Never,
            DeferTrigger::Timer { .. } => DeferTriggerKind::Timer,
            DeferTrigger::Hover(_) => DeferTriggerKind::Hover,
            DeferTrigger::Interaction(_) => DeferTriggerKind::Interaction,
            DeferTrigger::Viewport { .. } => DeferTriggerKind::Viewport,
        }
    }

    pub fn target(&self) -> Option<&DeferTriggerTarget> {
        match self {
            DeferTrigger::Hover(t) | DeferTrigger::Interaction(t) => Some(t),
            DeferTrigger::Viewport { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn target_mut(&mut self) -> Option<&mut DeferTriggerTarget> {
        match self {
            DeferTrigger::Hover(t) | DeferTrigger::Interaction(t) => Some(t),
            DeferTrigger::Viewport { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// An `on <trigger>` condition of a `@defer` block.
#[derive(Debug, Clone)]
pub struct DeferOnOp {
    pub defer: XrefId,
    pub trigger: DeferTrigger,
    pub modifier: DeferOpModifierKind,
    pub source_span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct I18nStartOp {
    pub xref: XrefId,
    pub handle: SlotHandle,
    /// The outermost i18n block this block is nested in (itself if root).
    pub root: XrefId,
    /// The message text, registered as a const during const collection.
    pub message: String,
    pub message_index: Option<ConstIndex>,
    pub source_span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct I18nEndOp {
    pub xref: XrefId,
    pub source_span: Option<ParseSourceSpan>,
}

/// Marks the start of an ICU inside an i18n block.
#[derive(Debug, Clone)]
pub struct IcuStartOp {
    pub xref: XrefId,
    /// The enclosing i18n block.
    pub context: XrefId,
    pub message_placeholder: String,
    pub source_span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct IcuEndOp {
    pub xref: XrefId,
}

/// Declares the slot holding a `@let` value.
#[derive(Debug, Clone)]
pub struct DeclareLetOp {
    pub xref: XrefId,
    pub handle: SlotHandle,
    pub declared_name: String,
    pub source_span: ParseSourceSpan,
}

/// All ops that can appear in a create list.
#[derive(Debug)]
pub enum CreateOp {
    Statement(StatementOp),
    Variable(VariableOp),
    ElementStart(ElementStartOp),
    Element(ElementStartOp),
    ElementEnd(ElementEndOp),
    ContainerStart(ContainerStartOp),
    Container(ContainerStartOp),
    ContainerEnd(ElementEndOp),
    Template(TemplateOp),
    ConditionalCreate(TemplateOp),
    ConditionalBranchCreate(TemplateOp),
    RepeaterCreate(RepeaterCreateOp),
    Text(TextOp),
    Listener(ListenerOp),
    TwoWayListener(ListenerOp),
    Pipe(PipeOp),
    Namespace(NamespaceOp),
    ProjectionDef(ProjectionDefOp),
    Projection(ProjectionOp),
    ExtractedAttribute(ExtractedAttributeOp),
    Defer(DeferOp),
    DeferOn(DeferOnOp),
    I18nStart(I18nStartOp),
    I18nEnd(I18nEndOp),
    IcuStart(IcuStartOp),
    IcuEnd(IcuEndOp),
    DeclareLet(DeclareLetOp),
    DisableBindings(ToggleBindingsOp),
    EnableBindings(ToggleBindingsOp),
}

impl Op for CreateOp {
    fn kind(&self) -> OpKind {
        match self {
            CreateOp::Statement(_) => OpKind::Statement,
            CreateOp::Variable(_) => OpKind::Variable,
            CreateOp::ElementStart(_) => OpKind::ElementStart,
            CreateOp::Element(_) => OpKind::Element,
            CreateOp::ElementEnd(_) => OpKind::ElementEnd,
            CreateOp::ContainerStart(_) => OpKind::ContainerStart,
            CreateOp::Container(_) => OpKind::Container,
            CreateOp::ContainerEnd(_) => OpKind::ContainerEnd,
            CreateOp::Template(_) => OpKind::Template,
            CreateOp::ConditionalCreate(_) => OpKind::ConditionalCreate,
            CreateOp::ConditionalBranchCreate(_) => OpKind::ConditionalBranchCreate,
            CreateOp::RepeaterCreate(_) => OpKind::RepeaterCreate,
            CreateOp::Text(_) => OpKind::Text,
            CreateOp::Listener(_) => OpKind::Listener,
            CreateOp::TwoWayListener(_) => OpKind::TwoWayListener,
            CreateOp::Pipe(_) => OpKind::Pipe,
            CreateOp::Namespace(_) => OpKind::Namespace,
            CreateOp::ProjectionDef(_) => OpKind::ProjectionDef,
            CreateOp::Projection(_) => OpKind::Projection,
            CreateOp::ExtractedAttribute(_) => OpKind::ExtractedAttribute,
            CreateOp::Defer(_) => OpKind::Defer,
            CreateOp::DeferOn(_) => OpKind::DeferOn,
            CreateOp::I18nStart(_) => OpKind::I18nStart,
            CreateOp::I18nEnd(_) => OpKind::I18nEnd,
            CreateOp::IcuStart(_) => OpKind::IcuStart,
            CreateOp::IcuEnd(_) => OpKind::IcuEnd,
            CreateOp::DeclareLet(_) => OpKind::DeclareLet,
            CreateOp::DisableBindings(_) => OpKind::DisableBindings,
            CreateOp::EnableBindings(_) => OpKind::EnableBindings,
        }
    }
}

impl CreateOp {
    /// The xref naming this op, for ops that declare something.
    pub fn xref(&self) -> Option<XrefId> {
        match self {
            CreateOp::Variable(op) => Some(op.xref),
            CreateOp::ElementStart(op) | CreateOp::Element(op) => Some(op.xref),
            CreateOp::ElementEnd(op) | CreateOp::ContainerEnd(op) => Some(op.xref),
            CreateOp::ContainerStart(op) | CreateOp::Container(op) => Some(op.xref),
            CreateOp::Template(op)
            | CreateOp::ConditionalCreate(op)
            | CreateOp::ConditionalBranchCreate(op) => Some(op.xref),
            CreateOp::RepeaterCreate(op) => Some(op.xref),
            CreateOp::Text(op) => Some(op.xref),
            CreateOp::Pipe(op) => Some(op.xref),
            CreateOp::Projection(op) => Some(op.xref),
            CreateOp::Defer(op) => Some(op.xref),
            CreateOp::I18nStart(op) => Some(op.xref),
            CreateOp::I18nEnd(op) => Some(op.xref),
            CreateOp::IcuStart(op) => Some(op.xref),
            CreateOp::IcuEnd(op) => Some(op.xref),
            CreateOp::DeclareLet(op) => Some(op.xref),
            CreateOp::Statement(_)
            | CreateOp::Listener(_)
            | CreateOp::TwoWayListener(_)
            | CreateOp::Namespace(_)
            | CreateOp::ProjectionDef(_)
            | CreateOp::ExtractedAttribute(_)
            | CreateOp::DeferOn(_)
            | CreateOp::DisableBindings(_)
            | CreateOp::EnableBindings(_) => None,
        }
    }

    /// The slot handle of ops that consume data slots.
    pub fn handle(&self) -> Option<&SlotHandle> {
        match self {
            CreateOp::ElementStart(op) | CreateOp::Element(op) => Some(&op.handle),
            CreateOp::ContainerStart(op) | CreateOp::Container(op) => Some(&op.handle),
            CreateOp::Template(op)
            | CreateOp::ConditionalCreate(op)
            | CreateOp::ConditionalBranchCreate(op) => Some(&op.handle),
            CreateOp::RepeaterCreate(op) => Some(&op.handle),
            CreateOp::Text(op) => Some(&op.handle),
            CreateOp::Pipe(op) => Some(&op.handle),
            CreateOp::Projection(op) => Some(&op.handle),
            CreateOp::Defer(op) => Some(&op.handle),
            CreateOp::I18nStart(op) => Some(&op.handle),
            CreateOp::DeclareLet(op) => Some(&op.handle),
            _ => None,
        }
    }

    pub fn handle_mut(&mut self) -> Option<&mut SlotHandle> {
        match self {
            CreateOp::ElementStart(op) | CreateOp::Element(op) => Some(&mut op.handle),
            CreateOp::ContainerStart(op) | CreateOp::Container(op) => Some(&mut op.handle),
            CreateOp::Template(op)
            | CreateOp::ConditionalCreate(op)
            | CreateOp::ConditionalBranchCreate(op) => Some(&mut op.handle),
            CreateOp::RepeaterCreate(op) => Some(&mut op.handle),
            CreateOp::Text(op) => Some(&mut op.handle),
            CreateOp::Pipe(op) => Some(&mut op.handle),
            CreateOp::Projection(op) => Some(&mut op.handle),
            CreateOp::Defer(op) => Some(&mut op.handle),
            CreateOp::I18nStart(op) => Some(&mut op.handle),
            CreateOp::DeclareLet(op) => Some(&mut op.handle),
            _ => None,
        }
    }

    /// The number of data slots this op occupies. Local refs take one slot each after the op's own.
    pub fn num_slots_used(&self) -> usize {
        match self {
            CreateOp::ElementStart(op) | CreateOp::Element(op) => 1 + op.local_refs.len(),
            CreateOp::ContainerStart(op) | CreateOp::Container(op) => 1 + op.local_refs.len(),
            CreateOp::Template(op)
            | CreateOp::ConditionalCreate(op)
            | CreateOp::ConditionalBranchCreate(op) => 1 + op.local_refs.len(),
            CreateOp::RepeaterCreate(op) => {
                if op.empty_view.is_some() {
                    3
                } else {
                    2
                }
            }
            CreateOp::Projection(op) => {
                if op.fallback_view.is_some() {
                    2
                } else {
                    1
                }
            }
            CreateOp::Defer(_) => 2,
            CreateOp::Text(_) | CreateOp::Pipe(_) | CreateOp::I18nStart(_) | CreateOp::DeclareLet(_) => 1,
            _ => 0,
        }
    }

    pub fn local_refs(&self) -> &[LocalRef] {
        match self {
            CreateOp::ElementStart(op) | CreateOp::Element(op) => &op.local_refs,
            CreateOp::ContainerStart(op) | CreateOp::Container(op) => &op.local_refs,
            CreateOp::Template(op)
            | CreateOp::ConditionalCreate(op)
            | CreateOp::ConditionalBranchCreate(op) => &op.local_refs,
            _ => &[],
        }
    }

    /// Element-like ops: anything that can carry attributes and be a binding target.
    pub fn is_element_or_container(&self) -> bool {
        matches!(
            self,
            CreateOp::ElementStart(_)
                | CreateOp::Element(_)
                | CreateOp::ContainerStart(_)
                | CreateOp::Container(_)
                | CreateOp::Template(_)
                | CreateOp::ConditionalCreate(_)
                | CreateOp::ConditionalBranchCreate(_)
                | CreateOp::RepeaterCreate(_)
                | CreateOp::Projection(_)
        )
    }

    pub fn as_template(&self) -> Option<&TemplateOp> {
        match self {
            CreateOp::Template(op)
            | CreateOp::ConditionalCreate(op)
            | CreateOp::ConditionalBranchCreate(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_template_mut(&mut self) -> Option<&mut TemplateOp> {
        match self {
            CreateOp::Template(op)
            | CreateOp::ConditionalCreate(op)
            | CreateOp::ConditionalBranchCreate(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_listener_mut(&mut self) -> Option<&mut ListenerOp> {
        match self {
            CreateOp::Listener(op) | CreateOp::TwoWayListener(op) => Some(op),
            _ => None,
        }
    }
}

impl TransformExpressions for CreateOp {
    fn transform_expressions(&mut self, transform: &mut ExpressionTransform<'_>, flags: VisitorContextFlag) {
        match self {
            CreateOp::Statement(op) => op.transform_expressions(transform, flags),
            CreateOp::Variable(op) => op.transform_expressions(transform, flags),
            CreateOp::Listener(op) | CreateOp::TwoWayListener(op) => {
                for inner in op.handler_ops.iter_mut() {
                    transform_expressions_in_op(
                        inner,
                        transform,
                        flags | VisitorContextFlag::IN_CHILD_OPERATION,
                    );
                }
            }
            CreateOp::RepeaterCreate(op) => {
                transform_expression_in_place(&mut op.track, transform, flags);
                if let Some(track_by_fn) = &mut op.track_by_fn {
                    transform_expression_in_place(track_by_fn, transform, flags);
                }
            }
            CreateOp::ExtractedAttribute(op) => {
                if let Some(expr) = &mut op.expression {
                    transform_expression_in_place(expr, transform, flags);
                }
            }
            CreateOp::Defer(op) => {
                for expr in [&mut op.loading_config, &mut op.placeholder_config, &mut op.resolver_fn]
                    .into_iter()
                    .flatten()
                {
                    transform_expression_in_place(expr, transform, flags);
                }
            }
            CreateOp::DeferOn(op) => {
                if let DeferTrigger::Viewport { options: Some(options), .. } = &mut op.trigger {
                    transform_expression_in_place(options, transform, flags);
                }
            }
            CreateOp::ProjectionDef(op) => {
                if let Some(def) = &mut op.def {
                    transform_expression_in_place(def, transform, flags);
                }
            }
            CreateOp::ElementStart(_)
            | CreateOp::Element(_)
            | CreateOp::ElementEnd(_)
            | CreateOp::ContainerStart(_)
            | CreateOp::Container(_)
            | CreateOp::ContainerEnd(_)
            | CreateOp::Template(_)
            | CreateOp::ConditionalCreate(_)
            | CreateOp::ConditionalBranchCreate(_)
            | CreateOp::Text(_)
            | CreateOp::Pipe(_)
            | CreateOp::Namespace(_)
            | CreateOp::Projection(_)
            | CreateOp::I18nStart(_)
            | CreateOp::I18nEnd(_)
            | CreateOp::IcuStart(_)
            | CreateOp::IcuEnd(_)
            | CreateOp::DeclareLet(_)
            | CreateOp::DisableBindings(_)
            | CreateOp::EnableBindings(_) => {}
        }
    }
}

pub fn create_element_start_op(
    tag: impl Into<String>,
    xref: XrefId,
    namespace: Namespace,
    start_source_span: ParseSourceSpan,
    whole_source_span: ParseSourceSpan,
) -> ElementStartOp {
    ElementStartOp {
        xref,
        handle: SlotHandle::new(xref),
        tag: tag.into(),
        namespace,
        attributes: None,
        local_refs: Vec::new(),
        local_refs_index: None,
        non_bindable: false,
        start_source_span,
        whole_source_span,
    }
}

pub fn create_container_start_op(
    xref: XrefId,
    start_source_span: ParseSourceSpan,
    whole_source_span: ParseSourceSpan,
) -> ContainerStartOp {
    ContainerStartOp {
        xref,
        handle: SlotHandle::new(xref),
        attributes: None,
        local_refs: Vec::new(),
        local_refs_index: None,
        non_bindable: false,
        start_source_span,
        whole_source_span,
    }
}

pub fn create_disable_bindings_op(xref: XrefId) -> CreateOp {
    CreateOp::DisableBindings(ToggleBindingsOp { xref })
}

pub fn create_enable_bindings_op(xref: XrefId) -> CreateOp {
    CreateOp::EnableBindings(ToggleBindingsOp { xref })
}

pub fn create_element_end_op(xref: XrefId, source_span: Option<ParseSourceSpan>) -> ElementEndOp {
    ElementEndOp { xref, source_span }
}

#[allow(clippy::too_many_arguments)]
pub fn create_template_op(
    xref: XrefId,
    template_kind: TemplateKind,
    tag: Option<String>,
    fn_name_suffix: impl Into<String>,
    namespace: Namespace,
    start_source_span: ParseSourceSpan,
    whole_source_span: ParseSourceSpan,
) -> TemplateOp {
    TemplateOp {
        xref,
        handle: SlotHandle::new(xref),
        template_kind,
        tag,
        fn_name_suffix: fn_name_suffix.into(),
        namespace,
        attributes: None,
        local_refs: Vec::new(),
        local_refs_index: None,
        decls: None,
        vars: None,
        start_source_span,
        whole_source_span,
    }
}

pub fn create_text_op(xref: XrefId, initial_value: impl Into<String>, source_span: Option<ParseSourceSpan>) -> CreateOp {
    CreateOp::Text(TextOp {
        xref,
        handle: SlotHandle::new(xref),
        initial_value: initial_value.into(),
        source_span,
    })
}

pub fn create_listener_op(
    target: XrefId,
    name: impl Into<String>,
    tag: Option<String>,
    handler_ops: OpList<UpdateOp>,
    host_listener: bool,
    event_target: Option<String>,
    source_span: ParseSourceSpan,
) -> ListenerOp {
    ListenerOp {
        target,
        target_slot: SlotHandle::new(target),
        tag,
        host_listener,
        name: name.into(),
        handler_ops,
        handler_fn_name: None,
        consumes_dollar_event: false,
        event_target,
        source_span,
    }
}

pub fn create_pipe_op(xref: XrefId, name: impl Into<String>) -> CreateOp {
    CreateOp::Pipe(PipeOp {
        xref,
        handle: SlotHandle::new(xref),
        name: name.into(),
    })
}

pub fn create_namespace_op(active: Namespace) -> CreateOp {
    CreateOp::Namespace(NamespaceOp { active })
}

pub fn create_projection_def_op(def: Option<Expression>) -> CreateOp {
    CreateOp::ProjectionDef(ProjectionDefOp { def })
}

pub fn create_extracted_attribute_op(
    target: XrefId,
    binding_kind: BindingKind,
    namespace: Option<String>,
    name: impl Into<String>,
    expression: Option<Expression>,
    security_context: SecurityContext,
) -> CreateOp {
    CreateOp::ExtractedAttribute(ExtractedAttributeOp {
        target,
        binding_kind,
        namespace,
        name: name.into(),
        expression,
        security_context,
    })
}

pub fn create_defer_on_op(
    defer: XrefId,
    trigger: DeferTrigger,
    modifier: DeferOpModifierKind,
    source_span: ParseSourceSpan,
) -> CreateOp {
    CreateOp::DeferOn(DeferOnOp {
        defer,
        trigger,
        modifier,
        source_span,
    })
}

pub fn create_declare_let_op(xref: XrefId, declared_name: impl Into<String>, source_span: ParseSourceSpan) -> CreateOp {
    CreateOp::DeclareLet(DeclareLetOp {
        xref,
        handle: SlotHandle::new(xref),
        declared_name: declared_name.into(),
        source_span,
    })
}
