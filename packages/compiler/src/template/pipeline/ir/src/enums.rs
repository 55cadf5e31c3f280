//! IR Enums
//!
//! Discriminants shared by ops, expressions and passes.

use serde::{Deserialize, Serialize};

/// Distinguishes different kinds of IR operations.
///
/// Includes both creation and update operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Start sentinel of an `OpList`.
    ListStart,
    /// End sentinel of an `OpList`.
    ListEnd,
    /// An operation which wraps an output AST statement.
    Statement,
    /// An operation which declares and initializes a `SemanticVariable`.
    Variable,
    /// An operation to begin rendering of an element.
    ElementStart,
    /// An operation to render an element with no children.
    Element,
    /// An operation which declares an embedded view.
    Template,
    /// An operation to end rendering of an element previously started with `ElementStart`.
    ElementEnd,
    /// An operation to begin an `ng-container`.
    ContainerStart,
    /// An operation for an `ng-container` with no children.
    Container,
    /// An operation to end an `ng-container`.
    ContainerEnd,
    /// Creates the first branch view of an `@if` or `@switch` block.
    ConditionalCreate,
    /// Creates a subsequent branch view of an `@if` or `@switch` block.
    ConditionalBranchCreate,
    /// Selects which branch of a conditional is displayed.
    Conditional,
    /// An operation to render a text node.
    Text,
    /// An operation declaring an event listener for an element.
    Listener,
    /// An operation declaring the listener half of a two-way binding.
    TwoWayListener,
    /// An operation to interpolate text into a text node.
    InterpolateText,
    /// An intermediate binding op, not yet specialized into a concrete instruction.
    Binding,
    /// An operation to bind an expression to a property of an element.
    Property,
    /// An operation to bind an expression to a native DOM property (host bindings).
    DomProperty,
    /// An operation to bind the property side of a two-way binding.
    TwoWayProperty,
    /// An operation to bind an expression to a style property of an element.
    StyleProp,
    /// An operation to bind an expression to a class property of an element.
    ClassProp,
    /// An operation to bind an expression to the styles of an element.
    StyleMap,
    /// An operation to bind an expression to the classes of an element.
    ClassMap,
    /// An operation to advance the runtime's implicit slot context.
    Advance,
    /// An operation to instantiate a pipe.
    Pipe,
    /// An operation to bind an expression to an attribute of an element.
    Attribute,
    /// A static attribute collected into the element's consts.
    ExtractedAttribute,
    /// An operation that configures a `@defer` block.
    Defer,
    /// An operation that controls when a `@defer` loads.
    DeferOn,
    /// An operation that controls when a `@defer` loads, using a custom expression.
    DeferWhen,
    /// An operation to change the current namespace.
    Namespace,
    /// An operation to configure the content projection definition for the view.
    ProjectionDef,
    /// An operation to create a content projection slot.
    Projection,
    /// Creates the views of an `@for` block.
    RepeaterCreate,
    /// Updates the collection of an `@for` block.
    Repeater,
    /// Starts an i18n block.
    I18nStart,
    /// Ends an i18n block.
    I18nEnd,
    /// An expression in an i18n message.
    I18nExpression,
    /// Applies the preceding i18n expressions to their block.
    I18nApply,
    /// Marks the beginning of an ICU expression.
    IcuStart,
    /// Marks the end of an ICU expression.
    IcuEnd,
    /// Declares a `@let` slot.
    DeclareLet,
    /// Stores the current value of a `@let` declaration.
    StoreLet,
    /// Disables binding evaluation inside an `ngNonBindable` element.
    DisableBindings,
    /// Re-enables binding evaluation at the end of an `ngNonBindable` element.
    EnableBindings,
}

/// Distinguishes different kinds of `SemanticVariable`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticVariableKind {
    /// Represents the context of a particular view.
    Context,
    /// Represents an identifier declared in the lexical scope of a view.
    Identifier,
    /// Represents a saved state that can be used to restore a view in a listener handler function.
    SavedView,
    /// An alias generated by a special embedded view type (e.g. a `@for` block).
    Alias,
}

bitflags::bitflags! {
    /// Flags which can be attached to a `VariableOp`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VariableFlags: u8 {
        const NONE = 0b0000;
        /// Always inline this variable, regardless of the number of times it's used.
        const ALWAYS_INLINE = 0b0001;
    }
}

/// Whether to compile in compatibility mode. In compatibility mode, the template pipeline
/// will attempt to match the output of the legacy template definition builder as closely
/// as possible, at the cost of producing quirkier (and larger) code in some cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompatibilityMode {
    Full,
    TemplateDefinitionBuilder,
}

/// Enumeration of the types of attributes which can be applied to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// Static attributes.
    Attribute,
    /// Class bindings.
    ClassName,
    /// Style bindings.
    StyleProperty,
    /// Dynamic property bindings.
    Property,
    /// Property or attribute bindings on a template.
    Template,
    /// Internationalized attributes.
    I18n,
    /// Animation property bindings.
    Animation,
    /// Property side of a two-way binding.
    TwoWayProperty,
}

/// The kind of an embedded view created by a `Template` op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    NgTemplate,
    Structural,
    Block,
}

/// The namespace of an element, set by `ɵɵnamespace*` instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    HTML,
    SVG,
    Math,
}

/// The type of a `@defer` trigger, for use in the ir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferTriggerKind {
    Idle,
    Immediate,
    Timer,
    Hover,
    Interaction,
    Viewport,
    Never,
}

impl DeferTriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeferTriggerKind::Idle => "idle",
            DeferTriggerKind::Immediate => "immediate",
            DeferTriggerKind::Timer => "timer",
            DeferTriggerKind::Hover => "hover",
            DeferTriggerKind::Interaction => "interaction",
            DeferTriggerKind::Viewport => "viewport",
            DeferTriggerKind::Never => "never",
        }
    }

    /// Triggers that observe an element and therefore need a resolved target.
    pub fn has_target(&self) -> bool {
        matches!(
            self,
            DeferTriggerKind::Hover | DeferTriggerKind::Interaction | DeferTriggerKind::Viewport
        )
    }
}

/// Modifier of a `@defer` trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferOpModifierKind {
    None,
    Prefetch,
    Hydrate,
}

/// Repeater variables derived from `$index` and `$count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedRepeaterVarIdentity {
    First,
    Last,
    Even,
    Odd,
}

/// Kinds of compilation jobs, and the jobs a pass applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilationJobKind {
    Tmpl,
    Host,
    Both,
}
