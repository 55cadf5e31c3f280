//! Render3 AST
//!
//! The template syntax tree handed to ingestion: elements, templates, bindings,
//! control-flow and deferred blocks. Produced upstream by the template parser.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::SecurityContext;
use crate::expression_parser::ast::AST as ExprAST;
use crate::parse_util::ParseSourceSpan;

/// Base trait for all R3 AST nodes
pub trait Node {
    fn source_span(&self) -> &ParseSourceSpan;
}

/// Translation metadata attached to an element or block marked for i18n.
#[derive(Debug, Clone, PartialEq)]
pub struct I18nMeta {
    pub id: String,
    /// Serialized message text with placeholders already substituted.
    pub message: String,
}

/// Kinds of property binding in a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingType {
    /// `[prop]="expr"`
    Property,
    /// `[attr.name]="expr"`
    Attribute,
    /// `[class.name]="expr"`
    Class,
    /// `[style.name]="expr"`
    Style,
    /// `[@trigger]="expr"`
    Animation,
    /// `[(prop)]="expr"`
    TwoWay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsedEventType {
    Regular,
    Animation,
    TwoWay,
}

/// Comment node - wrapper for raw html.Comment
#[derive(Debug, Clone)]
pub struct Comment {
    pub value: String,
    pub source_span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct Text {
    pub value: String,
    pub source_span: ParseSourceSpan,
}

impl Text {
    pub fn new(value: impl Into<String>, source_span: ParseSourceSpan) -> Self {
        Text {
            value: value.into(),
            source_span,
        }
    }
}

/// Text containing interpolations; `value` is an `Interpolation` expression.
#[derive(Debug, Clone)]
pub struct BoundText {
    pub value: ExprAST,
    pub source_span: ParseSourceSpan,
    /// Placeholder names for the interpolated expressions when inside an i18n block.
    pub i18n_placeholders: Vec<String>,
}

impl BoundText {
    pub fn new(value: ExprAST, source_span: ParseSourceSpan) -> Self {
        BoundText {
            value,
            source_span,
            i18n_placeholders: Vec::new(),
        }
    }
}

/// Text attribute in the template
#[derive(Debug, Clone)]
pub struct TextAttribute {
    pub name: String,
    pub value: String,
    pub source_span: ParseSourceSpan,
    pub key_span: Option<ParseSourceSpan>,
    pub value_span: Option<ParseSourceSpan>,
    pub i18n: Option<I18nMeta>,
}

impl TextAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>, source_span: ParseSourceSpan) -> Self {
        TextAttribute {
            name: name.into(),
            value: value.into(),
            source_span,
            key_span: None,
            value_span: None,
            i18n: None,
        }
    }
}

/// Bound attribute node
#[derive(Debug, Clone)]
pub struct BoundAttribute {
    pub name: String,
    pub type_: BindingType,
    pub security_context: SecurityContext,
    pub value: ExprAST,
    pub unit: Option<String>,
    pub source_span: ParseSourceSpan,
    pub key_span: ParseSourceSpan,
    pub value_span: Option<ParseSourceSpan>,
    pub i18n: Option<I18nMeta>,
}

impl BoundAttribute {
    pub fn new(
        name: impl Into<String>,
        type_: BindingType,
        value: ExprAST,
        source_span: ParseSourceSpan,
    ) -> Self {
        BoundAttribute {
            name: name.into(),
            type_,
            security_context: SecurityContext::NONE,
            value,
            unit: None,
            key_span: source_span.clone(),
            source_span,
            value_span: None,
            i18n: None,
        }
    }
}

/// Bound event node
#[derive(Debug, Clone)]
pub struct BoundEvent {
    pub name: String,
    pub type_: ParsedEventType,
    pub handler: ExprAST,
    pub target: Option<String>,
    pub phase: Option<String>,
    pub source_span: ParseSourceSpan,
    pub handler_span: ParseSourceSpan,
    pub key_span: ParseSourceSpan,
}

impl BoundEvent {
    pub fn new(
        name: impl Into<String>,
        type_: ParsedEventType,
        handler: ExprAST,
        source_span: ParseSourceSpan,
    ) -> Self {
        BoundEvent {
            name: name.into(),
            type_,
            handler,
            target: None,
            phase: None,
            handler_span: source_span.clone(),
            key_span: source_span.clone(),
            source_span,
        }
    }
}

/// Element node
#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<TextAttribute>,
    pub inputs: Vec<BoundAttribute>,
    pub outputs: Vec<BoundEvent>,
    pub children: Vec<R3Node>,
    pub references: Vec<Reference>,
    pub source_span: ParseSourceSpan,
    pub start_source_span: ParseSourceSpan,
    pub end_source_span: Option<ParseSourceSpan>,
    pub i18n: Option<I18nMeta>,
}

impl Element {
    pub fn new(name: impl Into<String>, children: Vec<R3Node>, source_span: ParseSourceSpan) -> Self {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            children,
            references: Vec::new(),
            start_source_span: source_span.clone(),
            end_source_span: Some(source_span.clone()),
            source_span,
            i18n: None,
        }
    }
}

/// Template attribute (either bound or text)
#[derive(Debug, Clone)]
pub enum TemplateAttr {
    Bound(BoundAttribute),
    Text(TextAttribute),
}

/// Template node (`<ng-template>` or an element carrying a structural directive)
#[derive(Debug, Clone)]
pub struct Template {
    /// `None` for `<ng-template>` itself, else the tag of the element the directive sits on.
    pub tag_name: Option<String>,
    pub attributes: Vec<TextAttribute>,
    pub inputs: Vec<BoundAttribute>,
    pub outputs: Vec<BoundEvent>,
    pub template_attrs: Vec<TemplateAttr>,
    pub children: Vec<R3Node>,
    pub references: Vec<Reference>,
    pub variables: Vec<Variable>,
    pub source_span: ParseSourceSpan,
    pub start_source_span: ParseSourceSpan,
    pub end_source_span: Option<ParseSourceSpan>,
    pub i18n: Option<I18nMeta>,
}

impl Template {
    pub fn new(tag_name: Option<String>, children: Vec<R3Node>, source_span: ParseSourceSpan) -> Self {
        Template {
            tag_name,
            attributes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            template_attrs: Vec::new(),
            children,
            references: Vec::new(),
            variables: Vec::new(),
            start_source_span: source_span.clone(),
            end_source_span: Some(source_span.clone()),
            source_span,
            i18n: None,
        }
    }
}

/// Content node (ng-content)
#[derive(Debug, Clone)]
pub struct Content {
    pub selector: String,
    pub attributes: Vec<TextAttribute>,
    pub children: Vec<R3Node>,
    pub source_span: ParseSourceSpan,
    pub i18n: Option<I18nMeta>,
}

/// Variable node
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub source_span: ParseSourceSpan,
    pub key_span: ParseSourceSpan,
    pub value_span: Option<ParseSourceSpan>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>, source_span: ParseSourceSpan) -> Self {
        Variable {
            name: name.into(),
            value: value.into(),
            key_span: source_span.clone(),
            source_span,
            value_span: None,
        }
    }
}

/// Reference node
#[derive(Debug, Clone)]
pub struct Reference {
    pub name: String,
    pub value: String,
    pub source_span: ParseSourceSpan,
    pub key_span: ParseSourceSpan,
    pub value_span: Option<ParseSourceSpan>,
}

impl Reference {
    pub fn new(name: impl Into<String>, value: impl Into<String>, source_span: ParseSourceSpan) -> Self {
        Reference {
            name: name.into(),
            value: value.into(),
            key_span: source_span.clone(),
            source_span,
            value_span: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum IcuPlaceholder {
    Text(Text),
    BoundText(BoundText),
}

/// ICU node
#[derive(Debug, Clone)]
pub struct Icu {
    pub vars: IndexMap<String, BoundText>,
    pub placeholders: IndexMap<String, IcuPlaceholder>,
    pub source_span: ParseSourceSpan,
    pub i18n: Option<I18nMeta>,
}

/// Block node base
#[derive(Debug, Clone)]
pub struct BlockNode {
    pub name_span: ParseSourceSpan,
    pub source_span: ParseSourceSpan,
    pub start_source_span: ParseSourceSpan,
    pub end_source_span: Option<ParseSourceSpan>,
}

impl BlockNode {
    pub fn new(source_span: ParseSourceSpan) -> Self {
        BlockNode {
            name_span: source_span.clone(),
            start_source_span: source_span.clone(),
            end_source_span: Some(source_span.clone()),
            source_span,
        }
    }
}

/// If block
#[derive(Debug, Clone)]
pub struct IfBlock {
    pub branches: Vec<IfBlockBranch>,
    pub block: BlockNode,
}

/// If block branch
#[derive(Debug, Clone)]
pub struct IfBlockBranch {
    /// `None` for the trailing `@else`.
    pub expression: Option<ExprAST>,
    pub children: Vec<R3Node>,
    pub expression_alias: Option<Variable>,
    pub block: BlockNode,
    pub i18n: Option<I18nMeta>,
}

/// Switch block
#[derive(Debug, Clone)]
pub struct SwitchBlock {
    pub expression: ExprAST,
    pub cases: Vec<SwitchBlockCase>,
    pub block: BlockNode,
}

/// Switch block case
#[derive(Debug, Clone)]
pub struct SwitchBlockCase {
    /// `None` for `@default`.
    pub expression: Option<ExprAST>,
    pub children: Vec<R3Node>,
    pub block: BlockNode,
    pub i18n: Option<I18nMeta>,
}

/// For loop block
#[derive(Debug, Clone)]
pub struct ForLoopBlock {
    pub item: Variable,
    pub expression: ExprAST,
    pub track_by: ExprAST,
    /// `let i = $index, c = $count` style aliases plus the implicit `$index`, `$count`, ... .
    pub context_variables: Vec<Variable>,
    pub children: Vec<R3Node>,
    pub empty: Option<Box<ForLoopBlockEmpty>>,
    pub block: BlockNode,
    pub main_block_span: ParseSourceSpan,
    pub i18n: Option<I18nMeta>,
}

/// For loop block empty
#[derive(Debug, Clone)]
pub struct ForLoopBlockEmpty {
    pub children: Vec<R3Node>,
    pub block: BlockNode,
    pub i18n: Option<I18nMeta>,
}

/// A trigger parameter as written in the template.
#[derive(Debug, Clone)]
pub enum TriggerParameter {
    /// Raw parameter text, e.g. `500ms` or a reference name.
    Text(String),
    /// A parameter already parsed as an expression, e.g. viewport options `{rootMargin: '10px'}`.
    Parsed(ExprAST),
}

/// An `on`/`when` trigger as written, before validation.
#[derive(Debug, Clone)]
pub struct DeferredTriggerSyntax {
    /// Trigger name (`idle`, `timer`, ...) or `when`.
    pub name: String,
    pub parameters: Vec<TriggerParameter>,
    /// The condition of a `when` trigger.
    pub value: Option<ExprAST>,
    pub source_span: ParseSourceSpan,
}

impl DeferredTriggerSyntax {
    pub fn on(name: impl Into<String>, parameters: Vec<TriggerParameter>, source_span: ParseSourceSpan) -> Self {
        DeferredTriggerSyntax {
            name: name.into(),
            parameters,
            value: None,
            source_span,
        }
    }

    pub fn when(value: ExprAST, source_span: ParseSourceSpan) -> Self {
        DeferredTriggerSyntax {
            name: "when".to_string(),
            parameters: Vec::new(),
            value: Some(value),
            source_span,
        }
    }
}

/// Deferred block placeholder
#[derive(Debug, Clone)]
pub struct DeferredBlockPlaceholder {
    pub children: Vec<R3Node>,
    pub minimum_time: Option<usize>,
    pub block: BlockNode,
    pub i18n: Option<I18nMeta>,
}

#[derive(Debug, Clone)]
pub struct DeferredBlockLoading {
    pub children: Vec<R3Node>,
    pub after_time: Option<usize>,
    pub minimum_time: Option<usize>,
    pub block: BlockNode,
    pub i18n: Option<I18nMeta>,
}

#[derive(Debug, Clone)]
pub struct DeferredBlockError {
    pub children: Vec<R3Node>,
    pub block: BlockNode,
    pub i18n: Option<I18nMeta>,
}

/// Deferred block
#[derive(Debug, Clone)]
pub struct DeferredBlock {
    pub children: Vec<R3Node>,
    pub triggers: Vec<DeferredTriggerSyntax>,
    pub prefetch_triggers: Vec<DeferredTriggerSyntax>,
    pub hydrate_triggers: Vec<DeferredTriggerSyntax>,
    pub placeholder: Option<Box<DeferredBlockPlaceholder>>,
    pub loading: Option<Box<DeferredBlockLoading>>,
    pub error: Option<Box<DeferredBlockError>>,
    pub block: BlockNode,
    pub main_block_span: ParseSourceSpan,
    pub i18n: Option<I18nMeta>,
}

impl DeferredBlock {
    pub fn new(children: Vec<R3Node>, source_span: ParseSourceSpan) -> Self {
        DeferredBlock {
            children,
            triggers: Vec::new(),
            prefetch_triggers: Vec::new(),
            hydrate_triggers: Vec::new(),
            placeholder: None,
            loading: None,
            error: None,
            main_block_span: source_span.clone(),
            block: BlockNode::new(source_span),
            i18n: None,
        }
    }
}

/// Let declaration
#[derive(Debug, Clone)]
pub struct LetDeclaration {
    pub name: String,
    pub value: ExprAST,
    pub source_span: ParseSourceSpan,
    pub name_span: ParseSourceSpan,
    pub value_span: ParseSourceSpan,
}

/// Unknown block (for autocompletion)
#[derive(Debug, Clone)]
pub struct UnknownBlock {
    pub name: String,
    pub source_span: ParseSourceSpan,
}

/// Selectorless component node
#[derive(Debug, Clone)]
pub struct Component {
    pub component_name: String,
    pub children: Vec<R3Node>,
    pub source_span: ParseSourceSpan,
}

/// Enum for all R3 node types
#[derive(Debug, Clone)]
pub enum R3Node {
    Comment(Comment),
    Text(Text),
    BoundText(BoundText),
    Element(Element),
    Template(Template),
    Content(Content),
    IfBlock(IfBlock),
    SwitchBlock(SwitchBlock),
    ForLoopBlock(ForLoopBlock),
    DeferredBlock(DeferredBlock),
    Icu(Icu),
    LetDeclaration(LetDeclaration),
    UnknownBlock(UnknownBlock),
    Component(Component),
}

impl R3Node {
    /// Short node kind name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            R3Node::Comment(_) => "Comment",
            R3Node::Text(_) => "Text",
            R3Node::BoundText(_) => "BoundText",
            R3Node::Element(_) => "Element",
            R3Node::Template(_) => "Template",
            R3Node::Content(_) => "Content",
            R3Node::IfBlock(_) => "IfBlock",
            R3Node::SwitchBlock(_) => "SwitchBlock",
            R3Node::ForLoopBlock(_) => "ForLoopBlock",
            R3Node::DeferredBlock(_) => "DeferredBlock",
            R3Node::Icu(_) => "Icu",
            R3Node::LetDeclaration(_) => "LetDeclaration",
            R3Node::UnknownBlock(_) => "UnknownBlock",
            R3Node::Component(_) => "Component",
        }
    }
}

impl Node for R3Node {
    fn source_span(&self) -> &ParseSourceSpan {
        match self {
            R3Node::Comment(n) => &n.source_span,
            R3Node::Text(n) => &n.source_span,
            R3Node::BoundText(n) => &n.source_span,
            R3Node::Element(n) => &n.source_span,
            R3Node::Template(n) => &n.source_span,
            R3Node::Content(n) => &n.source_span,
            R3Node::IfBlock(n) => &n.block.source_span,
            R3Node::SwitchBlock(n) => &n.block.source_span,
            R3Node::ForLoopBlock(n) => &n.block.source_span,
            R3Node::DeferredBlock(n) => &n.block.source_span,
            R3Node::Icu(n) => &n.source_span,
            R3Node::LetDeclaration(n) => &n.source_span,
            R3Node::UnknownBlock(n) => &n.source_span,
            R3Node::Component(n) => &n.source_span,
        }
    }
}
