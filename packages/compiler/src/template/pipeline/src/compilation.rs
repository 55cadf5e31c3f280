//! Compilation Module
//!
//! The compilation job and its units: the owned graph every pass mutates.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::constant_pool::ConstantPool;
use crate::error::{CompilerError, Result};
use crate::output::output_ast::{Expression, Statement};
use crate::parse_util::ParseError;
use crate::template::pipeline::ir::{
    AliasVariable, CompatibilityMode, CompilationJobKind, ConstIndex, CreateOp, ExpressionTransform, Op,
    OpKind, OpList, TransformExpressions, UpdateOp, VisitorContextFlag, XrefId,
};

/// Possible modes in which a component's template can be compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateCompilationMode {
    /// Supports the full instruction set, including directives.
    Full,
    /// Uses a narrower instruction set that doesn't support directives and allows optimizations.
    DomOnly,
}

/// Where the dependency loaders of `@defer` blocks come from.
#[derive(Debug, Clone, Default)]
pub enum DeferMetadata {
    /// One loader per block, keyed by the start offset of the block's source span.
    PerBlock(IndexMap<usize, Expression>),
    /// A single loader shared by every block of the component.
    PerComponent(Option<Expression>),
    #[default]
    None,
}

/// One view of a template (or the single unit of a host binding job).
#[derive(Debug)]
pub struct ViewCompilationUnit {
    pub xref: XrefId,
    pub parent: Option<XrefId>,
    pub create: OpList<CreateOp>,
    pub update: OpList<UpdateOp>,
    /// Map of declared variables available within this view to the property on the context
    /// object which they alias.
    pub context_variables: IndexMap<String, String>,
    /// Computed loop variables (`$first`, `$odd`, ...) inlined at every use.
    pub aliases: Vec<AliasVariable>,
    /// Name of the function which will be generated for this unit.
    pub fn_name: Option<String>,
    /// Number of declaration slots used within this view.
    pub decls: Option<usize>,
    /// Number of variable slots used within this view.
    pub vars: Option<usize>,
}

impl ViewCompilationUnit {
    pub fn new(xref: XrefId, parent: Option<XrefId>) -> Self {
        ViewCompilationUnit {
            xref,
            parent,
            create: OpList::new(),
            update: OpList::new(),
            context_variables: IndexMap::new(),
            aliases: Vec::new(),
            fn_name: None,
            decls: None,
            vars: None,
        }
    }

    /// The update list followed by the handler list of every listener in the create list.
    pub fn update_lists_mut(&mut self) -> Vec<&mut OpList<UpdateOp>> {
        let mut lists = vec![&mut self.update];
        for op in self.create.iter_mut() {
            if let Some(listener) = op.as_listener_mut() {
                lists.push(&mut listener.handler_ops);
            }
        }
        lists
    }

    /// Rewrites every expression of every op of the unit, listener handlers included.
    pub fn transform_expressions(&mut self, transform: &mut ExpressionTransform<'_>) {
        for op in self.create.iter_mut() {
            op.transform_expressions(transform, VisitorContextFlag::NONE);
        }
        for op in self.update.iter_mut() {
            op.transform_expressions(transform, VisitorContextFlag::NONE);
        }
    }

    /// Calls `visitor` with every expression of every op of the unit.
    pub fn visit_expressions(&mut self, visitor: &mut dyn FnMut(&Expression, VisitorContextFlag)) {
        self.transform_expressions(&mut |expr, flags| {
            visitor(&expr, flags);
            expr
        });
    }
}

/// Hands out `XrefId`s; ids are never reused within a job.
#[derive(Debug)]
pub struct XrefAllocator {
    next: usize,
}

impl XrefAllocator {
    pub fn allocate(&mut self) -> XrefId {
        let xref = XrefId::new(self.next);
        self.next += 1;
        xref
    }
}

/// Disjoint mutable borrows of a job, for passes that rewrite several units while allocating
/// ids or pooling constants.
pub struct JobParts<'a> {
    pub units: Vec<&'a mut ViewCompilationUnit>,
    pub ids: &'a mut XrefAllocator,
    pub pool: &'a mut ConstantPool,
}

/// An entire ongoing compilation, which will result in one or more template functions when
/// complete.
#[derive(Debug)]
pub struct CompilationJob {
    pub kind: CompilationJobKind,
    pub component_name: String,
    pub pool: ConstantPool,
    pub compatibility: CompatibilityMode,
    pub mode: TemplateCompilationMode,
    pub config: PipelineConfig,
    pub root: XrefId,
    views: IndexMap<XrefId, ViewCompilationUnit>,
    /// The component's consts array.
    pub consts: Vec<Expression>,
    /// Statements that must run before the consts array is read.
    pub consts_initializers: Vec<Statement>,
    /// `ng-content` selectors, collected for the projection definition.
    pub content_selectors: Option<Expression>,
    pub defer_meta: DeferMetadata,
    /// Static attributes of a host binding job.
    pub host_attributes: Option<Expression>,
    /// User-facing problems found while compiling.
    pub errors: Vec<ParseError>,
    ids: XrefAllocator,
}

impl CompilationJob {
    fn new(kind: CompilationJobKind, component_name: String, pool: ConstantPool, config: PipelineConfig) -> Self {
        let root = XrefId::new(0);
        let mut views = IndexMap::new();
        views.insert(root, ViewCompilationUnit::new(root, None));
        CompilationJob {
            kind,
            component_name,
            pool,
            compatibility: config.compatibility_mode,
            mode: config.compilation_mode,
            config,
            root,
            views,
            consts: Vec::new(),
            consts_initializers: Vec::new(),
            content_selectors: None,
            defer_meta: DeferMetadata::None,
            host_attributes: None,
            errors: Vec::new(),
            ids: XrefAllocator { next: 1 },
        }
    }

    /// A template job whose root view gets xref 0.
    pub fn component(name: impl Into<String>, pool: ConstantPool, config: PipelineConfig) -> Self {
        CompilationJob::new(CompilationJobKind::Tmpl, name.into(), pool, config)
    }

    /// A host binding job with a single root unit.
    pub fn host_binding(name: impl Into<String>, pool: ConstantPool, config: PipelineConfig) -> Self {
        let mut job = CompilationJob::new(CompilationJobKind::Host, name.into(), pool, config);
        job.mode = TemplateCompilationMode::Full;
        job
    }

    /// Suffix of every function generated for this job.
    pub fn fn_suffix(&self) -> &'static str {
        match self.kind {
            CompilationJobKind::Host => "HostBindings",
            _ => "Template",
        }
    }

    pub fn allocate_xref_id(&mut self) -> XrefId {
        self.ids.allocate()
    }

    /// Add a `ViewCompilationUnit` for a new embedded view to this compilation.
    pub fn allocate_view(&mut self, parent: XrefId) -> XrefId {
        let xref = self.allocate_xref_id();
        self.views.insert(xref, ViewCompilationUnit::new(xref, Some(parent)));
        xref
    }

    pub fn view(&self, xref: XrefId) -> Result<&ViewCompilationUnit> {
        self.views.get(&xref).ok_or(CompilerError::UnknownView(xref))
    }

    pub fn view_mut(&mut self, xref: XrefId) -> Result<&mut ViewCompilationUnit> {
        self.views.get_mut(&xref).ok_or(CompilerError::UnknownView(xref))
    }

    pub fn root_unit(&self) -> &ViewCompilationUnit {
        &self.views[0]
    }

    pub fn root_unit_mut(&mut self) -> &mut ViewCompilationUnit {
        &mut self.views[0]
    }

    /// All units, in allocation order.
    pub fn units(&self) -> impl Iterator<Item = &ViewCompilationUnit> + '_ {
        self.views.values()
    }

    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut ViewCompilationUnit> + '_ {
        self.views.values_mut()
    }

    pub fn parts_mut(&mut self) -> JobParts<'_> {
        JobParts {
            units: self.views.values_mut().collect(),
            ids: &mut self.ids,
            pool: &mut self.pool,
        }
    }

    pub fn view_xrefs(&self) -> Vec<XrefId> {
        self.views.keys().copied().collect()
    }

    /// Add a constant to the consts array, reusing an equivalent entry if one exists.
    pub fn add_const(&mut self, new_const: Expression, initializers: Vec<Statement>) -> ConstIndex {
        if let Some(idx) = self.consts.iter().position(|c| c.is_equivalent(&new_const)) {
            return ConstIndex::new(idx);
        }
        self.consts.push(new_const);
        self.consts_initializers.extend(initializers);
        ConstIndex::new(self.consts.len() - 1)
    }

    /// Records a problem in the user's template; compilation continues.
    pub fn report(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    /// The loader function for the `@defer` block starting at `block_offset`.
    pub fn defer_deps_fn(&self, block_offset: usize) -> Option<Expression> {
        match &self.defer_meta {
            DeferMetadata::PerBlock(blocks) => blocks.get(&block_offset).cloned(),
            DeferMetadata::PerComponent(deps_fn) => deps_fn.clone(),
            DeferMetadata::None => None,
        }
    }

    /// Finds the create op declaring `xref` in any unit, returning the unit's xref with it.
    pub fn find_create_op(&self, xref: XrefId) -> Option<(XrefId, &CreateOp)> {
        self.units().find_map(|unit| {
            unit.create
                .iter()
                .find(|op| op.xref() == Some(xref) && !is_end_op(op.kind()))
                .map(|op| (unit.xref, op))
        })
    }
}

fn is_end_op(kind: OpKind) -> bool {
    matches!(
        kind,
        OpKind::ElementEnd | OpKind::ContainerEnd | OpKind::I18nEnd | OpKind::IcuEnd
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::output_ast as o;

    fn job() -> CompilationJob {
        CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default())
    }

    #[test]
    fn root_view_is_xref_zero_and_ids_increase() {
        let mut job = job();
        assert_eq!(job.root, XrefId(0));
        let a = job.allocate_view(job.root);
        let b = job.allocate_xref_id();
        assert_eq!(a, XrefId(1));
        assert_eq!(b, XrefId(2));
        assert_eq!(job.view(a).unwrap().parent, Some(XrefId(0)));
        assert_eq!(job.view_xrefs(), vec![XrefId(0), XrefId(1)]);
        assert!(matches!(job.view(b), Err(CompilerError::UnknownView(_))));
    }

    #[test]
    fn consts_are_deduplicated() {
        let mut job = job();
        let first = job.add_const(o::literal_arr(vec![o::literal("a"), o::literal("b")]), vec![]);
        let other = job.add_const(o::literal_arr(vec![o::literal("c")]), vec![]);
        let again = job.add_const(o::literal_arr(vec![o::literal("a"), o::literal("b")]), vec![]);
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(job.consts.len(), 2);
    }

    #[test]
    fn fn_suffix_depends_on_kind() {
        assert_eq!(job().fn_suffix(), "Template");
        let host = CompilationJob::host_binding("Dir", ConstantPool::new(), PipelineConfig::default());
        assert_eq!(host.fn_suffix(), "HostBindings");
    }
}
