//! Naming Phase
//!
//! Generates names for functions and variables across all views.
//!
//! View functions are named after the path of template ops leading to them, listener functions
//! after their view, element, event and slot, and variables from a job-wide counter.

use indexmap::IndexMap;

use crate::error::{invariant, CompilerError, Result};
use crate::output::output_ast::Expression;
use crate::parse_util::sanitize_identifier;
use crate::template::pipeline::ir::{
    CompatibilityMode, CompilationJobKind, CreateOp, OpList, SemanticVariable, TransformExpressions, UpdateOp, VariableOp,
    VisitorContextFlag, XrefId,
};
use crate::template::pipeline::src::compilation::CompilationJob;
use crate::template::pipeline::src::phases::parse_extracted_styles::hyphenate;

struct NamingState {
    index: usize,
    compatibility: bool,
    component_name: String,
    component_name_in_fn: bool,
    fn_suffix: &'static str,
}

impl NamingState {
    /// `path` is the chain of `_Suffix_slot` segments leading from the root view.
    fn base_name(&self, path: &str) -> String {
        format!("{}{}", self.component_name, path)
    }

    fn view_fn_candidate(&self, path: &str) -> String {
        if self.component_name_in_fn {
            format!("{}_{}", self.base_name(path), self.fn_suffix)
        } else {
            format!("{}{}", self.fn_suffix, path)
        }
    }

    fn variable_name(&mut self, variable: &mut SemanticVariable) -> String {
        if let Some(name) = variable.name() {
            return name.to_string();
        }
        let name = match &*variable {
            SemanticVariable::Context(_) => {
                let name = format!("ctx_r{}", self.index);
                self.index += 1;
                name
            }
            SemanticVariable::Identifier(identifier) => {
                if self.compatibility {
                    // A variable named `ctx` would clash with the view function's parameter.
                    let prefix = if identifier.identifier == "ctx" { "i" } else { "" };
                    self.index += 1;
                    format!("{}_{}r{}", identifier.identifier, prefix, self.index)
                } else {
                    let name = format!("{}_i{}", identifier.identifier, self.index);
                    self.index += 1;
                    name
                }
            }
            SemanticVariable::SavedView(_) | SemanticVariable::Alias(_) => {
                self.index += 1;
                format!("_r{}", self.index)
            }
        };
        variable.set_name(name.clone());
        name
    }
}

pub fn name_functions_and_variables(job: &mut CompilationJob) -> Result<()> {
    let mut state = NamingState {
        index: 0,
        compatibility: job.compatibility == CompatibilityMode::TemplateDefinitionBuilder,
        component_name: job.component_name.clone(),
        // Host binding functions always carry the component name.
        component_name_in_fn: job.config.component_name_in_fn || job.kind == CompilationJobKind::Host,
        fn_suffix: job.fn_suffix(),
    };
    let root = job.root;
    add_names_to_view(job, root, String::new(), &mut state)
}

fn add_names_to_view(job: &mut CompilationJob, view: XrefId, path: String, state: &mut NamingState) -> Result<()> {
    if job.view(view)?.fn_name.is_none() {
        let candidate = sanitize_identifier(&state.view_fn_candidate(&path));
        let name = job.pool.unique_name(&candidate, false);
        job.view_mut(view)?.fn_name = Some(name);
    }
    let fn_name = job.view(view)?.fn_name.clone().unwrap_or_default();
    let base_name = state.base_name(&path);

    let mut var_names: IndexMap<XrefId, String> = IndexMap::new();
    for id in job.view(view)?.create.ids() {
        let Some(op) = job.view_mut(view)?.create.get_mut(id) else { continue };
        let children = name_create_op(op, &fn_name, &base_name, &path, state, &mut var_names)?;
        for (child, child_path) in children {
            add_names_to_view(job, child, child_path, state)?;
        }
    }

    let unit = job.view_mut(view)?;
    for op in unit.update.iter_mut() {
        name_update_op(op, state, &mut var_names);
    }

    // Having named all variables declared in this view, rename all reads of them.
    let mut failure: Option<CompilerError> = None;
    let mut rename = |expr: Expression, _: VisitorContextFlag| match expr {
        Expression::ReadVariable(mut read) if read.name.is_none() => {
            match var_names.get(&read.xref) {
                Some(name) => read.name = Some(name.clone()),
                None => {
                    failure.get_or_insert_with(|| {
                        CompilerError::Invariant(format!("variable {:?} not yet named", read.xref))
                    });
                }
            }
            Expression::ReadVariable(read)
        }
        other => other,
    };
    for op in unit.create.iter_mut() {
        op.transform_expressions(&mut rename, VisitorContextFlag::NONE);
    }
    for op in unit.update.iter_mut() {
        op.transform_expressions(&mut rename, VisitorContextFlag::NONE);
    }
    failure.map_or(Ok(()), Err)
}

/// Names one create op, returning the child views it declares with their paths.
fn name_create_op(
    op: &mut CreateOp,
    fn_name: &str,
    base_name: &str,
    path: &str,
    state: &mut NamingState,
    var_names: &mut IndexMap<XrefId, String>,
) -> Result<Vec<(XrefId, String)>> {
    let mut children = Vec::new();
    match op {
        CreateOp::Listener(listener) | CreateOp::TwoWayListener(listener) => {
            if listener.handler_fn_name.is_none() {
                let name = if listener.host_listener {
                    format!("{}_{}_HostBindingHandler", base_name, listener.name)
                } else {
                    let slot = listener.target_slot.get()?;
                    // Only the first dash of the tag is replaced, matching the legacy naming.
                    let tag = listener.tag.as_deref().unwrap_or_default().replacen('-', "_", 1);
                    format!("{}_{}_{}_{}_listener", fn_name, tag, listener.name, slot)
                };
                listener.handler_fn_name = Some(sanitize_identifier(&name));
            }
            name_variables_in(&mut listener.handler_ops, state, var_names);
        }
        CreateOp::Variable(variable) => name_variable(variable, state, var_names),
        CreateOp::RepeaterCreate(repeater) => {
            let slot = repeater.handle.get()?;
            // The repeater's metadata occupies its first slot, then the views follow.
            if let Some(empty) = repeater.empty_view {
                children.push((empty, format!("{}_ForEmpty_{}", path, slot + 2)));
            }
            children.push((repeater.xref, format!("{}_For_{}", path, slot + 1)));
        }
        CreateOp::Projection(projection) => {
            if let Some(fallback) = projection.fallback_view {
                let slot = projection.handle.get()?;
                children.push((fallback, format!("{}_ProjectionFallback_{}", path, slot)));
            }
        }
        CreateOp::Template(t) | CreateOp::ConditionalCreate(t) | CreateOp::ConditionalBranchCreate(t) => {
            let slot = t.handle.get()?;
            let suffix = if t.fn_name_suffix.is_empty() {
                String::new()
            } else {
                format!("_{}", t.fn_name_suffix)
            };
            children.push((t.xref, format!("{}{}_{}", path, suffix, slot)));
        }
        _ => {}
    }
    Ok(children)
}

fn name_update_op(op: &mut UpdateOp, state: &mut NamingState, var_names: &mut IndexMap<XrefId, String>) {
    match op {
        UpdateOp::Variable(variable) => name_variable(variable, state, var_names),
        UpdateOp::StyleProp(style) => {
            if !style.name.starts_with("--") {
                style.name = hyphenate(&style.name);
            }
            if state.compatibility {
                style.name = strip_important(&style.name);
            }
        }
        UpdateOp::ClassProp(class) if state.compatibility => class.name = strip_important(&class.name),
        _ => {}
    }
}

fn name_variables_in(ops: &mut OpList<UpdateOp>, state: &mut NamingState, var_names: &mut IndexMap<XrefId, String>) {
    for op in ops.iter_mut() {
        if let UpdateOp::Variable(variable) = op {
            name_variable(variable, state, var_names);
        }
    }
}

fn name_variable(op: &mut VariableOp, state: &mut NamingState, var_names: &mut IndexMap<XrefId, String>) {
    let name = state.variable_name(&mut op.variable);
    var_names.insert(op.xref, name);
}

fn strip_important(name: &str) -> String {
    match name.rfind("!important") {
        Some(index) => name[..index].to_string(),
        None => name.to_string(),
    }
}

/// The function name of a view, once naming has run.
pub fn view_fn_name(job: &CompilationJob, view: XrefId) -> Result<String> {
    match &job.view(view)?.fn_name {
        Some(name) => Ok(name.clone()),
        None => invariant(format!("view {view:?} has not been named")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;
    use crate::parse_util::{ParseSourceFile, ParseSourceSpan};
    use crate::template::pipeline::ir::{
        create_listener_op, create_statement_op, create_template_op, create_variable_op, Namespace,
        ReadVariableExpr, TemplateKind, VariableFlags,
    };
    use std::sync::Arc;

    fn span() -> ParseSourceSpan {
        let file = Arc::new(ParseSourceFile::new("<ng-template (click)=\"f()\">", "test.html"));
        ParseSourceSpan::from_offsets(&file, 0, 12)
    }

    fn job_with_child(config: PipelineConfig) -> (CompilationJob, XrefId) {
        let mut job = CompilationJob::component("MyCmp", ConstantPool::new(), config);
        let root = job.root;
        let child = job.allocate_view(root);
        let mut template = create_template_op(child, TemplateKind::Block, None, "Conditional", Namespace::HTML, span(), span());
        template.handle.slot = Some(2);
        job.root_unit_mut().create.push(CreateOp::Template(template));
        (job, child)
    }

    #[test]
    fn view_functions_follow_the_template_path() {
        let (mut job, child) = job_with_child(PipelineConfig::default());
        name_functions_and_variables(&mut job).unwrap();
        assert_eq!(view_fn_name(&job, job.root).unwrap(), "MyCmp_Template");
        assert_eq!(view_fn_name(&job, child).unwrap(), "MyCmp_Conditional_2_Template");
    }

    #[test]
    fn view_functions_can_omit_the_component_name() {
        let config = PipelineConfig {
            component_name_in_fn: false,
            ..PipelineConfig::default()
        };
        let (mut job, child) = job_with_child(config);
        name_functions_and_variables(&mut job).unwrap();
        assert_eq!(view_fn_name(&job, job.root).unwrap(), "Template");
        assert_eq!(view_fn_name(&job, child).unwrap(), "Template_Conditional_2");
    }

    #[test]
    fn listeners_and_variables_are_named() {
        let mut job = CompilationJob::component("MyCmp", ConstantPool::new(), PipelineConfig::default());
        let button = job.allocate_xref_id();
        let var = job.allocate_xref_id();
        let mut listener = create_listener_op(
            button,
            "click",
            Some("my-button".to_string()),
            OpList::new(),
            false,
            None,
            span(),
        );
        listener.target_slot.slot = Some(0);
        let unit = job.root_unit_mut();
        unit.create.push(CreateOp::Listener(listener));
        unit.update.push(UpdateOp::Variable(create_variable_op(
            var,
            SemanticVariable::identifier("item", false),
            crate::output::output_ast::variable("ctx").prop("item"),
            VariableFlags::NONE,
        )));
        unit.update.push(UpdateOp::Statement(create_statement_op(
            Expression::ReadVariable(ReadVariableExpr::new(var)).to_stmt(),
        )));

        name_functions_and_variables(&mut job).unwrap();

        let unit = job.root_unit();
        let Some(CreateOp::Listener(l)) = unit.create.iter().next() else { panic!("expected the listener") };
        assert_eq!(l.handler_fn_name.as_deref(), Some("MyCmp_Template_my_button_click_0_listener"));
        let Some(UpdateOp::Statement(stmt)) = unit.update.iter().nth(1) else { panic!("expected a statement") };
        let crate::output::output_ast::Statement::Expression(expr) = &stmt.statement else {
            panic!("expected an expression statement")
        };
        assert!(matches!(&*expr.expr, Expression::ReadVariable(read) if read.name.as_deref() == Some("item_r1")));
    }

    #[test]
    fn important_is_stripped_in_compatibility_mode() {
        assert_eq!(strip_important("color!important"), "color");
        assert_eq!(strip_important("color"), "color");
    }
}
