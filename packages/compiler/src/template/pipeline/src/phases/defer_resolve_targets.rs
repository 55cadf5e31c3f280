//! Defer Resolve Targets Phase
//!
//! Some `@defer` triggers reference other elements of the template through their local
//! reference names. Unlike ordinary local references, lookups also see names in enclosing
//! views, so each trigger records the target's xref, its view and how many views must be
//! walked from the defer block to reach it.

use indexmap::IndexMap;

use crate::error::Result;
use crate::parse_util::ParseError;
use crate::template::pipeline::ir::{CreateOp, DeferOpModifierKind, DeferTriggerTarget, OpId, SlotHandle, XrefId};
use crate::template::pipeline::src::compilation::{CompilationJob, ViewCompilationUnit};

/// What a view offers to trigger lookups.
#[derive(Debug, Default)]
struct TargetScope {
    parent: Option<XrefId>,
    /// Local reference name to the element-like op carrying it.
    targets: IndexMap<String, XrefId>,
    /// The first element-like op of the view, used when a trigger names no target.
    first_element: Option<XrefId>,
}

impl TargetScope {
    fn of(unit: &ViewCompilationUnit) -> Self {
        let mut scope = TargetScope {
            parent: unit.parent,
            ..Default::default()
        };
        for op in unit.create.iter() {
            if !op.is_element_or_container() {
                continue;
            }
            let Some(xref) = op.xref() else { continue };
            scope.first_element.get_or_insert(xref);
            for local_ref in op.local_refs() {
                // Only references to the element itself can be observed.
                if local_ref.target.is_empty() {
                    scope.targets.insert(local_ref.name.clone(), xref);
                }
            }
        }
        scope
    }
}

pub fn resolve_defer_target_names(job: &mut CompilationJob) -> Result<()> {
    let scopes: IndexMap<XrefId, TargetScope> = job.units().map(|unit| (unit.xref, TargetScope::of(unit))).collect();

    let mut errors = Vec::new();
    for unit in job.units_mut() {
        let owner_view = unit.xref;
        // Defer xref to (main view, placeholder view).
        let mut defers: IndexMap<XrefId, (XrefId, Option<XrefId>)> = IndexMap::new();
        let mut unresolved: Vec<OpId> = Vec::new();

        for (id, op) in unit.create.iter_mut_with_ids() {
            match op {
                CreateOp::Defer(defer) => {
                    defers.insert(defer.xref, (defer.main_view, defer.placeholder_view));
                }
                CreateOp::DeferOn(on) => {
                    let Some(&(main_view, placeholder_view)) = defers.get(&on.defer) else {
                        continue;
                    };
                    // Hydration triggers observe the main content, which is already rendered.
                    let search_view = if on.modifier == DeferOpModifierKind::Hydrate {
                        Some(main_view)
                    } else {
                        placeholder_view
                    };
                    let Some(target) = on.trigger.target_mut() else { continue };
                    if !resolve_trigger(target, owner_view, search_view, &scopes) {
                        let msg = match &target.target_name {
                            Some(name) => format!("Trigger cannot find reference \"{}\".", name),
                            None => "Trigger with no parameters can only be placed on an @defer that has a \
                                     @placeholder block with exactly one root element node"
                                .to_string(),
                        };
                        errors.push(ParseError::new(on.source_span.clone(), msg));
                        unresolved.push(id);
                    }
                }
                _ => {}
            }
        }

        for id in unresolved {
            unit.create.remove(id)?;
        }
    }

    for error in errors {
        job.report(error);
    }
    Ok(())
}

/// Fills in `target`, returning whether a target was found.
fn resolve_trigger(
    target: &mut DeferTriggerTarget,
    owner_view: XrefId,
    placeholder_view: Option<XrefId>,
    scopes: &IndexMap<XrefId, TargetScope>,
) -> bool {
    let Some(name) = target.target_name.clone() else {
        // Without a name, the trigger observes the first element of the placeholder.
        let first = placeholder_view.and_then(|view| scopes.get(&view).and_then(|scope| scope.first_element));
        return match (placeholder_view, first) {
            (Some(view), Some(xref)) => {
                set_target(target, xref, view, -1);
                true
            }
            _ => false,
        };
    };

    let (mut view, mut step) = match placeholder_view {
        Some(placeholder) => (Some(placeholder), -1),
        None => (Some(owner_view), 0),
    };
    while let Some(current) = view {
        let Some(scope) = scopes.get(&current) else { break };
        if let Some(&xref) = scope.targets.get(&name) {
            set_target(target, xref, current, step);
            return true;
        }
        view = scope.parent;
        step += 1;
    }
    false
}

fn set_target(target: &mut DeferTriggerTarget, xref: XrefId, view: XrefId, steps: isize) {
    target.target_xref = Some(xref);
    target.target_view = Some(view);
    target.target_slot = Some(SlotHandle::new(xref));
    target.target_slot_view_steps = Some(steps);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;
    use crate::parse_util::{ParseSourceFile, ParseSourceSpan};
    use crate::template::pipeline::ir::{
        create_defer_on_op, create_element_start_op, DeferOp, DeferTrigger, LocalRef, Namespace,
    };
    use crate::core::TDeferDetailsFlags;
    use std::sync::Arc;

    fn span() -> ParseSourceSpan {
        let file = Arc::new(ParseSourceFile::new("@defer (on hover(btn)) {}", "test.html"));
        ParseSourceSpan::from_offsets(&file, 0, 5)
    }

    fn defer_op(xref: XrefId, main_view: XrefId, placeholder_view: Option<XrefId>) -> CreateOp {
        CreateOp::Defer(DeferOp {
            xref,
            handle: SlotHandle::new(xref),
            main_view,
            main_slot: SlotHandle::new(main_view),
            loading_view: None,
            loading_slot: None,
            placeholder_view,
            placeholder_slot: placeholder_view.map(SlotHandle::new),
            error_view: None,
            error_slot: None,
            loading_minimum_time: None,
            loading_after_time: None,
            placeholder_minimum_time: None,
            loading_config: None,
            placeholder_config: None,
            resolver_fn: None,
            flags: TDeferDetailsFlags::Default,
            source_span: span(),
        })
    }

    fn trigger_target(job: &CompilationJob) -> DeferTriggerTarget {
        job.root_unit()
            .create
            .iter()
            .find_map(|op| match op {
                CreateOp::DeferOn(on) => on.trigger.target().cloned(),
                _ => None,
            })
            .expect("a trigger with a target")
    }

    #[test]
    fn named_target_in_owner_view_has_zero_steps() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let root = job.root;
        let main = job.allocate_view(root);
        let button = job.allocate_xref_id();
        let defer = job.allocate_xref_id();

        let mut element = create_element_start_op("button", button, Namespace::HTML, span(), span());
        element.local_refs.push(LocalRef {
            name: "btn".to_string(),
            target: String::new(),
        });
        let unit = job.root_unit_mut();
        unit.create.push(CreateOp::ElementStart(element));
        unit.create.push(defer_op(defer, main, None));
        unit.create.push(create_defer_on_op(
            defer,
            DeferTrigger::Hover(DeferTriggerTarget::named(Some("btn".to_string()))),
            DeferOpModifierKind::None,
            span(),
        ));

        resolve_defer_target_names(&mut job).unwrap();

        let target = trigger_target(&job);
        assert_eq!(target.target_xref, Some(button));
        assert_eq!(target.target_view, Some(root));
        assert_eq!(target.target_slot_view_steps, Some(0));
        assert!(job.errors.is_empty());
    }

    #[test]
    fn repeated_reference_name_resolves_to_last_element() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let root = job.root;
        let main = job.allocate_view(root);
        let first = job.allocate_xref_id();
        let second = job.allocate_xref_id();
        let defer = job.allocate_xref_id();

        let unit = job.root_unit_mut();
        for (tag, xref) in [("button", first), ("a", second)] {
            let mut element = create_element_start_op(tag, xref, Namespace::HTML, span(), span());
            element.local_refs.push(LocalRef {
                name: "btn".to_string(),
                target: String::new(),
            });
            unit.create.push(CreateOp::ElementStart(element));
        }
        unit.create.push(defer_op(defer, main, None));
        unit.create.push(create_defer_on_op(
            defer,
            DeferTrigger::Interaction(DeferTriggerTarget::named(Some("btn".to_string()))),
            DeferOpModifierKind::None,
            span(),
        ));

        resolve_defer_target_names(&mut job).unwrap();

        assert_eq!(trigger_target(&job).target_xref, Some(second));
    }

    #[test]
    fn unnamed_target_uses_first_placeholder_element() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let root = job.root;
        let main = job.allocate_view(root);
        let placeholder = job.allocate_view(root);
        let div = job.allocate_xref_id();
        let defer = job.allocate_xref_id();
        job.view_mut(placeholder)
            .unwrap()
            .create
            .push(CreateOp::ElementStart(create_element_start_op("div", div, Namespace::HTML, span(), span())));
        let unit = job.root_unit_mut();
        unit.create.push(defer_op(defer, main, Some(placeholder)));
        unit.create.push(create_defer_on_op(
            defer,
            DeferTrigger::Interaction(DeferTriggerTarget::named(None)),
            DeferOpModifierKind::None,
            span(),
        ));

        resolve_defer_target_names(&mut job).unwrap();

        let target = trigger_target(&job);
        assert_eq!(target.target_xref, Some(div));
        assert_eq!(target.target_view, Some(placeholder));
        assert_eq!(target.target_slot_view_steps, Some(-1));
    }

    #[test]
    fn missing_reference_is_reported_and_trigger_dropped() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let main = job.allocate_view(job.root);
        let defer = job.allocate_xref_id();
        let unit = job.root_unit_mut();
        unit.create.push(defer_op(defer, main, None));
        unit.create.push(create_defer_on_op(
            defer,
            DeferTrigger::Hover(DeferTriggerTarget::named(Some("missing".to_string()))),
            DeferOpModifierKind::None,
            span(),
        ));

        resolve_defer_target_names(&mut job).unwrap();

        assert_eq!(job.errors.len(), 1);
        assert!(job.errors[0].msg.contains("missing"));
        assert_eq!(job.root_unit().create.len(), 1);
    }
}
