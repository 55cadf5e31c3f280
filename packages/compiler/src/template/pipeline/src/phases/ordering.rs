//! Ordering Phase
//!
//! Many type of operations have ordering constraints that must be respected. For example, a
//! `ClassMap` instruction must be ordered after a `StyleMap` instruction, in order to have
//! predictable semantics that match TemplateDefinitionBuilder and don't break applications.
//!
//! Ops are reordered only within runs of handled kinds that target the same element.

use smallvec::SmallVec;

use crate::error::Result;
use crate::template::pipeline::ir::{BindingExpression, CompilationJobKind, CreateOp, Op, OpKind, UpdateOp, XrefId};
use crate::template::pipeline::src::compilation::CompilationJob;

struct Rule<T> {
    test: fn(&T) -> bool,
    transform: Option<fn(Vec<T>) -> Vec<T>>,
}

impl<T> Rule<T> {
    const fn test(test: fn(&T) -> bool) -> Self {
        Rule { test, transform: None }
    }

    const fn keep_last(test: fn(&T) -> bool) -> Self {
        Rule {
            test,
            transform: Some(keep_last),
        }
    }
}

/// Only the last map binding of a kind on an element has any effect.
fn keep_last<T>(mut ops: Vec<T>) -> Vec<T> {
    match ops.pop() {
        Some(last) => vec![last],
        None => ops,
    }
}

fn is_interpolation(op: &UpdateOp) -> bool {
    let expression = match op {
        UpdateOp::Property(op) | UpdateOp::DomProperty(op) | UpdateOp::TwoWayProperty(op) => &op.expression,
        UpdateOp::Attribute(op) => &op.expression,
        _ => return false,
    };
    matches!(expression, BindingExpression::Interpolation(_))
}

const CREATE_ORDERING: &[Rule<CreateOp>] = &[Rule::test(|op: &CreateOp| {
    matches!(op, CreateOp::Listener(_) | CreateOp::TwoWayListener(_))
})];

const UPDATE_ORDERING: &[Rule<UpdateOp>] = &[
    Rule::keep_last(|op: &UpdateOp| op.kind() == OpKind::StyleMap),
    Rule::keep_last(|op: &UpdateOp| op.kind() == OpKind::ClassMap),
    Rule::test(|op: &UpdateOp| op.kind() == OpKind::StyleProp),
    Rule::test(|op: &UpdateOp| op.kind() == OpKind::ClassProp),
    Rule::test(|op: &UpdateOp| op.kind() == OpKind::Attribute && is_interpolation(op)),
    Rule::test(|op: &UpdateOp| op.kind() == OpKind::Property && is_interpolation(op)),
    Rule::test(|op: &UpdateOp| {
        matches!(op.kind(), OpKind::Property | OpKind::TwoWayProperty) && !is_interpolation(op)
    }),
    Rule::test(|op: &UpdateOp| op.kind() == OpKind::Attribute && !is_interpolation(op)),
];

const UPDATE_HOST_ORDERING: &[Rule<UpdateOp>] = &[
    Rule::test(|op: &UpdateOp| op.kind() == OpKind::DomProperty && is_interpolation(op)),
    Rule::test(|op: &UpdateOp| op.kind() == OpKind::DomProperty && !is_interpolation(op)),
    Rule::test(|op: &UpdateOp| op.kind() == OpKind::Attribute),
    Rule::keep_last(|op: &UpdateOp| op.kind() == OpKind::StyleMap),
    Rule::keep_last(|op: &UpdateOp| op.kind() == OpKind::ClassMap),
    Rule::test(|op: &UpdateOp| op.kind() == OpKind::StyleProp),
    Rule::test(|op: &UpdateOp| op.kind() == OpKind::ClassProp),
];

/// Kinds subject to reordering.
fn is_handled(kind: OpKind) -> bool {
    matches!(
        kind,
        OpKind::Listener
            | OpKind::TwoWayListener
            | OpKind::StyleMap
            | OpKind::ClassMap
            | OpKind::StyleProp
            | OpKind::ClassProp
            | OpKind::Property
            | OpKind::TwoWayProperty
            | OpKind::DomProperty
            | OpKind::Attribute
    )
}

pub fn order_ops(job: &mut CompilationJob) -> Result<()> {
    let update_ordering = match job.kind {
        CompilationJobKind::Host => UPDATE_HOST_ORDERING,
        _ => UPDATE_ORDERING,
    };
    for unit in job.units_mut() {
        let create = order_within(unit.create.take_all(), CREATE_ORDERING, |_| None);
        unit.create.push_all(create);
        let update = order_within(unit.update.take_all(), update_ordering, UpdateOp::depends_on_slot_context);
        unit.update.push_all(update);
    }
    Ok(())
}

fn order_within<T: Op>(ops: Vec<T>, ordering: &[Rule<T>], target_of: fn(&T) -> Option<XrefId>) -> Vec<T> {
    let mut ordered = Vec::with_capacity(ops.len());
    let mut to_order: Vec<T> = Vec::new();
    let mut first_target_in_group: Option<XrefId> = None;

    for op in ops {
        let handled = is_handled(op.kind());
        let current_target = target_of(&op);
        let target_changed = matches!(
            (first_target_in_group, current_target),
            (Some(first), Some(current)) if first != current
        );
        if !handled || target_changed {
            ordered.extend(reorder(std::mem::take(&mut to_order), ordering));
            first_target_in_group = None;
        }
        if handled {
            to_order.push(op);
            first_target_in_group = current_target.or(first_target_in_group);
        } else {
            ordered.push(op);
        }
    }
    ordered.extend(reorder(to_order, ordering));
    ordered
}

/// Ops bound to one element per rule; rarely more than a handful.
type Group<T> = SmallVec<[T; 4]>;

fn reorder<T>(ops: Vec<T>, ordering: &[Rule<T>]) -> Vec<T> {
    let mut groups: Vec<Group<T>> = ordering.iter().map(|_| Group::new()).collect();
    let mut unmatched = Vec::new();
    for op in ops {
        match ordering.iter().position(|rule| (rule.test)(&op)) {
            Some(index) => groups[index].push(op),
            None => unmatched.push(op),
        }
    }
    let mut result = Vec::new();
    for (group, rule) in groups.into_iter().zip(ordering) {
        match rule.transform {
            Some(transform) => result.extend(transform(group.into_vec())),
            None => result.extend(group),
        }
    }
    result.extend(unmatched);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_last_drops_earlier_entries() {
        assert_eq!(keep_last(vec![1, 2, 3]), vec![3]);
        assert!(keep_last(Vec::<u8>::new()).is_empty());
    }
}
