//! Element Utilities
//!
//! Lookups of slot-consuming create ops by the xref they declare.

use indexmap::IndexMap;

use crate::error::{invariant, Result};
use crate::template::pipeline::ir::{CreateOp, OpId, OpList, XrefId};

/// Gets a map of every slot-consuming op in the list (elements, containers, templates,
/// text nodes, ...) by its xref id.
///
/// A `RepeaterCreate` with an `@empty` block is registered under both of its views.
pub fn create_op_xref_map(ops: &OpList<CreateOp>) -> IndexMap<XrefId, OpId> {
    let mut map = IndexMap::new();
    for (id, op) in ops.iter_with_ids() {
        if op.handle().is_none() {
            continue;
        }
        if let Some(xref) = op.xref() {
            map.insert(xref, id);
        }
        if let CreateOp::RepeaterCreate(repeater) = op {
            if let Some(empty_view) = repeater.empty_view {
                map.insert(empty_view, id);
            }
        }
    }
    map
}

/// Look up the element op declaring `xref`, failing if the element is not in the map.
pub fn lookup_element(elements: &IndexMap<XrefId, OpId>, xref: XrefId) -> Result<OpId> {
    match elements.get(&xref) {
        Some(id) => Ok(*id),
        None => invariant(format!("all attributes should have an element-like target, but {:?} has none", xref)),
    }
}
