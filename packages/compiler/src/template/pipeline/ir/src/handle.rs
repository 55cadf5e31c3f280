//! IR Handles
//!
//! Identifiers used to link ops and expressions together before slots and
//! consts are known.

use crate::error::{CompilerError, Result};

/// A cross-reference ID. During ingest, `XrefId`s are generated to link together
/// different IR operations which need to reference each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XrefId(pub usize);

impl XrefId {
    pub fn new(id: usize) -> Self {
        XrefId(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Index into the component's consts array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstIndex(pub usize);

impl ConstIndex {
    pub fn new(index: usize) -> Self {
        ConstIndex(index)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// A placeholder for the data slot of the op named by `target`.
///
/// Slot allocation fills in every handle in the job from one xref → slot map, so an op's
/// own handle and the handles of every expression referring to it resolve together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    pub target: XrefId,
    /// The slot number, or `None` if slots have not yet been assigned.
    pub slot: Option<usize>,
}

impl SlotHandle {
    pub fn new(target: XrefId) -> Self {
        SlotHandle { target, slot: None }
    }

    /// The assigned slot. Reading a handle before slot allocation is an internal error.
    pub fn get(&self) -> Result<usize> {
        self.slot.ok_or(CompilerError::UnresolvedSlot(self.target))
    }

    pub fn has_slot(&self) -> bool {
        self.slot.is_some()
    }
}
