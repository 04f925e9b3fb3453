//! Filepath: src/change.rs
//!
//! List change notification.
//!
//! Independent of the structural [`observer`](crate::observer) protocol, a
//! tree can carry two hooks describing changes in list terms:
//!
//! - *changing*: called before a mutation is applied with the affected
//!   index, the net size change and any new items. Returning an error vetoes
//!   the mutation, which then has no effect.
//! - *size changed*: called after a mutation with a nonzero net size change.
//!
//! Hooks belong to one tree; clones start without them.

use std::fmt as StdFmt;

use crate::tree::TreeError;

/// Kind of list change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeAction {
    /// Positions inserted.
    Add,
    /// Positions removed.
    Remove,
    /// Existing positions overwritten; size unchanged.
    Replace,
    /// Every position removed.
    Clear,
}

/// A pending change, as seen by the changing hook.
#[derive(Debug)]
pub struct ListChange<'a, T> {
    /// What kind of change this is.
    pub action: ChangeAction,
    /// First affected index.
    pub index: usize,
    /// Net change in length.
    pub size_change: isize,
    /// Items being stored, where they are known up front. Bulk grafts and
    /// space insertion report an empty slice.
    pub new_items: &'a [T],
}

/// Hook run before a change; an `Err` vetoes it.
pub type ListChangingFn<T> =
    Box<dyn FnMut(&ListChange<'_, T>) -> Result<(), TreeError> + Send + Sync>;

/// Hook run after a change with the net size delta.
pub type SizeChangedFn = Box<dyn FnMut(isize) + Send + Sync>;

/// The hooks attached to one tree.
pub struct ChangeHooks<T> {
    changing: Option<ListChangingFn<T>>,
    size_changed: Option<SizeChangedFn>,
}

impl<T> Default for ChangeHooks<T> {
    fn default() -> Self {
        Self {
            changing: None,
            size_changed: None,
        }
    }
}

impl<T> StdFmt::Debug for ChangeHooks<T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("ChangeHooks")
            .field("changing", &self.changing.is_some())
            .field("size_changed", &self.size_changed.is_some())
            .finish()
    }
}

impl<T> ChangeHooks<T> {
    pub(crate) fn set_changing(&mut self, hook: Option<ListChangingFn<T>>) {
        self.changing = hook;
    }

    pub(crate) fn set_size_changed(&mut self, hook: Option<SizeChangedFn>) {
        self.size_changed = hook;
    }

    /// Run the changing hook, if any.
    pub(crate) fn before(
        &mut self,
        action: ChangeAction,
        index: usize,
        size_change: isize,
        new_items: &[T],
    ) -> Result<(), TreeError> {
        match self.changing.as_mut() {
            Some(hook) => hook(&ListChange {
                action,
                index,
                size_change,
                new_items,
            }),
            None => Ok(()),
        }
    }

    /// Run the size hook for a nonzero delta.
    pub(crate) fn after(&mut self, size_change: isize) {
        if size_change == 0 {
            return;
        }
        if let Some(hook) = self.size_changed.as_mut() {
            hook(size_change);
        }
    }
}

/// Convert a length to a signed delta, saturating.
#[must_use]
#[inline]
pub(crate) fn delta(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}
