//! Session-scoped selection state with a synchronous observer list.

use serde::Serialize;
use slotmap::SlotMap;
use std::fmt;

use crate::selection::Selection;
use crate::types::{KeyToU64, ObserverId, Revision, ViewId};

/// Who wrote a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// A gesture on a registered view.
    View(ViewId),
    /// The host UI shell (bucket radio buttons, slider, API call).
    Shell,
    /// Explicit reset.
    Reset,
}

impl fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionSource::View(id) => write!(f, "view:{}", id.to_u64()),
            SelectionSource::Shell => f.write_str("shell"),
            SelectionSource::Reset => f.write_str("reset"),
        }
    }
}

impl Serialize for SelectionSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionChange {
    pub revision: Revision,
    pub previous: Selection,
    pub current: Selection,
    pub source: SelectionSource,
}

pub type Observer = Box<dyn FnMut(&SelectionChange)>;

pub struct SelectionStore {
    current: Selection,
    revision: Revision,
    observers: SlotMap<ObserverId, Observer>,
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionStore")
            .field("current", &self.current)
            .field("revision", &self.revision)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SelectionStore {
    /// Starts empty at revision 0.
    pub fn new() -> Self {
        Self {
            current: Selection::None,
            revision: Revision::default(),
            observers: SlotMap::with_key(),
        }
    }

    pub fn get(&self) -> &Selection {
        &self.current
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Replace the selection, then notify every observer before returning.
    ///
    /// Every call notifies, including re-setting an identical or empty
    /// selection: an empty selection means "clear", never "no-op".
    pub fn set(&mut self, selection: Selection, source: SelectionSource) -> Revision {
        let previous = std::mem::replace(&mut self.current, selection);
        self.revision = self.revision.next();

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "selection",
            revision = self.revision.0,
            kind = self.current.kind(),
            size = self.current.len() as u64,
            source = %source,
        );

        let change = SelectionChange {
            revision: self.revision,
            previous,
            current: self.current.clone(),
            source,
        };
        for observer in self.observers.values_mut() {
            observer(&change);
        }
        self.revision
    }

    pub fn clear(&mut self) -> Revision {
        self.set(Selection::None, SelectionSource::Reset)
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&SelectionChange) + 'static) -> ObserverId {
        self.observers.insert(Box::new(observer))
    }

    /// Returns false if the observer was already gone.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id).is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}
