// Views that share one selection
//
// Module structure:
// - mod.rs   ViewAdapter contract, emitter and gesture queue
// - plot.rs  Scatter plot of simulations over two outcomes
// - table.rs Row-per-simulation (or per-field) data table
// - map.rs   Field polygons with point hit-testing

pub mod map;
pub mod plot;
pub mod table;

pub use map::{MapView, PolygonStyle};
pub use plot::{PlotView, PointStyle};
pub use table::{RowKey, TableRow, TableView};

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::ViewError;
use crate::selection::{Highlight, Selection};
use crate::types::ViewId;

/// Capability contract for a linked view.
///
/// Each view registers exactly one gesture handler (its emitter) and maps its
/// own gesture payloads to a `Selection`; there is never a handler per row or
/// per point.
pub trait ViewAdapter {
    fn name(&self) -> &str;

    /// Recompute visual emphasis for `highlight`. Must not reload data and must
    /// be idempotent.
    fn render(&mut self, highlight: &Highlight) -> Result<(), ViewError>;

    /// Called once at registration with the view's emitter.
    fn on_user_select(&mut self, emitter: SelectionEmitter);

    fn as_any(&self) -> &dyn Any;
}

/// A selection emitted by a view, waiting for the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub view: ViewId,
    pub selection: Selection,
}

/// FIFO of gestures. Shared between the coordinator and every emitter.
#[derive(Debug, Clone, Default)]
pub struct GestureQueue {
    inner: Rc<RefCell<VecDeque<Gesture>>>,
}

impl GestureQueue {
    pub fn push(&self, gesture: Gesture) {
        self.inner.borrow_mut().push_back(gesture);
    }

    pub fn pop(&self) -> Option<Gesture> {
        self.inner.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

/// The one handle a view uses to report user selections.
///
/// Muted while its own view is rendering, so a widget that fires its selection
/// event on a programmatic update cannot feed back into the store.
#[derive(Debug, Clone)]
pub struct SelectionEmitter {
    view: ViewId,
    queue: GestureQueue,
    muted: Rc<Cell<bool>>,
}

impl SelectionEmitter {
    pub(crate) fn new(view: ViewId, queue: GestureQueue, muted: Rc<Cell<bool>>) -> Self {
        Self { view, queue, muted }
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    /// Queue `selection`. Returns false (and drops it) while muted.
    pub fn emit(&self, selection: Selection) -> bool {
        if self.muted.get() {
            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "suppressed_emit",
                view = crate::types::KeyToU64::to_u64(self.view),
                kind = selection.kind(),
            );
            return false;
        }
        self.queue.push(Gesture {
            view: self.view,
            selection,
        });
        true
    }
}

/// Shared helper for views holding an optional emitter.
pub(crate) fn emit_via(emitter: &Option<SelectionEmitter>, selection: Selection) -> bool {
    emitter.as_ref().is_some_and(|e| e.emit(selection))
}
