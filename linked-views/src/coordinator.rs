//! Wires views to the selection store.
//!
//! Data flow for one gesture:
//! 1. A view's emitter queues a `Selection`
//! 2. `process_pending` takes it, validates it against the dataset
//! 3. The store is written, which synchronously notifies the render observer
//! 4. The observer translates the selection to a `Highlight` and renders every view
//!
//! The whole sequence finishes before the next queued gesture is taken.

use serde::Serialize;
use slotmap::SlotMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::bucket::Bucket;
use crate::config::LinkConfig;
use crate::dataset::Dataset;
use crate::error::{LinkError, ViewError};
use crate::selection::{Highlight, Selection};
use crate::store::{SelectionChange, SelectionSource, SelectionStore};
use crate::types::{ObserverId, Revision, ViewId};
use crate::views::{
    GestureQueue, MapView, PlotView, SelectionEmitter, TableView, ViewAdapter,
};

/// Outcome of one render-all pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderReport {
    pub rendered: usize,
    pub failures: Vec<ViewError>,
}

impl RenderReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub revision: Revision,
    pub report: RenderReport,
}

// ============================================================================
// ViewRegistry - Views plus the mute flag behind each emitter
// ============================================================================

struct ViewSlot {
    view: Box<dyn ViewAdapter>,
    muted: Rc<Cell<bool>>,
}

#[derive(Default)]
struct ViewRegistry {
    slots: SlotMap<ViewId, ViewSlot>,
    last_report: RenderReport,
}

impl ViewRegistry {
    /// Render one view with its emitter muted. Errors are returned, not raised.
    fn render_one(slot: &mut ViewSlot, highlight: &Highlight) -> Result<(), ViewError> {
        slot.muted.set(true);
        let result = slot.view.render(highlight);
        slot.muted.set(false);
        result
    }

    /// Render every view; one view failing never stops the rest.
    fn render_all(&mut self, highlight: &Highlight) {
        let mut report = RenderReport::default();
        for slot in self.slots.values_mut() {
            match Self::render_one(slot, highlight) {
                Ok(()) => report.rendered += 1,
                Err(err) => {
                    #[cfg(feature = "instrument")]
                    tracing::warn!(
                        target: "render_failure",
                        view = err.view.as_str(),
                        message = err.message.as_str(),
                    );
                    report.failures.push(err);
                }
            }
        }

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "render",
            rendered = report.rendered as u64,
            failed = report.failures.len() as u64,
            highlighted_simulations = highlight.simulations.len() as u64,
            highlighted_fields = highlight.fields.len() as u64,
        );

        self.last_report = report;
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Handles of the three built-in views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedViewIds {
    pub plot: ViewId,
    pub table: ViewId,
    pub map: ViewId,
}

pub struct Coordinator {
    dataset: Rc<Dataset>,
    config: LinkConfig,
    store: SelectionStore,
    views: Rc<RefCell<ViewRegistry>>,
    queue: GestureQueue,
    render_observer: ObserverId,
    registration_failures: Vec<ViewError>,
}

impl Coordinator {
    pub fn new(dataset: Dataset, config: LinkConfig) -> Result<Self, LinkError> {
        config.validate()?;

        let dataset = Rc::new(dataset);
        let views: Rc<RefCell<ViewRegistry>> = Rc::default();
        let mut store = SelectionStore::new();

        let render_observer = {
            let dataset = dataset.clone();
            let views = views.clone();
            let scheme = config.buckets;
            let granularity = config.granularity;
            store.subscribe(move |change: &SelectionChange| {
                let highlight =
                    Highlight::resolve(&change.current, &dataset, &scheme, granularity);
                views.borrow_mut().render_all(&highlight);
            })
        };

        Ok(Self {
            dataset,
            config,
            store,
            views,
            queue: GestureQueue::default(),
            render_observer,
            registration_failures: Vec::new(),
        })
    }

    /// Coordinator with the plot, table and map views already registered.
    pub fn with_default_views(
        dataset: Dataset,
        config: LinkConfig,
    ) -> Result<(Self, LinkedViewIds), LinkError> {
        let mut coordinator = Self::new(dataset, config)?;
        let (plot, table, map) = {
            let ds = &coordinator.dataset;
            let cfg = &coordinator.config;
            (
                PlotView::new(ds, &cfg.plot),
                TableView::new(ds, &cfg.buckets, cfg.granularity, &cfg.table),
                MapView::new(ds, &cfg.map),
            )
        };
        let ids = LinkedViewIds {
            plot: coordinator.register(Box::new(plot)),
            table: coordinator.register(Box::new(table)),
            map: coordinator.register(Box::new(map)),
        };
        Ok((coordinator, ids))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn selection(&self) -> &Selection {
        self.store.get()
    }

    pub fn revision(&self) -> Revision {
        self.store.revision()
    }

    /// Current selection at the configured granularity.
    pub fn highlight(&self) -> Highlight {
        Highlight::resolve(
            self.store.get(),
            &self.dataset,
            &self.config.buckets,
            self.config.granularity,
        )
    }

    // === Views ===

    /// Register a view: hand it its emitter, then render it once with the
    /// current selection. A failed first render keeps the view registered and
    /// is recorded in `registration_failures`.
    pub fn register(&mut self, view: Box<dyn ViewAdapter>) -> ViewId {
        let highlight = self.highlight();
        let mut registry = self.views.borrow_mut();
        let muted = Rc::new(Cell::new(false));
        let id = registry.slots.insert(ViewSlot {
            view,
            muted: muted.clone(),
        });

        let slot = &mut registry.slots[id];
        slot.view
            .on_user_select(SelectionEmitter::new(id, self.queue.clone(), muted));
        if let Err(err) = ViewRegistry::render_one(slot, &highlight) {
            #[cfg(feature = "instrument")]
            tracing::warn!(
                target: "render_failure",
                view = err.view.as_str(),
                message = err.message.as_str(),
            );
            self.registration_failures.push(err);
        }
        id
    }

    /// First-render failures of registered views, oldest first. Dispatch
    /// reports never include these.
    pub fn registration_failures(&self) -> &[ViewError] {
        &self.registration_failures
    }

    /// Remove a view. Its emitter stays valid but nothing will render it again.
    pub fn unregister(&mut self, id: ViewId) -> Option<Box<dyn ViewAdapter>> {
        self.views.borrow_mut().slots.remove(id).map(|slot| slot.view)
    }

    pub fn view_count(&self) -> usize {
        self.views.borrow().slots.len()
    }

    /// Borrow a registered view as its concrete type.
    pub fn with_view<V: 'static, R>(&self, id: ViewId, f: impl FnOnce(&V) -> R) -> Option<R> {
        let registry = self.views.borrow();
        let view = registry.slots.get(id)?.view.as_any().downcast_ref::<V>()?;
        Some(f(view))
    }

    // === Selection writes ===

    /// Validate and store `selection`, rendering every view.
    ///
    /// A selection naming unknown ids is logged and rejected; the previous
    /// selection stays active.
    pub fn dispatch(
        &mut self,
        source: SelectionSource,
        selection: Selection,
    ) -> Result<DispatchOutcome, LinkError> {
        if let Err(err) = selection.validate(&self.dataset) {
            #[cfg(feature = "instrument")]
            tracing::warn!(
                target: "ignored_selection",
                source = %source,
                kind = selection.kind(),
                reason = %err,
            );
            return Err(err);
        }

        let revision = self.store.set(selection, source);
        let report = std::mem::take(&mut self.views.borrow_mut().last_report);
        Ok(DispatchOutcome { revision, report })
    }

    /// Drain queued gestures, each running to completion before the next.
    /// Rejected gestures are skipped.
    pub fn process_pending(&mut self) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::new();
        while let Some(gesture) = self.queue.pop() {
            if let Ok(outcome) =
                self.dispatch(SelectionSource::View(gesture.view), gesture.selection)
            {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    pub fn pending_gestures(&self) -> usize {
        self.queue.len()
    }

    /// Host-shell entry point for the bucket radio buttons.
    pub fn select_bucket(&mut self, name: &str) -> Result<DispatchOutcome, LinkError> {
        let bucket = match Bucket::from_name(name) {
            Ok(bucket) => bucket,
            Err(err) => {
                #[cfg(feature = "instrument")]
                tracing::warn!(
                    target: "ignored_selection",
                    source = "shell",
                    kind = "bucket",
                    reason = %err,
                );
                return Err(err);
            }
        };
        self.dispatch(SelectionSource::Shell, Selection::Bucket(bucket))
    }

    /// Explicit reset: clears the selection and every view's highlighting.
    pub fn reset(&mut self) -> DispatchOutcome {
        let revision = self.store.clear();
        let report = std::mem::take(&mut self.views.borrow_mut().last_report);
        DispatchOutcome { revision, report }
    }

    /// Attach an extra observer (e.g. the browser host) to the store.
    pub fn subscribe(
        &mut self,
        observer: impl FnMut(&SelectionChange) + 'static,
    ) -> ObserverId {
        self.store.subscribe(observer)
    }

    /// The coordinator's own render observer cannot be removed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        if id == self.render_observer {
            return false;
        }
        self.store.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SimulationId;

    #[test]
    fn register_renders_current_selection() {
        let ds = Dataset::synthetic(1, 9, 2);
        let mut coordinator = Coordinator::new(ds, LinkConfig::default()).unwrap();
        coordinator
            .dispatch(SelectionSource::Shell, Selection::simulations([SimulationId(3)]))
            .unwrap();

        let plot = PlotView::new(coordinator.dataset(), &coordinator.config().plot);
        let id = coordinator.register(Box::new(plot));
        let selected: Vec<_> = coordinator
            .with_view(id, |p: &PlotView| p.selected().collect())
            .unwrap();
        assert_eq!(selected, vec![SimulationId(3)]);
    }

    #[test]
    fn with_view_rejects_wrong_type() {
        let (coordinator, ids) =
            Coordinator::with_default_views(Dataset::synthetic(1, 4, 1), LinkConfig::default())
                .unwrap();
        assert!(coordinator.with_view(ids.plot, |_: &MapView| ()).is_none());
        assert!(coordinator.with_view(ids.map, |_: &MapView| ()).is_some());
    }

    #[test]
    fn render_observer_cannot_be_unsubscribed() {
        let mut coordinator =
            Coordinator::new(Dataset::synthetic(1, 4, 1), LinkConfig::default()).unwrap();
        let render = coordinator.render_observer;
        assert!(!coordinator.unsubscribe(render));
        let extra = coordinator.subscribe(|_| {});
        assert!(coordinator.unsubscribe(extra));
        assert_eq!(coordinator.store().observer_count(), 1);
    }

    #[test]
    fn unregistered_view_is_not_rendered() {
        let (mut coordinator, ids) =
            Coordinator::with_default_views(Dataset::synthetic(1, 4, 1), LinkConfig::default())
                .unwrap();
        assert!(coordinator.unregister(ids.table).is_some());
        let outcome = coordinator.reset();
        assert_eq!(outcome.report.rendered, 2);
        assert_eq!(coordinator.view_count(), 2);
    }
}
