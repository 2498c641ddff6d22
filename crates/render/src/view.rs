use serde::{Deserialize, Serialize};
use tracefall_core::config::Config;
use tracefall_core::error::{Result, TracefallError};
use tracefall_core::format::tooltip_text;
use tracefall_core::layout::compute_layout;
use tracefall_core::model::span::{LayoutSpan, RawSpan, TraceLayout};
use tracing::debug;

use crate::engine::{FrameSummary, RenderContext, hit_test, render};
use crate::scheduler::{RedrawScheduler, SchedulerStats};
use crate::surface::Surface;
use crate::viewport;

/// Capabilities a host framework needs from an embedded view.
pub trait HostView {
    /// Replace the data with a fresh batch.
    fn draw(&mut self, spans: &[RawSpan]);
    /// New batch for an existing view; same semantics as `draw`.
    fn update(&mut self, spans: &[RawSpan]);
    fn clear(&mut self);
    fn resize(&mut self, width: f64, height: f64, pixel_ratio: f64);
    fn save(&self) -> Result<String>;
    fn restore(&mut self, token: &str) -> Result<()>;
    fn handle_input(&mut self, input: InputEvent);
    /// Called once per display refresh. Draws only when a redraw is pending.
    fn frame(&mut self, surface: &mut dyn Surface) -> Option<FrameSummary>;
    fn subscribe(&mut self, listener: Box<dyn FnMut(&ViewEvent)>) -> SubscriptionId;
    fn dispose(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerMove { y: f64 },
    PointerLeave,
    Click { y: f64 },
    Wheel { delta_y: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Selected(LayoutSpan),
    Hover {
        span_id: Option<String>,
        tooltip: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Persisted view state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub selected_span_id: Option<String>,
    pub scroll_offset: f64,
}

type Listener = Box<dyn FnMut(&ViewEvent)>;

/// Owns the current layout and all transient view state.
pub struct WaterfallView {
    config: Config,
    layout: TraceLayout,
    selected: Option<String>,
    hovered: Option<String>,
    scroll_offset: f64,
    width: f64,
    height: f64,
    pixel_ratio: f64,
    scheduler: RedrawScheduler,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    disposed: bool,
}

impl WaterfallView {
    pub fn new(config: Config) -> Self {
        let pixel_ratio = config.pixel_ratio;
        Self {
            config,
            layout: TraceLayout::empty(),
            selected: None,
            hovered: None,
            scroll_offset: 0.0,
            width: 0.0,
            height: 0.0,
            pixel_ratio,
            scheduler: RedrawScheduler::new(),
            listeners: Vec::new(),
            next_subscription: 0,
            disposed: false,
        }
    }

    pub fn layout(&self) -> &TraceLayout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn selected_span_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hovered_span_id(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn selected_span(&self) -> Option<&LayoutSpan> {
        self.selected.as_deref().and_then(|id| self.layout.find(id))
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn needs_redraw(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn context(&self) -> RenderContext<'_> {
        RenderContext {
            layout: &self.layout,
            selected_span_id: self.selected.as_deref(),
            hovered_span_id: self.hovered.as_deref(),
            scroll_offset: self.scroll_offset,
            width: self.width,
            height: self.height,
            pixel_ratio: self.pixel_ratio,
            config: &self.config,
        }
    }

    /// Lay out a new batch and swap it in whole.
    pub fn set_spans(&mut self, spans: &[RawSpan]) {
        if self.disposed {
            return;
        }
        self.layout = compute_layout(spans);
        if self
            .selected
            .as_deref()
            .is_some_and(|id| self.layout.find(id).is_none())
        {
            self.selected = None;
        }
        self.hovered = None;
        self.scroll_offset = self.clamp_scroll(self.scroll_offset);
        debug!(
            spans = self.layout.len(),
            roots = self.layout.roots.len(),
            "view data replaced"
        );
        self.request_redraw();
    }

    pub fn resize(&mut self, width: f64, height: f64, pixel_ratio: f64) {
        if self.disposed {
            return;
        }
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            self.pixel_ratio = pixel_ratio;
        }
        if !self.layout.is_empty() {
            self.scroll_offset = self.clamp_scroll(self.scroll_offset);
        }
        self.request_redraw();
    }

    pub fn max_scroll(&self) -> f64 {
        viewport::max_scroll(
            self.layout.len(),
            self.height,
            self.config.axis_height,
            self.config.row_height,
        )
    }

    pub fn scroll_to(&mut self, offset: f64) {
        if self.disposed {
            return;
        }
        let clamped = self.clamp_scroll(offset);
        if clamped != self.scroll_offset {
            self.scroll_offset = clamped;
            self.request_redraw();
        }
    }

    pub fn scroll_by(&mut self, delta: f64) {
        self.scroll_to(self.scroll_offset + delta);
    }

    /// Track the hovered row; returns its tooltip.
    pub fn pointer_move(&mut self, y: f64) -> Option<String> {
        if self.disposed {
            return None;
        }
        let hit = hit_test(&self.context(), y);
        let span_id = hit.map(|s| s.span.span_id.clone());
        let tooltip = hit.map(|s| tooltip_text(&s.span));
        if span_id != self.hovered {
            self.hovered = span_id.clone();
            self.emit(&ViewEvent::Hover {
                span_id,
                tooltip: tooltip.clone(),
            });
            self.request_redraw();
        }
        tooltip
    }

    pub fn pointer_leave(&mut self) {
        if self.disposed || self.hovered.is_none() {
            return;
        }
        self.hovered = None;
        self.emit(&ViewEvent::Hover {
            span_id: None,
            tooltip: None,
        });
        self.request_redraw();
    }

    /// Select the row under `y`. Clicks outside any row leave the selection
    /// unchanged.
    pub fn click(&mut self, y: f64) -> Option<&LayoutSpan> {
        if self.disposed {
            return None;
        }
        let row = hit_test(&self.context(), y)?.row_index;
        let span = self.layout.spans[row].clone();
        self.selected = Some(span.span.span_id.clone());
        self.emit(&ViewEvent::Selected(span));
        self.request_redraw();
        self.layout.row(row)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ViewEvent) + 'static,
    {
        self.add_listener(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Draw if a redraw is pending.
    pub fn frame<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Option<FrameSummary> {
        if self.disposed || !self.scheduler.take() {
            return None;
        }
        Some(render(&self.context(), surface))
    }

    /// Draw unconditionally, leaving any pending request in place.
    pub fn render_now<S: Surface + ?Sized>(&self, surface: &mut S) -> FrameSummary {
        render(&self.context(), surface)
    }

    pub fn save_state(&self) -> ViewState {
        ViewState {
            selected_span_id: self.selected.clone(),
            scroll_offset: self.scroll_offset,
        }
    }

    /// Apply saved state. Scroll is clamped again when data arrives.
    pub fn restore_state(&mut self, state: ViewState) {
        if self.disposed {
            return;
        }
        self.selected = state.selected_span_id;
        self.scroll_offset = if state.scroll_offset.is_finite() {
            state.scroll_offset.max(0.0)
        } else {
            0.0
        };
        if !self.layout.is_empty() {
            self.scroll_offset = self.clamp_scroll(self.scroll_offset);
        }
        self.request_redraw();
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.scheduler.cancel();
        self.listeners.clear();
        self.layout = TraceLayout::empty();
        self.selected = None;
        self.hovered = None;
        self.disposed = true;
        debug!("view disposed");
    }

    fn add_listener(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        if !self.disposed {
            self.listeners.push((id, listener));
        }
        id
    }

    fn clamp_scroll(&self, offset: f64) -> f64 {
        if !offset.is_finite() {
            return 0.0;
        }
        offset.clamp(0.0, self.max_scroll())
    }

    fn request_redraw(&mut self) {
        self.scheduler.request();
    }

    fn emit(&mut self, event: &ViewEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

impl HostView for WaterfallView {
    fn draw(&mut self, spans: &[RawSpan]) {
        self.set_spans(spans);
    }

    fn update(&mut self, spans: &[RawSpan]) {
        self.set_spans(spans);
    }

    fn clear(&mut self) {
        self.set_spans(&[]);
    }

    fn resize(&mut self, width: f64, height: f64, pixel_ratio: f64) {
        WaterfallView::resize(self, width, height, pixel_ratio);
    }

    fn save(&self) -> Result<String> {
        serde_json::to_string(&self.save_state())
            .map_err(|e| TracefallError::Internal(format!("failed to encode view state: {e}")))
    }

    fn restore(&mut self, token: &str) -> Result<()> {
        let state: ViewState = serde_json::from_str(token)
            .map_err(|e| TracefallError::Parse(format!("invalid view state: {e}")))?;
        self.restore_state(state);
        Ok(())
    }

    fn handle_input(&mut self, input: InputEvent) {
        match input {
            InputEvent::PointerMove { y } => {
                self.pointer_move(y);
            }
            InputEvent::PointerLeave => self.pointer_leave(),
            InputEvent::Click { y } => {
                self.click(y);
            }
            InputEvent::Wheel { delta_y } => self.scroll_by(delta_y),
        }
    }

    fn frame(&mut self, surface: &mut dyn Surface) -> Option<FrameSummary> {
        WaterfallView::frame(self, surface)
    }

    fn subscribe(&mut self, listener: Box<dyn FnMut(&ViewEvent)>) -> SubscriptionId {
        self.add_listener(listener)
    }

    fn dispose(&mut self) {
        WaterfallView::dispose(self);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use testkit::{chain_trace, sample_trace};

    use super::*;
    use crate::engine::EMPTY_MESSAGE;
    use crate::surface::RecordingSurface;

    fn view_with(spans: &[RawSpan]) -> WaterfallView {
        let mut view = WaterfallView::new(Config::default());
        view.resize(1000.0, 400.0, 1.0);
        view.set_spans(spans);
        view
    }

    fn row_y(view: &WaterfallView, row: usize) -> f64 {
        let cfg = view.config();
        cfg.axis_height + cfg.row_height * (row as f64 + 0.5) - view.scroll_offset()
    }

    #[test]
    fn redraws_are_coalesced_per_frame() {
        let mut view = view_with(&sample_trace("t1"));
        view.scroll_by(5.0);
        view.pointer_move(row_y(&view, 0));
        assert!(view.needs_redraw());

        let mut surface = RecordingSurface::new();
        assert!(view.frame(&mut surface).is_some());
        assert!(view.frame(&mut surface).is_none());
        let stats = view.scheduler_stats();
        assert_eq!(stats.frames, 1);
        assert!(stats.coalesced >= 2);
    }

    #[test]
    fn click_selects_row_and_notifies() {
        let mut view = view_with(&sample_trace("t1"));
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        view.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let picked = view.click(row_y(&view, 1)).map(|s| s.span.span_id.clone());
        assert_eq!(picked.as_deref(), Some("cache"));
        assert_eq!(view.selected_span_id(), Some("cache"));

        let events = events.borrow();
        assert!(matches!(&events[0], ViewEvent::Selected(span) if span.span.span_id == "cache"));
    }

    #[test]
    fn click_outside_rows_keeps_selection() {
        let mut view = view_with(&sample_trace("t1"));
        view.click(row_y(&view, 0));
        assert!(view.click(5.0).is_none());
        assert!(view.click(10_000.0).is_none());
        assert_eq!(view.selected_span_id(), Some("root"));
    }

    #[test]
    fn hover_reports_tooltip_once_per_change() {
        let mut view = view_with(&sample_trace("t1"));
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        view.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let y = row_y(&view, 0);
        let tooltip = view.pointer_move(y).unwrap();
        assert_eq!(tooltip, "api: GET /v1/orders\n1.80s");
        view.pointer_move(y + 1.0);
        view.pointer_leave();
        view.pointer_leave();

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            ViewEvent::Hover {
                span_id: None,
                tooltip: None
            }
        );
    }

    #[test]
    fn scroll_is_clamped() {
        let mut view = view_with(&chain_trace("deep", 100));
        view.scroll_by(-50.0);
        assert_eq!(view.scroll_offset(), 0.0);
        view.scroll_by(1e9);
        assert_eq!(view.scroll_offset(), view.max_scroll());
        assert_eq!(view.max_scroll(), 100.0 * 36.0 - (400.0 - 28.0));
    }

    #[test]
    fn new_data_drops_missing_selection() {
        let mut view = view_with(&sample_trace("t1"));
        view.click(row_y(&view, 1));
        view.set_spans(&sample_trace("t2"));
        assert_eq!(view.selected_span_id(), Some("cache"));
        view.set_spans(&chain_trace("other", 3));
        assert_eq!(view.selected_span_id(), None);
    }

    #[test]
    fn save_and_restore_round_trip() {
        let mut view = view_with(&chain_trace("deep", 50));
        view.scroll_to(120.0);
        view.click(row_y(&view, 4));
        let token = HostView::save(&view).unwrap();

        let mut restored = WaterfallView::new(Config::default());
        restored.resize(1000.0, 400.0, 1.0);
        restored.restore(&token).unwrap();
        restored.draw(&chain_trace("deep", 50));
        assert_eq!(restored.scroll_offset(), 120.0);
        assert_eq!(restored.selected_span_id(), view.selected_span_id());
        assert!(restored.restore("{not json").is_err());
    }

    #[test]
    fn restored_scroll_survives_resize_before_data() {
        let mut view = WaterfallView::new(Config::default());
        view.restore(r#"{"selected_span_id":null,"scroll_offset":120.0}"#)
            .unwrap();
        view.resize(1000.0, 400.0, 1.0);
        view.draw(&chain_trace("deep", 50));
        assert_eq!(view.scroll_offset(), 120.0);

        view.resize(1000.0, 2000.0, 1.0);
        assert_eq!(view.scroll_offset(), 0.0);
    }

    #[test]
    fn dispose_cancels_and_detaches() {
        let mut view = view_with(&sample_trace("t1"));
        let hits = Rc::new(RefCell::new(0));
        let sink = hits.clone();
        view.subscribe(move |_| *sink.borrow_mut() += 1);
        assert!(view.needs_redraw());

        view.dispose();
        assert!(!view.needs_redraw());
        assert_eq!(view.listener_count(), 0);
        assert!(view.click(row_y(&view, 0)).is_none());
        let mut surface = RecordingSurface::new();
        assert!(view.frame(&mut surface).is_none());
        view.set_spans(&sample_trace("t1"));
        assert!(view.layout().is_empty());
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn cleared_view_draws_empty_state() {
        let mut view = view_with(&sample_trace("t1"));
        HostView::clear(&mut view);
        let mut surface = RecordingSurface::new();
        let summary = HostView::frame(&mut view, &mut surface).unwrap();
        assert!(summary.empty);
        assert_eq!(surface.texts(), vec![EMPTY_MESSAGE]);
    }

    #[test]
    fn host_input_routes_to_handlers() {
        let mut view = view_with(&sample_trace("t1"));
        let y = row_y(&view, 1);
        view.handle_input(InputEvent::PointerMove { y });
        assert_eq!(view.hovered_span_id(), Some("cache"));
        view.handle_input(InputEvent::Click { y });
        assert_eq!(view.selected_span_id(), Some("cache"));
        view.handle_input(InputEvent::PointerLeave);
        assert_eq!(view.hovered_span_id(), None);
    }
}
