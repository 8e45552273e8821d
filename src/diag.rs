//! Diagnostics reported by the pipeline's degraded-but-deterministic paths.
//!
//! The layout never fails for quality reasons; when it settles for a
//! best-effort result it reports what happened through an injected sink so
//! callers (and tests) can observe the degradation without branching on it.

use std::cell::RefCell;

/// A non-fatal degradation event.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEvent {
    /// Force relaxation hit the iteration cap before the displacement fell
    /// under the convergence epsilon; the last state was kept.
    PlacementNotConverged { iterations: usize, residual: f32 },
    /// Every candidate path for this edge scored above the acceptable
    /// threshold; the cheapest one was used anyway.
    RouteOverBudget { edge: String, score: f32 },
    /// No collision-free label position existed; the minimum-overlap
    /// candidate was used.
    LabelFallback { owner: String, overlap_area: f32 },
}

pub trait DiagnosticsSink {
    fn report(&self, event: LayoutEvent);
}

/// Discards every event. The default for engines built via `Default`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn report(&self, _event: LayoutEvent) {}
}

/// Forwards events to the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn report(&self, event: LayoutEvent) {
        match event {
            LayoutEvent::PlacementNotConverged {
                iterations,
                residual,
            } => log::debug!(
                "placement stopped at iteration cap {iterations} (residual {residual:.3})"
            ),
            LayoutEvent::RouteOverBudget { edge, score } => {
                log::debug!("edge {edge} routed over budget (score {score:.1})")
            }
            LayoutEvent::LabelFallback {
                owner,
                overlap_area,
            } => log::warn!(
                "label for {owner} placed with overlap {overlap_area:.1} (no free position)"
            ),
        }
    }
}

/// Captures events for inspection. Test helper.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<LayoutEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LayoutEvent> {
        self.events.borrow().clone()
    }

    pub fn label_fallbacks(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, LayoutEvent::LabelFallback { .. }))
            .count()
    }
}

impl DiagnosticsSink for RecordingSink {
    fn report(&self, event: LayoutEvent) {
        self.events.borrow_mut().push(event);
    }
}
