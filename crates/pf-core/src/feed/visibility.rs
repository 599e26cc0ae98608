//! Viewport visibility.
//!
//! The rendering layer reports enter/leave transitions for the container of
//! each rendered page. A container is "in view" while it spans the vertical
//! midpoint of the viewport, so normally one page is in view at a time; during
//! a boundary crossing two may briefly overlap and the latest entry wins.

use super::model::PageNumber;

/// Rendered container holding the items of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageElementId(pub PageNumber);

impl PageElementId {
    pub fn page(self) -> PageNumber {
        self.0
    }
}

/// Turns enter/leave callbacks into the page that should be current.
#[derive(Debug, Default)]
pub struct VisibilityTracker {
    // Entry order; the last element is dominant.
    in_view: Vec<PageElementId>,
}

impl VisibilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an enter transition and returns the page that became dominant.
    pub fn on_enter_view(&mut self, id: PageElementId) -> Option<PageNumber> {
        self.in_view.retain(|existing| *existing != id);
        self.in_view.push(id);
        Some(id.page())
    }

    /// Records a leave transition.
    ///
    /// Returns the page that takes over when the dominant element left while
    /// another one is still in view.
    pub fn on_leave_view(&mut self, id: PageElementId) -> Option<PageNumber> {
        let was_dominant = self.in_view.last() == Some(&id);
        self.in_view.retain(|existing| *existing != id);
        if was_dominant {
            self.dominant()
        } else {
            None
        }
    }

    pub fn dominant(&self) -> Option<PageNumber> {
        self.in_view.last().map(|id| id.page())
    }

    /// Forgets every element, used when the rendered list is rebuilt.
    pub fn clear(&mut self) {
        self.in_view.clear();
    }
}

/// Midpoint-band rule for renderers without an intersection observer.
///
/// Equivalent to an observer with root margin `-50% 0px -50% 0px`: the element
/// is in view when its `[top, bottom)` span contains the viewport midpoint.
pub fn crosses_midpoint(
    element_top: f64,
    element_bottom: f64,
    viewport_top: f64,
    viewport_height: f64,
) -> bool {
    let midpoint = viewport_top + viewport_height / 2.0;
    element_top <= midpoint && midpoint < element_bottom
}
