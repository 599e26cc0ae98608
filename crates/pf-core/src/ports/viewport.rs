use crate::feed::PageElementId;

/// Visibility callbacks supplied to the rendering layer.
///
/// Called synchronously from the renderer; implementations must not block.
pub trait ViewportObserverPort: Send + Sync {
    fn on_enter_view(&self, id: PageElementId);

    fn on_leave_view(&self, id: PageElementId);
}
