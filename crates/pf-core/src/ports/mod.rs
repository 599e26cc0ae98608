//! Port interfaces for the application layer
//!
//! Ports define the contract between the pagination use cases and the
//! collaborators around them: the paged query source, the rendering layer and
//! the clock. Infrastructure and the binary provide the implementations.

mod clock;
mod item_renderer;
mod paged_source;
mod viewport;

pub use clock::ClockPort;
pub use item_renderer::ItemRendererPort;
pub use paged_source::PagedQuerySourcePort;
pub use viewport::ViewportObserverPort;
