mod filter;
mod layout;
mod style;

pub use filter::{ViewFilter, WorkingView, compute_working_view};
pub use layout::{LayoutMode, Pin, TimeScale, Viewport, apply_layout};
pub use style::{NodeStyle, derive_styles};
