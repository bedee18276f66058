pub mod js_executor;
pub mod listing_view;

pub use js_executor::JsExecutor;
pub use listing_view::{ChromiumListingView, ControlState, ListingView};
