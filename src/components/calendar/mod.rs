pub mod adapter;
pub mod aggregator;
pub mod models;
pub mod view;

pub use adapter::CalendarAdapter;
pub use aggregator::{Calendar, CalendarAggregator};
pub use models::{calcode, local_id, Event};
pub use view::{EventSource, FilteredView, Neighbours};
