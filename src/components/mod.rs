// Export components
pub mod announcer;
pub mod calendar;

// Re-export the aggregator and announcer entry points
pub use announcer::Announcer;
pub use calendar::aggregator::CalendarAggregator;
