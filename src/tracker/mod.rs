//! Detection, location and correspondence, and the drivers that run them.

pub mod correspondence;
pub mod detection;
pub mod feature_tracker;
pub mod locator;
pub mod threshold;

pub use feature_tracker::FeatureTracker;
pub use threshold::ThresholdTracker;
