pub mod subject_detector;
pub mod subject_locator;
pub mod subject_override;
pub mod subject_tracker;
