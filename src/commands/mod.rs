mod analyze;
mod calibrate;
mod compare;

pub use analyze::run_analyze;
pub use calibrate::run_calibrate;
pub use compare::run_compare;
