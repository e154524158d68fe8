pub mod throttle;
pub mod validation;
