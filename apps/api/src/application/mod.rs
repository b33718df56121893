pub mod app_error;
pub mod deadline;
pub mod jwt;
pub mod ports;
pub mod use_cases;
pub mod validators;
