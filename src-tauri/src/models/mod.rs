pub mod capture_types;
pub mod predict_types;
