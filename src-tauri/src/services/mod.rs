pub mod acquirer;
pub mod permission;
pub mod predictor;
pub mod session;
