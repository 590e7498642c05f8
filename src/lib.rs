pub mod adapters;
pub mod controller;
pub mod domain;
pub mod infrastructure;
pub mod services;
pub mod topology;

pub use controller::Controller;
pub use domain::errors::{ControllerError, DomainError, DomainResult};
pub use domain::models::Config;
