pub mod adapters;
pub mod availability;
pub mod models;
pub mod services;

pub use models::*;
pub use services::hybrid::HybridApiService;
