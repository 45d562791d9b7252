pub mod api;
pub mod config;
pub mod error;
pub mod marker;
pub mod models;
pub mod recent;
pub mod session;

pub use config::AppConfig;
pub use session::SessionController;
