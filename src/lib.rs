pub mod app;
pub mod config;
pub mod errors;
pub mod goal;
pub mod handlers;
pub mod identity;
pub mod ledger;
pub mod models;
pub mod profile;
pub mod schema;
pub mod shell;
pub mod state;
pub mod store;
pub mod theme;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
