//! HTTP handlers, grouped by domain.

pub mod analysis;
pub mod assignment;
pub mod events;
pub mod experiments;
pub mod health;
pub mod router;
pub mod state;

pub use router::build_routes;
pub use state::{AppContext, AppState};
