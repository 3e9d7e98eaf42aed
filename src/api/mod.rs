//! HTTP API for Pareto To Do.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/pareto/generate` - Start a run: goal in, generated tasks out
//! - `POST /api/pareto/create` - Begin device-code sign-in for the tasks
//! - `POST /api/pareto/continue` - Check sign-in (or wait with `{"wait": true}`), then create the tasks
//! - `POST /api/pareto/cancel` - Abandon the pending sign-in
//! - `GET /api/pareto/state` - Current run state

mod pareto;
mod routes;
pub mod types;

pub use routes::{router, serve, AppState, RunHandle};
pub use types::*;
