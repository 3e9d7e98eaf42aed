//! # Pareto To Do
//!
//! Turns a goal into 3-5 high-leverage tasks with a chat-completion model and
//! creates them in Microsoft To Do.
//!
//! ## Task Flow
//! 1. Request a completion for the goal and parse the numbered task list
//! 2. Wait for the caller to confirm, then start a device-code sign-in
//! 3. Poll until the user signs in on another device
//! 4. Create every task with a due date and reminder, reporting each result
//!
//! ## Modules
//! - `llm`: Chat-completion client
//! - `task`: Task records and the completion parser
//! - `oauth`: Device-code sign-in
//! - `todo`: Task creation in Microsoft To Do
//! - `pipeline`: State machine tying the steps together
//! - `api`: HTTP server

pub mod api;
pub mod config;
pub mod llm;
pub mod oauth;
pub mod pipeline;
pub mod task;
pub mod todo;

#[cfg(test)]
mod test_support;

pub use config::Config;
