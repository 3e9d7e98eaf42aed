//! Microsoft To Do task creation.

mod schedule;
mod submitter;

pub use schedule::{ReminderSchedule, DUE_HOUR};
pub use submitter::{TaskSubmitter, DEFAULT_GRAPH_BASE_URL, DEFAULT_TIME_ZONE, PARETO_CATEGORY};
