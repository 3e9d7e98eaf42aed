//! Task module - parsed task records, submission results, and the parser
//! that turns completion text into records.

mod parser;
mod record;

pub use parser::{parse_tasks, render_tasks};
pub use record::{SubmissionOutcome, TaskError, TaskRecord, TaskSubmissionResult};
