//! UI module for step-log output
//!
//! Plain `[OK]`/`[WARN]` lines on CI workers; spinners and byte progress in
//! an interactive terminal.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    key_value, outro_success, outro_warn, remark, section, step_info, step_ok, step_warn,
};
pub use progress::{DownloadProgress, TaskSpinner};
