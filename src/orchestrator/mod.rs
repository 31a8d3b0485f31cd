//! Application-level orchestration utilities.
//!
//! This module owns load and geocode lifecycle control and post-load processing
//! such as exports. UI/CLI layers call into this module to keep responsibilities
//! separated.

mod controller;
mod post_process;

pub use controller::{run_controller, ControllerCtx, UiCommand};
pub use post_process::{process_load_completion, ExportTargets};
