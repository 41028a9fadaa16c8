//! Control panel context

mod form;
mod panel;

pub use form::SettingsForm;
pub use panel::{format_reduction, ControlPanel, TabCapture};
