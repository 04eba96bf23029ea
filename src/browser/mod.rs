//! Browser automation layer.
//!
//! The extraction engine only talks to the [`Page`] trait; [`CdpPage`] is the
//! production implementation that attaches to an already running Chromium.

mod cdp;
mod driver;

pub use cdp::CdpPage;
pub use driver::{DriverError, ElementHandle, Page, WaitState};
