//! Network-facing components of the pipeline: the Mobile Client (spec
//! §4.C, UDP heartbeat + frame receive) and the Desktop Client (spec
//! §4.D, the authenticated full-duplex protocol state machine).

pub mod desktop;
pub mod desktop_wire;
pub mod mobile;
pub mod mobile_wire;
pub mod token;

pub use desktop::{DesktopClient, DesktopStatus, SendFrameError};
pub use mobile::{MobileClient, MobileStatus};
