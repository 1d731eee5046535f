pub mod command;
pub mod config;
pub mod motion;
pub mod registry;
pub mod rig;
pub mod session;

mod error;

#[cfg(test)]
mod tests;

pub use command::{DriverCommand, DriverOp, format_command};
pub use error::{Error, ErrorKind, Result, TransportError};
pub use motion::{MotionController, MoveOutcome, parse_angle, relative_target};
pub use registry::HardwareRegistry;
pub use rig::Rig;
pub use session::{CommandOutput, GuardedSession, RemoteSession, SshAuth, SshSession, SshTarget};

pub use rigctl_types::*;
