//! A connected camera rig: one session, the registry loaded through it, and
//! the motion controller that drives it.
//!
//! All remote work goes through the single [`GuardedSession`] owned here, and
//! the registry is dropped together with the session on [`Rig::disconnect`].

use crate::config::Config;
use crate::motion::{MotionController, MoveOutcome};
use crate::registry::HardwareRegistry;
use crate::session::{GuardedSession, RemoteSession, SshSession};
use crate::Result;
use rigctl_types::{Direction, Motor};
use tracing::{info, warn};

pub struct Rig<S> {
    session: GuardedSession<S>,
    registry: HardwareRegistry,
    motion: MotionController,
    step_degrees: f64,
}

impl Rig<SshSession> {
    /// Connect over SSH using `config` and load the hardware registry.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for invalid settings, a transport error if the
    /// connection fails, and the errors of [`HardwareRegistry::load`].
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let target = config.ssh_target()?;
        let session = SshSession::connect(target).await?;
        Self::open(session, config).await
    }
}

impl<S: RemoteSession> Rig<S> {
    /// Take ownership of an established session and load the registry.
    ///
    /// The session is closed if the registry cannot be loaded.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for invalid settings and the errors of
    /// [`HardwareRegistry::load`].
    pub async fn open(session: S, config: &Config) -> Result<Self> {
        config.validate()?;

        let session = GuardedSession::new(session, config.connection.command_timeout());
        let registry = match HardwareRegistry::load(&session, &config.driver.registry_path).await {
            Ok(registry) => registry,
            Err(e) => {
                if let Err(close_err) = session.disconnect().await {
                    warn!("Failed to close session after registry error: {close_err}");
                }
                return Err(e);
            }
        };

        let motion = MotionController::new(config.driver.path.clone())
            .with_home_angle(config.motion.home_angle);

        Ok(Self {
            session,
            registry,
            motion,
            step_degrees: config.motion.step_degrees,
        })
    }

    #[must_use]
    pub fn session(&self) -> &GuardedSession<S> {
        &self.session
    }

    #[must_use]
    pub fn motion(&self) -> &MotionController {
        &self.motion
    }

    #[must_use]
    pub fn registry(&self) -> &HardwareRegistry {
        &self.registry
    }

    /// Default step for relative moves.
    #[must_use]
    pub fn step_degrees(&self) -> f64 {
        self.step_degrees
    }

    /// Move one motor; `degrees` falls back to the configured step.
    ///
    /// # Errors
    ///
    /// See [`MotionController::move_motor`].
    pub async fn move_motor(
        &self,
        motor: Motor,
        direction: Direction,
        degrees: Option<f64>,
    ) -> Result<MoveOutcome> {
        let degrees = degrees.unwrap_or(self.step_degrees);
        self.motion
            .move_motor(&self.session, motor, direction, degrees)
            .await
    }

    /// Move the camera along the axis implied by `direction`.
    ///
    /// # Errors
    ///
    /// See [`MotionController::nudge`].
    pub async fn nudge(&self, direction: Direction, degrees: Option<f64>) -> Result<Vec<MoveOutcome>> {
        let degrees = degrees.unwrap_or(self.step_degrees);
        self.motion.nudge(&self.session, direction, degrees).await
    }

    /// # Errors
    ///
    /// See [`MotionController::home`].
    pub async fn home(&self) -> Result<Vec<MoveOutcome>> {
        self.motion.home(&self.session).await
    }

    /// # Errors
    ///
    /// See [`MotionController::query_position`].
    pub async fn query_position(&self, motor: Motor) -> Result<f64> {
        self.motion.query_position(&self.session, motor).await
    }

    /// # Errors
    ///
    /// See [`MotionController::initialize`].
    pub async fn initialize(&self) -> Result<()> {
        self.motion.initialize(&self.session).await
    }

    /// # Errors
    ///
    /// See [`MotionController::driver_status`].
    pub async fn driver_status(&self) -> Result<bool> {
        self.motion.driver_status(&self.session).await
    }

    /// Set a device's simulation flag and upload the whole document.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownDevice` without touching the network, or a
    /// transport error from the upload. After a failed upload the local flag
    /// keeps the new value and the remote file is in whatever state the
    /// transfer left it.
    pub async fn set_simulation_mode(&mut self, name: &str, enabled: bool) -> Result<()> {
        self.registry.set_simulation_mode(name, enabled)?;
        self.registry.persist(&self.session).await
    }

    /// Flip a device's simulation flag, upload, and return the new value.
    ///
    /// # Errors
    ///
    /// Same as [`Rig::set_simulation_mode`].
    pub async fn toggle_simulation_mode(&mut self, name: &str) -> Result<bool> {
        let enabled = self.registry.toggle_simulation_mode(name)?;
        self.registry.persist(&self.session).await?;
        Ok(enabled)
    }

    /// Replace the in-memory registry with a fresh download.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`HardwareRegistry::load`]; the previous registry
    /// is kept on failure.
    pub async fn reload_registry(&mut self) -> Result<()> {
        let path = self.registry.remote_path().to_string();
        self.registry = HardwareRegistry::load(&self.session, &path).await?;
        Ok(())
    }

    /// Close the session. The registry goes with it.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the session does not close cleanly.
    pub async fn disconnect(self) -> Result<()> {
        self.session.disconnect().await?;
        info!("Rig disconnected");
        Ok(())
    }
}
