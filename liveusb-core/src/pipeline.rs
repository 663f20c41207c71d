//! Sequences the install stages and owns the session state.
//!
//! The pipeline is strictly linear:
//!
//! ```text
//! Start -> DeviceSelected -> FilesystemVerified -> ImageSelected
//!       -> Extracted -> ConfigRewritten -> BootloaderInstalled
//! ```
//!
//! The first failing stage moves the session to [`InstallState::Failed`] and
//! stops the run. Nothing is rolled back: the volume keeps whatever the last
//! completed stage left on it, and the operator is expected to fix the cause
//! and run again.
use crate::command::CommandRunner;
use crate::config::InstallConfig;
use crate::error::InstallError;
use crate::platform::VolumeHost;
use crate::select::Chooser;
use crate::volume::{FilesystemInfo, ImageFile, RemovableVolume};
use crate::{bootcfg, bootloader, catalog, extract, filesystem, image};
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Where a session is in the install.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstallState {
    #[default]
    Start,
    DeviceSelected,
    FilesystemVerified,
    ImageSelected,
    Extracted,
    ConfigRewritten,
    BootloaderInstalled,
    Failed,
}

impl InstallState {
    /// What the pipeline does to reach this state.
    pub fn action(self) -> &'static str {
        match self {
            Self::Start => "Starting",
            Self::DeviceSelected => "Detecting removable devices",
            Self::FilesystemVerified => "Verifying filesystem",
            Self::ImageSelected => "Locating disc image",
            Self::Extracted => "Extracting image",
            Self::ConfigRewritten => "Writing boot configuration",
            Self::BootloaderInstalled => "Installing bootloader",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::BootloaderInstalled | Self::Failed)
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::DeviceSelected => "device selected",
            Self::FilesystemVerified => "filesystem verified",
            Self::ImageSelected => "image selected",
            Self::Extracted => "image extracted",
            Self::ConfigRewritten => "boot configuration rewritten",
            Self::BootloaderInstalled => "bootloader installed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Progress reported to the front-end while the pipeline runs.
#[derive(Clone, Debug, PartialEq)]
pub enum InstallEvent {
    /// Work toward this state is starting.
    Entering(InstallState),
    /// This state has been reached.
    Reached(InstallState),
    /// Something the operator should know about that does not stop the run.
    Warning(String),
    /// The run stopped; `last_completed` is the last state reached.
    Failed { last_completed: InstallState },
}

/// The state of one install run.
#[derive(Clone, Debug, Default)]
pub struct InstallSession {
    state: InstallState,
    last_completed: InstallState,
    volume: Option<RemovableVolume>,
    filesystem: Option<FilesystemInfo>,
    image: Option<ImageFile>,
}

impl InstallSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    /// The last state reached before a failure, or the current state.
    pub fn last_completed(&self) -> InstallState {
        self.last_completed
    }

    pub fn volume(&self) -> Option<&RemovableVolume> {
        self.volume.as_ref()
    }

    pub fn filesystem(&self) -> Option<&FilesystemInfo> {
        self.filesystem.as_ref()
    }

    pub fn image(&self) -> Option<&ImageFile> {
        self.image.as_ref()
    }

    /// The label every later stage must use.
    pub fn label(&self) -> Option<&str> {
        self.filesystem.as_ref().map(|f| f.label.as_str())
    }

    fn reach(&mut self, state: InstallState) {
        debug_assert!(state > self.state && state != InstallState::Failed);
        self.state = state;
        self.last_completed = state;
    }

    fn fail(&mut self) {
        self.state = InstallState::Failed;
    }
}

/// A failed run: the session as it stood and the error that stopped it.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct InstallFailure {
    pub session: InstallSession,
    #[source]
    pub error: InstallError,
}

impl InstallFailure {
    pub fn last_completed(&self) -> InstallState {
        self.session.last_completed()
    }
}

/// Everything the pipeline needs from its surroundings.
pub struct Installer<'a> {
    pub config: &'a InstallConfig,
    pub host: &'a dyn VolumeHost,
    pub runner: &'a dyn CommandRunner,
}

impl<'a> Installer<'a> {
    pub fn new(
        config: &'a InstallConfig,
        host: &'a dyn VolumeHost,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            config,
            host,
            runner,
        }
    }

    /// Runs the whole install.
    ///
    /// # Arguments
    ///
    /// * `chooser` - Asked to resolve ambiguous devices or images.
    /// * `on_event` - Called as stages start and finish, for warnings, and
    ///   once more if the run fails.
    ///
    /// # Errors
    ///
    /// Returns an [`InstallFailure`] carrying the first stage error and the
    /// session in its [`InstallState::Failed`] state.
    pub fn run(
        &self,
        chooser: &mut dyn Chooser,
        mut on_event: impl FnMut(InstallEvent),
    ) -> Result<InstallSession, InstallFailure> {
        let mut session = InstallSession::new();
        match self.execute(&mut session, chooser, &mut on_event) {
            Ok(()) => {
                info!("install complete");
                Ok(session)
            }
            Err(error) => {
                let last_completed = session.last_completed();
                info!(%error, %last_completed, "install failed");
                session.fail();
                on_event(InstallEvent::Failed { last_completed });
                Err(InstallFailure { session, error })
            }
        }
    }

    fn execute(
        &self,
        session: &mut InstallSession,
        chooser: &mut dyn Chooser,
        on_event: &mut dyn FnMut(InstallEvent),
    ) -> crate::error::Result<()> {
        let config = self.config;

        on_event(InstallEvent::Entering(InstallState::DeviceSelected));
        let volumes = catalog::list_removable_volumes(self.host)?;
        let volume = catalog::select_volume(volumes, chooser)?;
        session.volume = Some(volume.clone());
        reached(session, on_event, InstallState::DeviceSelected);

        on_event(InstallEvent::Entering(InstallState::FilesystemVerified));
        let fs_info = filesystem::verify(self.host, &volume, &config.default_label)?;
        let label = fs_info.label.clone();
        session.filesystem = Some(fs_info);
        reached(session, on_event, InstallState::FilesystemVerified);

        on_event(InstallEvent::Entering(InstallState::ImageSelected));
        let image = image::find_image(
            &config.workdir,
            &config.image_extension,
            &config.download_url,
            chooser,
        )?;
        session.image = Some(image.clone());
        reached(session, on_event, InstallState::ImageSelected);

        on_event(InstallEvent::Entering(InstallState::Extracted));
        extract::extract(self.runner, config, &image, &volume, &mut |warning| {
            on_event(InstallEvent::Warning(warning))
        })?;
        reached(session, on_event, InstallState::Extracted);

        on_event(InstallEvent::Entering(InstallState::ConfigRewritten));
        bootcfg::rewrite_boot_config(
            &volume.path(&config.native_boot_dir),
            &config.native_boot_config,
            &config.boot_config,
            &label,
        )?;
        reached(session, on_event, InstallState::ConfigRewritten);

        on_event(InstallEvent::Entering(InstallState::BootloaderInstalled));
        bootloader::install(self.runner, config, &volume)?;
        reached(session, on_event, InstallState::BootloaderInstalled);

        Ok(())
    }
}

fn reached(
    session: &mut InstallSession,
    on_event: &mut dyn FnMut(InstallEvent),
    state: InstallState,
) {
    session.reach(state);
    info!(%state, "stage complete");
    on_event(InstallEvent::Reached(state));
}
