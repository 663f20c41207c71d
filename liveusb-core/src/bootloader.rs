//! Installs syslinux onto the target volume.
use crate::command::CommandRunner;
use crate::config::InstallConfig;
use crate::error::{InstallError, Result};
use crate::platform;
use crate::volume::RemovableVolume;
use std::ffi::OsString;
use std::fs;
use tracing::info;

/// Builds the installer's argument list: `-d /<boot_dir> <device>`.
///
/// The directory is given relative to the root of the volume's filesystem,
/// which is how syslinux expects it on every platform.
pub fn bootloader_args(config: &InstallConfig, volume: &RemovableVolume) -> Vec<OsString> {
    vec![
        "-d".into(),
        format!("/{}", config.boot_dir).into(),
        volume.id.clone().into(),
    ]
}

/// Moves the disc's bootloader directory into place and writes the boot
/// sector.
///
/// A stale `boot_dir` from an earlier install is removed first so the two
/// never mix. The disc's own configuration file is deleted from the moved
/// directory, leaving only the rewritten one.
///
/// # Errors
///
/// Returns [`InstallError::BootloaderInstallFailed`] if any filesystem step
/// fails, if the installer cannot be run, or if it exits unsuccessfully.
pub fn install(
    runner: &dyn CommandRunner,
    config: &InstallConfig,
    volume: &RemovableVolume,
) -> Result<()> {
    let failed = |reason: String| InstallError::BootloaderInstallFailed {
        volume: volume.id.clone(),
        reason,
    };

    let native = volume.path(&config.native_boot_dir);
    let target = volume.path(&config.boot_dir);

    if !native.is_dir() {
        return Err(failed(format!("cannot find {}", native.display())));
    }
    if target.is_dir() {
        info!(dir = %target.display(), "removing previous bootloader directory");
        fs::remove_dir_all(&target)
            .map_err(|e| failed(format!("cannot remove {}: {e}", target.display())))?;
    }
    fs::rename(&native, &target).map_err(|e| {
        failed(format!(
            "cannot move {} to {}: {e}",
            native.display(),
            target.display()
        ))
    })?;

    let stale_config = target.join(&config.native_boot_config);
    fs::remove_file(&stale_config)
        .map_err(|e| failed(format!("cannot remove {}: {e}", stale_config.display())))?;

    info!(volume = %volume.id, "installing bootloader");
    let output = runner
        .run(&config.bootloader, &bootloader_args(config, volume))
        .map_err(|e| failed(e.to_string()))?;
    if !output.success() {
        return Err(failed(output.summary()));
    }

    platform::flush_buffers();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandError, CommandOutput, Tool};
    use std::cell::RefCell;
    use std::path::Path;

    struct FakeSyslinux {
        code: i32,
        calls: RefCell<Vec<Vec<OsString>>>,
    }

    impl FakeSyslinux {
        fn exiting(code: i32) -> Self {
            Self {
                code,
                calls: RefCell::default(),
            }
        }
    }

    impl CommandRunner for FakeSyslinux {
        fn run(
            &self,
            tool: &Tool,
            args: &[OsString],
        ) -> std::result::Result<CommandOutput, CommandError> {
            assert_eq!(tool.program, "syslinux");
            self.calls.borrow_mut().push(args.to_vec());
            Ok(CommandOutput {
                code: Some(self.code),
                stdout: String::new(),
                stderr: if self.code == 0 {
                    String::new()
                } else {
                    "syslinux: this doesn't look like a valid FAT filesystem".into()
                },
            })
        }
    }

    fn volume_at(root: &Path) -> RemovableVolume {
        RemovableVolume {
            id: "/dev/sdb1".into(),
            root: root.to_path_buf(),
            size_gb: None,
        }
    }

    fn extracted_layout(root: &Path) {
        fs::create_dir(root.join("isolinux")).unwrap();
        fs::write(root.join("isolinux/isolinux.cfg"), "old").unwrap();
        fs::write(root.join("isolinux/syslinux.cfg"), "new").unwrap();
        fs::write(root.join("isolinux/vmlinuz0"), "kernel").unwrap();
    }

    #[test]
    fn moves_directory_and_runs_syslinux_once() {
        let dir = tempfile::tempdir().unwrap();
        extracted_layout(dir.path());
        let runner = FakeSyslinux::exiting(0);

        install(&runner, &InstallConfig::default(), &volume_at(dir.path())).unwrap();

        let boot = dir.path().join("syslinux");
        assert!(!dir.path().join("isolinux").exists());
        assert!(!boot.join("isolinux.cfg").exists());
        assert_eq!(fs::read_to_string(boot.join("syslinux.cfg")).unwrap(), "new");
        assert!(boot.join("vmlinuz0").is_file());
        assert_eq!(
            *runner.calls.borrow(),
            [vec![
                OsString::from("-d"),
                OsString::from("/syslinux"),
                OsString::from("/dev/sdb1"),
            ]]
        );
    }

    #[test]
    fn stale_install_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        extracted_layout(dir.path());
        fs::create_dir(dir.path().join("syslinux")).unwrap();
        fs::write(dir.path().join("syslinux/leftover.c32"), "").unwrap();

        install(
            &FakeSyslinux::exiting(0),
            &InstallConfig::default(),
            &volume_at(dir.path()),
        )
        .unwrap();

        assert!(!dir.path().join("syslinux/leftover.c32").exists());
        assert!(dir.path().join("syslinux/vmlinuz0").is_file());
    }

    #[test]
    fn nonzero_exit_fails() {
        let dir = tempfile::tempdir().unwrap();
        extracted_layout(dir.path());

        match install(
            &FakeSyslinux::exiting(1),
            &InstallConfig::default(),
            &volume_at(dir.path()),
        ) {
            Err(InstallError::BootloaderInstallFailed { volume, reason }) => {
                assert_eq!(volume, "/dev/sdb1");
                assert!(reason.contains("valid FAT filesystem"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_native_directory_fails_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeSyslinux::exiting(0);

        assert!(matches!(
            install(&runner, &InstallConfig::default(), &volume_at(dir.path())),
            Err(InstallError::BootloaderInstallFailed { .. })
        ));
        assert!(runner.calls.borrow().is_empty());
    }
}
