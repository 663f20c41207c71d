//! Unpacks the disc image onto the target volume.
//!
//! The archive extractor is treated as a black box whose exit status cannot
//! be trusted, so success is judged by whether the live payload directory
//! exists on the volume afterwards.
use crate::command::CommandRunner;
use crate::config::InstallConfig;
use crate::error::{InstallError, Result};
use crate::volume::{ImageFile, RemovableVolume};
use std::ffi::OsString;
use tracing::{info, warn};

/// What the extraction found and left behind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractOutcome {
    /// A live payload from an earlier install was already on the volume and
    /// has been overwritten.
    pub replaced_existing: bool,
}

/// Builds the extractor's argument list:
/// `x <image> -x!<exclusion> -o<root> -y`.
///
/// The boot-catalog exclusion keeps the disc's El Torito boot image off the
/// volume, and `-y` answers the overwrite prompts a re-install would raise.
pub fn extractor_args(
    config: &InstallConfig,
    image: &ImageFile,
    volume: &RemovableVolume,
) -> Vec<OsString> {
    let mut output = OsString::from("-o");
    output.push(volume.root.as_os_str());

    vec![
        "x".into(),
        image.path.clone().into_os_string(),
        format!("-x!{}", config.boot_sector_exclusion).into(),
        output,
        "-y".into(),
    ]
}

/// Extracts `image` onto the root of `volume`.
///
/// `on_warning` is told about a payload left by an earlier install before
/// the extractor starts overwriting it.
///
/// # Errors
///
/// Returns [`InstallError::ExtractionFailed`] if the extractor cannot be
/// located or started, or if the payload directory is missing once it has
/// finished, whatever exit status it reported.
pub fn extract(
    runner: &dyn CommandRunner,
    config: &InstallConfig,
    image: &ImageFile,
    volume: &RemovableVolume,
    on_warning: &mut dyn FnMut(String),
) -> Result<ExtractOutcome> {
    let payload = volume.path(&config.payload_dir);
    let replaced_existing = payload.is_dir();
    if replaced_existing {
        on_warning(format!(
            "Your device already contains a {}! It will be overwritten.",
            config.payload_dir
        ));
    }

    info!(image = %image, destination = %volume.root.display(), "extracting image");
    let output = runner
        .run(&config.extractor, &extractor_args(config, image, volume))
        .map_err(|e| InstallError::ExtractionFailed {
            image: image.path.clone(),
            reason: e.to_string(),
        })?;

    if !payload.is_dir() {
        return Err(InstallError::ExtractionFailed {
            image: image.path.clone(),
            reason: format!(
                "cannot find {} on {} ({})",
                config.payload_dir,
                volume.root.display(),
                output.summary()
            ),
        });
    }
    if !output.success() {
        warn!(
            status = %output.summary(),
            "extractor reported failure but the payload is present"
        );
    }

    Ok(ExtractOutcome { replaced_existing })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandError, CommandOutput, Tool};
    use std::cell::Cell;
    use std::fs;
    use std::path::Path;

    /// Pretends to be 7-Zip: optionally creates the payload, then exits with `code`.
    struct FakeExtractor<'a> {
        create: Option<&'a Path>,
        code: i32,
        calls: Cell<usize>,
    }

    impl CommandRunner for FakeExtractor<'_> {
        fn run(
            &self,
            tool: &Tool,
            args: &[OsString],
        ) -> std::result::Result<CommandOutput, CommandError> {
            assert_eq!(tool.program, "7z");
            assert_eq!(args[0], "x");
            self.calls.set(self.calls.get() + 1);
            if let Some(dir) = self.create {
                fs::create_dir_all(dir).unwrap();
            }
            Ok(CommandOutput {
                code: Some(self.code),
                stdout: String::new(),
                stderr: "ERROR: Data Error".into(),
            })
        }
    }

    struct MissingTool;

    impl CommandRunner for MissingTool {
        fn run(
            &self,
            tool: &Tool,
            _: &[OsString],
        ) -> std::result::Result<CommandOutput, CommandError> {
            Err(CommandError::NotFound {
                tool: tool.program.clone(),
            })
        }
    }

    fn setup() -> (tempfile::TempDir, RemovableVolume, ImageFile) {
        let dir = tempfile::tempdir().unwrap();
        let volume = RemovableVolume {
            id: "/dev/sdb1".into(),
            root: dir.path().to_path_buf(),
            size_gb: None,
        };
        let image = ImageFile {
            path: "/srv/Fedora-Live.iso".into(),
        };
        (dir, volume, image)
    }

    #[test]
    fn builds_7zip_arguments() {
        let (_dir, volume, image) = setup();
        let args = extractor_args(&InstallConfig::default(), &image, &volume);
        let mut expected_output = OsString::from("-o");
        expected_output.push(volume.root.as_os_str());
        assert_eq!(
            args,
            [
                OsString::from("x"),
                OsString::from("/srv/Fedora-Live.iso"),
                OsString::from("-x![BOOT]"),
                expected_output,
                OsString::from("-y"),
            ]
        );
    }

    #[test]
    fn payload_presence_is_success_even_with_bad_status() {
        let (dir, volume, image) = setup();
        let payload = dir.path().join("LiveOS");
        let runner = FakeExtractor {
            create: Some(&payload),
            code: 2,
            calls: Cell::new(0),
        };

        let mut warnings = Vec::new();
        let outcome = extract(
            &runner,
            &InstallConfig::default(),
            &image,
            &volume,
            &mut |w| warnings.push(w),
        )
        .unwrap();
        assert!(!outcome.replaced_existing);
        assert!(warnings.is_empty());
        assert_eq!(runner.calls.get(), 1);
    }

    #[test]
    fn missing_payload_fails_even_with_good_status() {
        let (_dir, volume, image) = setup();
        let runner = FakeExtractor {
            create: None,
            code: 0,
            calls: Cell::new(0),
        };

        match extract(
            &runner,
            &InstallConfig::default(),
            &image,
            &volume,
            &mut |_| {},
        ) {
            Err(InstallError::ExtractionFailed { image, reason }) => {
                assert_eq!(image, Path::new("/srv/Fedora-Live.iso"));
                assert!(reason.contains("LiveOS"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn existing_payload_is_reported_and_overwritten() {
        let (dir, volume, image) = setup();
        let payload = dir.path().join("LiveOS");
        fs::create_dir(&payload).unwrap();
        let runner = FakeExtractor {
            create: Some(&payload),
            code: 0,
            calls: Cell::new(0),
        };

        let mut warnings = Vec::new();
        let outcome = extract(
            &runner,
            &InstallConfig::default(),
            &image,
            &volume,
            &mut |w| warnings.push(w),
        )
        .unwrap();
        assert!(outcome.replaced_existing);
        assert_eq!(
            warnings,
            ["Your device already contains a LiveOS! It will be overwritten."]
        );
    }

    #[test]
    fn existing_payload_warning_precedes_a_failed_extraction() {
        let (dir, volume, image) = setup();
        fs::create_dir(dir.path().join("LiveOS")).unwrap();
        let mut warnings = Vec::new();

        let result = extract(
            &MissingTool,
            &InstallConfig::default(),
            &image,
            &volume,
            &mut |w| warnings.push(w),
        );
        assert!(matches!(result, Err(InstallError::ExtractionFailed { .. })));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn missing_tool_fails_extraction() {
        let (_dir, volume, image) = setup();
        match extract(
            &MissingTool,
            &InstallConfig::default(),
            &image,
            &volume,
            &mut |_| {},
        ) {
            Err(InstallError::ExtractionFailed { reason, .. }) => assert!(reason.contains("7z")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
