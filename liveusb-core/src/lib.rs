//! The core, UI-agnostic library for the `liveusb` installer.
//!
//! `liveusb-core` turns a live operating-system ISO into a bootable USB key.
//! It is designed to be used as a library by any front-end, whether it's a
//! command-line interface (like `liveusb`) or a graphical one. It handles
//! device discovery, filesystem checks, image extraction, boot configuration
//! and bootloader installation.
//!
//! The library is structured into several key modules:
//! - [`volume`]: The data model (`RemovableVolume`, `FilesystemInfo`, `ImageFile`).
//! - [`platform`]: Provides platform-specific logic for enumerating volumes and
//!   reading or writing their labels.
//! - [`command`]: Runs the external archive extractor and bootloader installer.
//! - [`catalog`], [`filesystem`], [`image`], [`extract`], [`bootcfg`] and
//!   [`bootloader`]: One module per install stage.
//! - [`pipeline`]: Sequences the stages and reports progress.
//!
//! The primary entry point is [`pipeline::Installer::run`]. It reports its
//! progress through a callback, allowing the calling application to display
//! progress in any way it chooses, and asks a [`select::Chooser`] whenever the
//! operator has to pick between several devices or images.
//!
//! ## Example: Installing with Progress Reporting
//!
//! ```rust,no_run
//! use liveusb_core::command::SystemRunner;
//! use liveusb_core::config::InstallConfig;
//! use liveusb_core::pipeline::{InstallEvent, Installer};
//! use liveusb_core::platform::SystemHost;
//! use liveusb_core::select::Chooser;
//! use std::io;
//!
//! /// Always picks the first item.
//! struct First;
//!
//! impl Chooser for First {
//!     fn choose(&mut self, _prompt: &str, _items: &[String]) -> io::Result<String> {
//!         Ok("1".to_string())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = InstallConfig::for_workdir(".").apply_env(|k| std::env::var_os(k));
//!     let runner = SystemRunner::new(&config.workdir);
//!     let installer = Installer::new(&config, &SystemHost, &runner);
//!
//!     let session = installer.run(&mut First, |event| {
//!         if let InstallEvent::Entering(state) = event {
//!             println!("{}...", state.action());
//!         }
//!     })?;
//!
//!     println!("Done! Label: {:?}", session.label());
//!     Ok(())
//! }
//! ```

pub mod bootcfg;
pub mod bootloader;
pub mod catalog;
pub mod command;
pub mod config;
pub mod error;
pub mod extract;
pub mod filesystem;
pub mod image;
pub mod pipeline;
pub mod platform;
pub mod select;
pub mod volume;

pub use error::{InstallError, Result};
