use anyhow::Result;
use clap::Parser;
use console::{Term, style};
use dialoguer::{Input, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use liveusb_core::command::SystemRunner;
use liveusb_core::config::InstallConfig;
use liveusb_core::pipeline::{
    InstallEvent, InstallFailure, InstallSession, InstallState, Installer,
};
use liveusb_core::platform::SystemHost;
use liveusb_core::select::Chooser;
use std::error::Error as _;
use std::io::{self, IsTerminal, stdin, stdout};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use libc::ECHOCTL;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;
#[cfg(unix)]
use termios::{TCSANOW, Termios, tcsetattr};

/// Installs a Fedora live ISO from the current directory onto a FAT-formatted
/// USB key.
#[derive(Parser)]
#[command(name = "liveusb")]
#[command(about = "Install a live ISO onto a USB key", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// A helper struct that, on Unix, disables `ECHOCTL` for the terminal.
///
/// `ECHOCTL` is the terminal flag that causes Ctrl+C to be printed as `^C`.
/// By disabling it, the interrupt warning printed by the `ctrlc` handler
/// starts on a clean line. The original terminal state is put back by
/// [`TermRestorer::restore`], which runs on the way out of `main` and in the
/// interrupt handler before it exits.
struct TermRestorer {
    #[cfg(unix)]
    original_termios: Option<Termios>,
}

impl TermRestorer {
    fn new() -> Self {
        #[cfg(unix)]
        {
            if !stdout().is_terminal() {
                return Self {
                    original_termios: None,
                };
            }

            let fd = stdout().as_raw_fd();
            let original_termios = Termios::from_fd(fd).ok().and_then(|original| {
                let mut quiet = original;
                // Disable printing of control characters.
                quiet.c_lflag &= !ECHOCTL;
                tcsetattr(fd, TCSANOW, &quiet).ok().map(|_| original)
            });
            Self { original_termios }
        }
        #[cfg(not(unix))]
        {
            // This is a no-op on non-Unix platforms.
            Self {}
        }
    }

    fn restore(&self) {
        #[cfg(unix)]
        if let Some(ref original_termios) = self.original_termios {
            let fd = stdout().as_raw_fd();
            tcsetattr(fd, TCSANOW, original_termios).ok();
        }
    }
}

/// Asks the operator on the console, showing a numbered list first.
struct ConsoleChooser;

impl Chooser for ConsoleChooser {
    fn choose(&mut self, prompt: &str, items: &[String]) -> io::Result<String> {
        println!();
        for (i, item) in items.iter().enumerate() {
            println!("  [ {} ] {}", style(i + 1).cyan().bold(), item);
        }

        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{prompt} (1-{})?", items.len()))
            .interact_text()
            .map_err(io::Error::other)
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // No timestamps: this is an interactive tool and the lines sit next to
    // the console transcript.
    let format = tracing_subscriber::fmt::format()
        .without_time()
        .with_target(false)
        .compact();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(format)
        .with_writer(io::stderr)
        .init();
}

/// Stages that block on an external tool get a spinner; the rest just print
/// a line, since they may prompt.
fn is_long_running(state: InstallState) -> bool {
    matches!(
        state,
        InstallState::Extracted | InstallState::BootloaderInstalled
    )
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg} [{elapsed_precise}]")
            .unwrap()
            .tick_strings(&["■  ", " ■ ", "  ■", " ■ ", "■■■"]),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Renders pipeline progress on the console.
fn report(event: InstallEvent, active: &mut Option<ProgressBar>) {
    match event {
        InstallEvent::Entering(state) if is_long_running(state) => {
            *active = Some(spinner(state.action()));
        }
        InstallEvent::Entering(state) => {
            println!("{} {}...", style("==>").blue().bold(), state.action());
        }
        InstallEvent::Reached(state) => {
            if let Some(pb) = active.take() {
                pb.finish_with_message(format!("{} {}", style("✔").green(), state.action()));
            }
        }
        InstallEvent::Warning(message) => {
            let line = format!("{} {}", style("WARNING:").yellow().bold(), message);
            match active {
                Some(pb) => pb.println(line),
                None => println!("{line}"),
            }
        }
        InstallEvent::Failed { .. } => {
            if let Some(pb) = active.take() {
                pb.abandon_with_message(format!("{} {}", style("❌").red(), pb.message()));
            }
        }
    }
}

fn print_success(session: &InstallSession) {
    let device = session.volume().map(|v| v.id.as_str()).unwrap_or("?");
    let image = session.image().map(|i| i.file_name()).unwrap_or_default();
    println!(
        "\n✨ Successfully installed {} onto {} (label {}).",
        style(image).cyan(),
        style(device).cyan(),
        style(session.label().unwrap_or("?")).cyan()
    );
    println!("   You can now boot from the device.");
}

fn print_failure(failure: &InstallFailure) {
    println!("\n{}", style("Oops! Something went wrong:").red().bold());
    println!("  {}", failure.error);
    let mut cause = failure.error.source();
    while let Some(err) = cause {
        println!("  caused by: {err}");
        cause = err.source();
    }
    println!(
        "\nLast completed stage: {}. The device may be partially written;",
        style(failure.last_completed()).yellow()
    );
    println!("correct the problem above and run liveusb again.");
}

/// Waits for the operator to acknowledge the outcome before the console
/// window closes.
fn wait_for_enter() {
    if !stdin().is_terminal() {
        return;
    }
    let term = Term::stdout();
    term.write_line("").ok();
    term.write_str("Done! Press Enter to exit.").ok();
    term.read_line().ok();
}

fn run(term_restorer: Arc<TermRestorer>) -> Result<ExitCode> {
    // No stage can be cancelled mid-way; an interrupt only leaves a warning.
    ctrlc::set_handler(move || {
        eprintln!(
            "\n{} Interrupted. The device may be left partially written; run liveusb again to redo the install.",
            style("WARNING:").red().bold()
        );
        term_restorer.restore();
        std::process::exit(130);
    })?;

    let workdir = std::env::current_dir()?;
    let config = InstallConfig::for_workdir(&workdir).apply_env(|key| std::env::var_os(key));
    let runner = SystemRunner::new(&workdir);
    let installer = Installer::new(&config, &SystemHost, &runner);

    println!(
        "{} Installing a live image from {}",
        style("liveusb").bold(),
        style(workdir.display()).cyan()
    );

    let mut active: Option<ProgressBar> = None;
    let result = installer.run(&mut ConsoleChooser, |event| report(event, &mut active));

    let code = match result {
        Ok(session) => {
            print_success(&session);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            print_failure(&failure);
            ExitCode::FAILURE
        }
    };

    wait_for_enter();
    Ok(code)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let term_restorer = Arc::new(TermRestorer::new());
    let result = run(term_restorer.clone());
    term_restorer.restore();
    result
}
