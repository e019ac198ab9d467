//! onion-portal CLI - run the Darkweb Portal (Tor + I2P) compose stack

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use onion_portal::cli::{endpoints, policy, Args, Session, SubCommand};
use onion_portal::config::{resolve_manifest, PortalConfig};
use onion_portal::readiness::SystemClock;
use onion_portal::{format_output, logging, OutputFormat};

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the command succeeded
fn run(args: Args) -> anyhow::Result<bool> {
    let Args { command, compose_file, json, .. } = args;
    let format = if json { OutputFormat::Json } else { OutputFormat::Human };

    let report = match command {
        SubCommand::Urls => endpoints(),

        SubCommand::Prefs { script } => policy(script)?,

        SubCommand::Up { timeout, poll_interval } => {
            let session = open_session(compose_file, format, |config| {
                config
                    .with_timeout(Duration::from_secs(timeout))
                    .with_poll_interval(Duration::from_millis(poll_interval))
            })?;
            session.start_stack(&SystemClock)
        }

        SubCommand::Down => open_session(compose_file, format, |c| c)?.stop_stack()?,

        SubCommand::Status => open_session(compose_file, format, |c| c)?.show_status()?,

        SubCommand::Logs { tail, no_follow } => {
            let session = open_session(compose_file, format, |c| c.with_log_tail(tail))?;
            session
                .cancel_flag()
                .install_ctrlc_handler()
                .context("installing the Ctrl+C handler")?;
            session.show_logs(!no_follow)?
        }

        SubCommand::SyncPrefs => open_session(compose_file, format, |c| c)?.sync_prefs(),

        #[cfg(feature = "menu")]
        SubCommand::Menu => {
            let session = open_session(compose_file, OutputFormat::Human, |c| c)?;
            session
                .cancel_flag()
                .install_ctrlc_handler()
                .context("installing the Ctrl+C handler")?;
            onion_portal::menu::run_menu(&session, &SystemClock)?;
            return Ok(true);
        }
        #[cfg(not(feature = "menu"))]
        SubCommand::Menu => {
            eprintln!("Menu support not enabled. Rebuild with --features menu");
            std::process::exit(1);
        }
    };

    let text = format_output(&report, &format);
    if !text.is_empty() {
        println!("{}", text);
    }
    Ok(!report.is_failure())
}

/// Locate the compose file and make sure a compose tool is installed
fn open_session(
    compose_file: Option<PathBuf>,
    format: OutputFormat,
    configure: impl FnOnce(PortalConfig) -> PortalConfig,
) -> anyhow::Result<Session> {
    let manifest = resolve_manifest(compose_file.as_deref())?;
    let session = Session::open(configure(PortalConfig::new(manifest)), format)?;
    session.ensure_compose()?;
    Ok(session)
}
