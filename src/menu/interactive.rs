//! Numbered menu loop

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::cli::{endpoints, Session};
use crate::compose::CommandRunner;
use crate::error::{PortalError, Result};
use crate::output::{format_output, Report};
use crate::readiness::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Start,
    Stop,
    Status,
    Logs,
    Urls,
    Exit,
}

fn parse_choice(input: &str) -> Option<Choice> {
    match input.trim().to_lowercase().as_str() {
        "1" | "start" | "up" => Some(Choice::Start),
        "2" | "stop" | "down" => Some(Choice::Stop),
        "3" | "status" => Some(Choice::Status),
        "4" | "logs" => Some(Choice::Logs),
        "5" | "urls" => Some(Choice::Urls),
        "6" | "exit" | "quit" | "q" => Some(Choice::Exit),
        _ => None,
    }
}

pub fn run_menu<R: CommandRunner>(session: &Session<R>, clock: &dyn Clock) -> Result<()> {
    let mut rl = DefaultEditor::new().map_err(|e| PortalError::Interactive(e.to_string()))?;

    println!("Darkweb Portal v{} - Tor + I2P", env!("CARGO_PKG_VERSION"));

    loop {
        print_menu();
        let line = match rl.readline("Select an option: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => return Err(PortalError::Interactive(err.to_string())),
        };

        let Some(choice) = parse_choice(&line) else {
            if !line.trim().is_empty() {
                session.console().err("Invalid option");
            }
            continue;
        };
        let _ = rl.add_history_entry(line.trim());
        debug!(?choice, "menu selection");

        let report = match choice {
            Choice::Exit => {
                println!("Goodbye!");
                break;
            }
            Choice::Start => Ok(session.start_stack(clock)),
            Choice::Stop => session.stop_stack(),
            Choice::Status => session.show_status(),
            Choice::Logs => session.show_logs(true),
            Choice::Urls => Ok(endpoints()),
        };

        // Failures are shown and the menu keeps going
        match report {
            Ok(report) => {
                show(session, &report);
                if choice == Choice::Start && report.is_failure() {
                    session.console().err("Could not start Darkweb Portal");
                }
            }
            Err(e) => session.console().err(&e.to_string()),
        }
        println!();
    }

    Ok(())
}

fn show<R: CommandRunner>(session: &Session<R>, report: &Report) {
    let text = format_output(report, &session.console().format());
    if !text.is_empty() {
        println!("{}", text);
    }
}

fn print_menu() {
    println!("==============================");
    println!(" Darkweb Portal - Main menu");
    println!("==============================");
    println!("  [1] Start portal");
    println!("  [2] Stop portal");
    println!("  [3] Show status");
    println!("  [4] Show logs");
    println!("  [5] Show URLs");
    println!("  [6] Exit");
}
