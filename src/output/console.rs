//! Tagged status lines for interactive use

use crate::output::formatter::OutputFormat;

/// Prints `[INFO]`/`[OK]`/`[ERR]` lines. Only errors are shown in JSON mode,
/// where they go to stderr. Compose output is captured in that mode too,
/// except for `logs`, which always streams.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    format: OutputFormat,
}

impl Console {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn info(&self, msg: &str) {
        if self.format == OutputFormat::Human {
            println!("[INFO] {}", msg);
        }
    }

    pub fn ok(&self, msg: &str) {
        if self.format == OutputFormat::Human {
            println!("[OK]   {}", msg);
        }
    }

    pub fn err(&self, msg: &str) {
        eprintln!("[ERR]  {}", msg);
    }
}
