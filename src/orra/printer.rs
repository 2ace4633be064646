// SPDX-License-Identifier: MIT

//! User-facing progress output for compile and startup

/// Receives progress messages while an application is compiled and started
pub trait Printer: Send + Sync {
    fn print(&self, message: &str);
}

/// Discards every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPrinter;

impl Printer for NullPrinter {
    fn print(&self, _message: &str) {}
}

/// Prints to stdout, ticking off messages that end in "Done!"
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrinter;

impl ConsolePrinter {
    fn format(message: &str) -> String {
        if message.to_lowercase().ends_with("done!") {
            format!("  ✔ {}", message)
        } else {
            format!("  {}", message)
        }
    }
}

impl Printer for ConsolePrinter {
    fn print(&self, message: &str) {
        println!("{}", Self::format(message));
    }
}
