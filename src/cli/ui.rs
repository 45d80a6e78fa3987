//! Terminal output
//!
//! Status text, tables and the `OK`/`FAILED` status words go to stdout.
//! Warnings and error detail go to stderr. Colour is applied only to the
//! status words and only when enabled.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crossterm::style::Stylize;

use crate::constants::messages;

/// Where command output goes
pub struct Ui {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    color: bool,
}

impl std::fmt::Debug for Ui {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ui").field("color", &self.color).finish()
    }
}

impl Ui {
    pub fn new(out: Box<dyn Write + Send>, err: Box<dyn Write + Send>, color: bool) -> Self {
        Self { out, err, color }
    }

    /// The process's stdout and stderr
    pub fn stdio(color: bool) -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()), color)
    }

    /// In-memory output, for driving commands in tests
    pub fn captured() -> (Self, Capture, Capture) {
        let out = Capture::default();
        let err = Capture::default();
        let ui = Self::new(Box::new(out.clone()), Box::new(err.clone()), false);
        (ui, out, err)
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// A line on stdout
    pub fn say(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.out, "{}", text.as_ref());
    }

    /// Raw text on stdout, no newline added
    pub fn write_raw(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    /// `label value` lines with the values aligned
    pub fn say_table(&mut self, rows: &[(&str, String)]) {
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0) + 3;
        for (label, value) in rows {
            let _ = writeln!(self.out, "{:<width$}{}", label, value, width = width);
        }
    }

    pub fn ok(&mut self) {
        if self.color {
            let _ = writeln!(self.out, "{}", messages::OK.green().bold());
        } else {
            let _ = writeln!(self.out, "{}", messages::OK);
        }
    }

    pub fn failed(&mut self) {
        if self.color {
            let _ = writeln!(self.out, "{}", messages::FAILED.red().bold());
        } else {
            let _ = writeln!(self.out, "{}", messages::FAILED);
        }
    }

    /// A line on stderr
    pub fn warn(&mut self, text: impl AsRef<str>) {
        if self.color {
            let _ = writeln!(self.err, "{}", text.as_ref().yellow());
        } else {
            let _ = writeln!(self.err, "{}", text.as_ref());
        }
    }

    /// Error detail on stderr, never coloured
    pub fn error(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.err, "{}", text.as_ref());
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
        let _ = self.err.flush();
    }
}

/// Shared in-memory sink
#[derive(Debug, Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    /// Everything written so far
    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "capture buffer poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streams_are_separate() {
        let (mut ui, out, err) = Ui::captured();
        ui.say("Setting api endpoint...");
        ui.ok();
        ui.warn("careful");
        ui.failed();
        ui.error("boom");

        assert_eq!(out.contents(), "Setting api endpoint...\nOK\nFAILED\n");
        assert_eq!(err.contents(), "careful\nboom\n");
    }

    #[test]
    fn test_color_only_when_enabled() {
        let (mut ui, out, _err) = Ui::captured();
        ui.ok();
        assert!(!out.contents().contains('\u{1b}'));

        ui.set_color(true);
        ui.ok();
        assert_eq!(out.contents().matches("OK").count(), 2);
    }

    #[test]
    fn test_table_alignment() {
        let (mut ui, out, _err) = Ui::captured();
        ui.say_table(&[("API endpoint:", "https://a".to_string()), ("org:", "o".to_string())]);
        assert_eq!(
            out.contents(),
            "API endpoint:   https://a\norg:            o\n"
        );
    }
}
