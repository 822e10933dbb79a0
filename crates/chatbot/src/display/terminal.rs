use std::io::Write;

use super::DisplaySurface;
use crate::Result;
use crate::chat::Role;

const LABEL: &str = "Bot: ";

/// Line-oriented surface for a terminal.
///
/// A terminal cannot redraw in place, so each replace writes only the part of
/// the content not yet on screen. User turns are not echoed; the terminal
/// already shows what was typed.
#[derive(Debug)]
pub struct TerminalDisplay<W: Write> {
    writer: W,
    shown: String,
    in_progress: bool,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            shown: String::new(),
            in_progress: false,
        }
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn begin(&mut self) -> Result<()> {
        if !self.in_progress {
            self.writer.write_all(LABEL.as_bytes())?;
            self.shown.clear();
            self.in_progress = true;
        }
        Ok(())
    }

    fn show(&mut self, content: &str) -> Result<()> {
        match content.strip_prefix(self.shown.as_str()) {
            Some(unseen) => {
                self.writer.write_all(unseen.as_bytes())?;
                self.shown.push_str(unseen);
            }
            None => {
                // Content no longer extends what is on screen; start a new line.
                writeln!(self.writer)?;
                self.writer.write_all(content.as_bytes())?;
                self.shown = content.to_string();
            }
        }
        Ok(())
    }

    fn end(&mut self) {
        self.shown.clear();
        self.in_progress = false;
    }
}

impl<W: Write> DisplaySurface for TerminalDisplay<W> {
    fn render_turn(&mut self, role: Role, content: &str) -> Result<()> {
        if role == Role::User {
            return Ok(());
        }

        self.begin()?;
        self.show(content)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        self.end();
        Ok(())
    }

    fn render_pending(&mut self) -> Result<()> {
        self.begin()?;
        self.writer.flush()?;
        Ok(())
    }

    fn render_pending_replace(&mut self, content: &str) -> Result<()> {
        self.begin()?;
        self.show(content)?;
        self.writer.flush()?;
        Ok(())
    }

    fn render_error(&mut self, message: &str) -> Result<()> {
        writeln!(self.writer, "\nError: {message}")?;
        self.writer.flush()?;
        self.end();
        Ok(())
    }
}
