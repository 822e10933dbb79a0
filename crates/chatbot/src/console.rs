use std::io::{BufRead, Write};

use crate::Result;
use crate::display::TerminalDisplay;
use crate::responder::StreamingResponder;
use crate::session::Session;

pub const EXIT_COMMAND: &str = "exit";
pub const USER_PROMPT: &str = "You: ";

/// `exit` in any letter case, with nothing else on the line.
pub fn is_exit_command(line: &str) -> bool {
    line.eq_ignore_ascii_case(EXIT_COMMAND)
}

/// Reads one prompt per line until `exit` or end of input, streaming each
/// reply to `output`. Service failures are printed and the loop continues;
/// only I/O errors end it early.
pub async fn run<R, W>(
    responder: &StreamingResponder,
    session: &mut Session,
    mut input: R,
    output: W,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut display = TerminalDisplay::new(output);
    writeln!(
        display.get_mut(),
        "Welcome to the Gemini Chatbot! Type '{EXIT_COMMAND}' to quit.\n"
    )?;

    loop {
        let out = display.get_mut();
        write!(out, "{USER_PROMPT}")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if is_exit_command(line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let reply = responder.submit(session, &mut display, line).await?;
        tracing::debug!(completed = reply.is_completed(), turns = session.len(), "turn finished");
    }

    writeln!(display.get_mut(), "Goodbye!")?;
    display.get_mut().flush()?;
    Ok(())
}
