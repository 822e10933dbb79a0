mod channel;
mod terminal;

pub use channel::{ChannelDisplay, DisplayEvent};
pub use terminal::TerminalDisplay;

use crate::Result;
use crate::chat::{ChatTurn, Role};

pub trait DisplaySurface {
    /// Appends a finalized turn. A surface already showing the in-progress
    /// assistant turn promotes it rather than drawing it a second time.
    fn render_turn(&mut self, role: Role, content: &str) -> Result<()>;

    /// Busy indicator shown between issuing a request and its first fragment.
    fn render_pending(&mut self) -> Result<()> {
        Ok(())
    }

    /// Replaces the content of the in-progress assistant turn. Must be
    /// idempotent for identical content.
    fn render_pending_replace(&mut self, content: &str) -> Result<()>;

    fn render_error(&mut self, message: &str) -> Result<()>;

    /// Replays a snapshot top to bottom.
    fn render_transcript(&mut self, turns: &[ChatTurn]) -> Result<()> {
        for turn in turns {
            self.render_turn(turn.role, &turn.content)?;
        }
        Ok(())
    }
}

impl<D: DisplaySurface + ?Sized> DisplaySurface for &mut D {
    fn render_turn(&mut self, role: Role, content: &str) -> Result<()> {
        (**self).render_turn(role, content)
    }

    fn render_pending(&mut self) -> Result<()> {
        (**self).render_pending()
    }

    fn render_pending_replace(&mut self, content: &str) -> Result<()> {
        (**self).render_pending_replace(content)
    }

    fn render_error(&mut self, message: &str) -> Result<()> {
        (**self).render_error(message)
    }

    fn render_transcript(&mut self, turns: &[ChatTurn]) -> Result<()> {
        (**self).render_transcript(turns)
    }
}
