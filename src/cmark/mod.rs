//! Helpers for reading CommonMark documents event by event.

mod parser;

pub use parser::*;

use pulldown_cmark::Event;
use pulldown_cmark_to_cmark::{cmark_with_options, Options};

use crate::error::Result;

pub trait InlineEventsExt<'a> {
    /// Render a run of inline events (a heading or link label) back to single-line CommonMark.
    /// Line breaks become spaces and surrounding whitespace is trimmed.
    fn to_inline_markdown(self) -> Result<String>;
}

impl<'a, I> InlineEventsExt<'a> for I
where
    I: Iterator<Item = Event<'a>>,
{
    fn to_inline_markdown(self) -> Result<String> {
        let events = self.map(|event| match event {
            Event::SoftBreak | Event::HardBreak => Event::Text(" ".into()),
            other => other,
        });

        let mut buffer = String::new();
        let options = Options {
            code_block_token_count: 3,
            ..Default::default()
        };
        cmark_with_options(events, &mut buffer, options)?;

        Ok(buffer.trim().to_string())
    }
}
