use pulldown_cmark::{Event, OffsetIter, Options, Parser, Tag};

use std::{fmt::Display, iter::Peekable};

/// A peekable cursor over the CommonMark events of a source document that remembers where the
/// last consumed event started, so parse errors can point at a line and column.
pub struct CMarkParser<'a> {
    source: &'a str,
    events: Peekable<OffsetIter<'a, 'a>>,
    offset: usize,
}

impl<'a> CMarkParser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);

        let events = Parser::new_ext(source, options).into_offset_iter().peekable();

        Self {
            source,
            events,
            offset: 0,
        }
    }

    /// Line and column (both 1-based) of the last consumed event.
    pub fn position(&self) -> Position {
        let previous = &self.source.as_bytes()[..self.offset];
        let line = memchr::memchr_iter(b'\n', previous).count() + 1;
        let line_start = memchr::memrchr(b'\n', previous).map_or(0, |index| index + 1);
        let column = self.source[line_start..self.offset].chars().count() + 1;

        Position { line, column }
    }

    pub fn peek_event(&mut self) -> Option<&Event<'a>> {
        self.events.peek().map(|(event, _)| event)
    }

    pub fn next_event(&mut self) -> Option<Event<'a>> {
        let (event, range) = self.events.next()?;
        self.offset = range.start;

        Some(event)
    }

    /// Yields events until `delimiter` matches. The matching event is consumed but not yielded.
    pub fn iter_until_and_consume(
        &mut self,
        delimiter: impl Fn(&Event<'a>) -> bool + 'a,
    ) -> impl Iterator<Item = Event<'a>> + '_ {
        std::iter::from_fn(move || match self.next_event() {
            Some(event) if delimiter(&event) => None,
            event => event,
        })
    }

    /// Consumes every event up to and including the end of the block `tag` opened.
    /// The opening event must already have been consumed.
    pub fn skip_block(&mut self, tag: Tag<'a>) {
        let mut depth = 0usize;

        while let Some(event) = self.next_event() {
            match event {
                Event::Start(ref inner) if *inner == tag => depth += 1,
                Event::End(ref inner) if *inner == tag => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                _ => (),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Display for Position {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "line {}, column {}", self.line, self.column)
    }
}
