
use futures::{Stream, StreamExt};

use crate::{
    parser::Parser,
    router::{Dispatcher, Router, Storage, Transport},
    stream::LineFramer,
    types::LineBuffer,
    Error,
};

/// One input channel: a parser and the router its lines go to.
///
/// Independent channels (serial, a file being played back) each get their own session.
pub struct Session<D, S, T> {
    parser: Parser,
    router: Router<D, S, T>,
}

impl<D, S, T> Session<D, S, T>
where
    D: Dispatcher,
    S: Storage,
    T: Transport,
{
    pub fn new(parser: Parser, router: Router<D, S, T>) -> Self {
        Self { parser, router }
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn parser_mut(&mut self) -> &mut Parser {
        &mut self.parser
    }

    pub fn router(&self) -> &Router<D, S, T> {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router<D, S, T> {
        &mut self.router
    }

    /// Feeds one byte of `line`. Returns whether it ended the line.
    pub fn push(&mut self, b: u8, line: &mut LineBuffer) -> bool {
        let Self { parser, router } = self;
        parser.push(b, |verdict, command| router.route(verdict, command, line))
    }

    /// Feeds a framed line, up to and including its first terminator.
    ///
    /// A line without a terminator is closed with `\n`, or refused if there is no room left
    /// for one.
    pub fn parse_line(&mut self, line: &mut LineBuffer) {
        let terminator = line.as_bytes().iter().position(|&b| b == b'\r' || b == b'\n');
        let end = match terminator {
            Some(i) => i + 1,
            None if line.is_empty() => return,
            None => {
                if !line.push(b'\n') {
                    self.reject(Error::LineTooLong);
                    return;
                }
                line.len()
            }
        };
        line.truncate(end);

        for i in 0..end {
            let b = line.as_bytes()[i];
            self.push(b, line);
        }
    }

    /// Answers a line that never reached the parser.
    fn reject(&mut self, error: Error) {
        self.router.reject(error, self.parser.command());
    }

    /// Drives a whole byte stream through the session.
    pub async fn run<I>(&mut self, input: I)
    where
        I: Stream<Item = u8> + Unpin,
    {
        let mut lines = LineFramer::new(input);
        while let Some(framed) = lines.next().await {
            match framed {
                Ok(mut line) => self.parse_line(&mut line),
                Err(e) => self.reject(e),
            }
        }
    }
}
