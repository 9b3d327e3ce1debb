use futures::Stream;
use log::warn;
use pin_project_lite::pin_project;

use core::pin::Pin;
use core::task::{Context, Poll};

use crate::{
    types::{LineBuffer, MAX_LINE},
    Error,
};

pin_project! {
    /// Frames a byte stream into lines, one line in flight at a time.
    ///
    /// Each line ends with the terminator that closed it. Empty lines (including the `\n` of a
    /// `\r\n` pair) are skipped. A line that does not fit a [`LineBuffer`] with its terminator
    /// is discarded up to its end and yielded as [`Error::LineTooLong`]. A trailing unterminated
    /// line is closed with `\n` when the input ends.
    pub struct LineFramer<S: Stream<Item = u8>> {
        #[pin]
        stream: S,
        line: LineBuffer,
        overflowed: bool,
    }
}

impl<S: Stream<Item = u8>> LineFramer<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            line: LineBuffer::new(),
            overflowed: false,
        }
    }
}

impl<S: Stream<Item = u8>> Stream for LineFramer<S> {
    type Item = Result<LineBuffer, Error>;

    fn poll_next(
        self: Pin<&mut Self>,
        ctx: &mut Context<'_>,
    ) -> Poll<Option<Result<LineBuffer, Error>>> {
        let mut this = self.project();
        loop {
            let next = this.stream.as_mut().poll_next(ctx);
            if *this.overflowed && matches!(next, Poll::Ready(None | Some(b'\r' | b'\n'))) {
                *this.overflowed = false;
                this.line.clear();
                return Poll::Ready(Some(Err(Error::LineTooLong)));
            }

            match next {
                Poll::Ready(Some(b @ (b'\r' | b'\n'))) => {
                    if this.line.is_empty() {
                        continue;
                    }
                    this.line.push(b);
                    return Poll::Ready(Some(Ok(core::mem::take(this.line))));
                }
                Poll::Ready(Some(_)) if *this.overflowed => {}
                Poll::Ready(Some(b)) => {
                    if this.line.len() < MAX_LINE - 1 {
                        this.line.push(b);
                    } else {
                        warn!("line longer than {} bytes, discarding it", MAX_LINE - 1);
                        *this.overflowed = true;
                    }
                }
                Poll::Ready(None) => {
                    return Poll::Ready(if this.line.is_empty() {
                        None
                    } else {
                        this.line.push(b'\n');
                        Some(Ok(core::mem::take(this.line)))
                    });
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::LineFramer;
    use crate::{types::MAX_LINE, Error};
    use futures::stream::{self, StreamExt};

    fn frame(input: &[u8]) -> Vec<Result<Vec<u8>, Error>> {
        let strm = LineFramer::new(stream::iter(input.iter().copied()));
        futures_executor::block_on(
            strm.map(|l| l.map(|l| l.as_bytes().to_vec()))
                .collect::<Vec<_>>(),
        )
    }

    fn ok(line: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(line.to_vec())
    }

    #[test]
    fn lines_keep_their_terminator() {
        assert_eq!(frame(b"G1 X1\nG1 X2\r"), [ok(b"G1 X1\n"), ok(b"G1 X2\r")]);
    }

    #[test]
    fn empty_lines_and_crlf_pairs_are_skipped() {
        assert_eq!(frame(b"\r\nG1\r\n\n\nM29\r\n"), [ok(b"G1\r"), ok(b"M29\r")]);
    }

    #[test]
    fn a_trailing_line_is_closed_at_the_end_of_input() {
        assert_eq!(frame(b"G1\nG28"), [ok(b"G1\n"), ok(b"G28\n")]);
        assert!(frame(b"").is_empty());
    }

    #[test]
    fn the_longest_line_that_fits_is_kept() {
        let mut input = vec![b'x'; MAX_LINE - 1];
        input.push(b'\n');
        let lines = frame(&input);
        assert_eq!(lines, [Ok(input)]);
    }

    #[test]
    fn overlong_lines_are_discarded() {
        let mut input = vec![b'x'; MAX_LINE];
        input.extend_from_slice(b"\r\nG1\n");
        input.extend(core::iter::repeat(b'y').take(MAX_LINE + 5));
        assert_eq!(
            frame(&input),
            [Err(Error::LineTooLong), ok(b"G1\n"), Err(Error::LineTooLong)]
        );
    }
}
