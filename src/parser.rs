//! The per byte field state machine and the end of line checks.
//!
//! ```text
//!            letter | '*'                 letter | '*' | ';' | '(' | EOL (commit)
//!   Idle ----------------> InField(f) ------------------------------------------> Idle
//!    |  ';' | '('                                     \ M23 | M28 then a letter
//!    v                                                 `----> CapturingFilename
//!   InComment(k) -- ')' (parens only) --> Idle                  |  EOL | ' ' | '*'
//!                                                               `---------------> Idle
//! ```
//! Every line terminator ends the line whatever the state.

use log::{debug, trace, warn};

use crate::{
    decimal::DecimalValue,
    types::{Command, Seen, MAX_LINE},
    units::{self, Axis, Scale},
    Error,
};

/// Runtime protocol switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParserOptions {
    /// Reject lines without an in-sequence `N` field.
    pub require_line_number: bool,
    /// Reject lines without a `*` checksum field.
    pub require_checksum: bool,
    /// Fold the `*` itself into the computed checksum.
    pub checksum_includes_asterisk: bool,
    /// With `require_line_number`, accept any `N` at or past the expected one instead of
    /// exactly the expected one.
    pub allow_line_number_skip: bool,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum Field {
    G,
    M,
    Axis(Axis),
    F,
    S,
    P,
    N,
    Checksum,
    Unknown(u8),
}

impl Field {
    fn from_byte(b: u8) -> Self {
        match b {
            b'G' => Field::G,
            b'M' => Field::M,
            b'X' => Field::Axis(Axis::X),
            b'Y' => Field::Axis(Axis::Y),
            b'Z' => Field::Axis(Axis::Z),
            b'E' => Field::Axis(Axis::E),
            b'F' => Field::F,
            b'S' => Field::S,
            b'P' => Field::P,
            b'N' => Field::N,
            b'*' => Field::Checksum,
            b => Field::Unknown(b),
        }
    }

    fn seen(self) -> Seen {
        match self {
            Field::G => Seen::G,
            Field::M => Seen::M,
            Field::Axis(Axis::X) => Seen::X,
            Field::Axis(Axis::Y) => Seen::Y,
            Field::Axis(Axis::Z) => Seen::Z,
            Field::Axis(Axis::E) => Seen::E,
            Field::F => Seen::F,
            Field::S => Seen::S,
            Field::P => Seen::P,
            Field::N => Seen::N,
            Field::Checksum => Seen::CHECKSUM,
            Field::Unknown(_) => Seen::empty(),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum Comment {
    SemiColon,
    Parens,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum ParserState {
    Idle,
    InField(Field),
    InComment(Comment),
    CapturingFilename,
}

fn narrow<T: TryFrom<i64>>(v: i64) -> Result<T, Error> {
    T::try_from(v).map_err(|_| Error::NumberOverflow)
}

fn is_eol(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}

pub struct Parser {
    options: ParserOptions,
    scale: Scale,
    state: ParserState,
    value: DecimalValue,
    command: Command,
}

impl Parser {
    pub fn new(options: ParserOptions, scale: Scale) -> Self {
        Self {
            options,
            scale,
            state: ParserState::Idle,
            value: DecimalValue::new(),
            command: Command::default(),
        }
    }

    /// The record for the line being received.
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn command_mut(&mut self) -> &mut Command {
        &mut self.command
    }

    /// Consumes one byte.
    ///
    /// When the byte ends a line, the line is checked and `on_line` is called with the verdict
    /// and the record, after which the record is reset for the next line. Returns whether the
    /// byte ended a line.
    pub fn push<F>(&mut self, raw: u8, on_line: F) -> bool
    where
        F: FnOnce(Result<(), Error>, &mut Command),
    {
        if self.options.checksum_includes_asterisk {
            self.sum(raw);
        }

        let b = raw.to_ascii_uppercase();
        self.step(raw, b);

        if !self.options.checksum_includes_asterisk {
            self.sum(raw);
        }

        if is_eol(b) {
            self.end_of_line(on_line);
            true
        } else {
            false
        }
    }

    fn sum(&mut self, raw: u8) {
        if !self.command.has(Seen::CHECKSUM) {
            self.command.checksum_computed ^= raw;
        }
    }

    fn step(&mut self, raw: u8, b: u8) {
        if let ParserState::InField(field) = self.state {
            if b.is_ascii_uppercase() || matches!(b, b'*' | b';' | b'(') || is_eol(b) {
                self.commit(field, b);
            }
        }

        match self.state {
            ParserState::CapturingFilename => match b {
                b'\r' | b'\n' | b' ' | b'*' => {
                    self.state = ParserState::Idle;
                    self.idle(b);
                }
                _ => {
                    let already = self.command.filename.truncated();
                    if let Err(e) = self.command.filename.push(raw) {
                        if !already {
                            warn!("{} after {} bytes", e, MAX_LINE);
                        }
                    }
                }
            },
            ParserState::InComment(Comment::Parens) => {
                if b == b')' {
                    self.state = ParserState::Idle;
                }
            }
            ParserState::InComment(Comment::SemiColon) => {}
            ParserState::InField(_) => {
                // `-` and `.` only affect the value, never the field
                self.value.push(b);
            }
            ParserState::Idle => self.idle(b),
        }
    }

    fn idle(&mut self, b: u8) {
        match b {
            b'A'..=b'Z' | b'*' => self.start(Field::from_byte(b)),
            b';' => self.state = ParserState::InComment(Comment::SemiColon),
            b'(' => self.state = ParserState::InComment(Comment::Parens),
            // numbers outside of a field, spaces and anything unknown
            _ => {}
        }
    }

    fn start(&mut self, field: Field) {
        self.state = ParserState::InField(field);
        self.value.clear();

        let cmd = &mut self.command;
        cmd.seen.insert(field.seen());
        // a line is either a G or an M command, the last letter wins
        match field {
            Field::G => {
                cmd.seen.remove(Seen::M);
                cmd.m = 0;
            }
            Field::M => {
                cmd.seen.remove(Seen::G);
                cmd.g = 0;
            }
            _ => {}
        }
    }

    fn commit(&mut self, field: Field, trigger: u8) {
        let value = self.value;
        self.value.clear();
        self.state = ParserState::Idle;

        let cmd = &mut self.command;
        let inches = cmd.inches();
        let res = match field {
            Field::G => units::plain(&value).and_then(narrow::<u8>).map(|g| cmd.g = g),
            Field::M => units::plain(&value).and_then(narrow::<u16>).map(|m| {
                cmd.m = m;
                // filenames do not fit the letter-number grammar: take the rest of the word raw
                if (m == 23 || m == 28) && trigger.is_ascii_uppercase() {
                    cmd.filename.clear();
                    self.state = ParserState::CapturingFilename;
                }
            }),
            Field::Axis(axis) => {
                let slot = match axis {
                    Axis::X => &mut cmd.target.x,
                    Axis::Y => &mut cmd.target.y,
                    Axis::Z => &mut cmd.target.z,
                    Axis::E => &mut cmd.target.e,
                };
                self.scale
                    .axis(axis, &value, inches)
                    .and_then(narrow::<i32>)
                    .map(|v| *slot = v)
            }
            Field::F => units::feed(&value, inches)
                .and_then(narrow::<u32>)
                .map(|f| cmd.target.f = f),
            Field::S => units::plain(&value).and_then(narrow::<i16>).map(|s| cmd.s = s),
            Field::P => units::pause(&value, cmd.g_code() == Some(4))
                .and_then(narrow::<u16>)
                .map(|p| cmd.p = p),
            Field::N => units::plain(&value).and_then(narrow::<u32>).map(|n| cmd.n = n),
            Field::Checksum => {
                let received = units::plain(&value).and_then(narrow::<u8>).ok();
                cmd.checksum_received = received;
                Ok(())
            }
            Field::Unknown(_) => Ok(()),
        };

        match res {
            Ok(()) => trace!("{:?} <- {:?}", field, value),
            Err(e) => {
                warn!("dropping field {:?}: {}", field, e);
                cmd.seen.remove(field.seen());
                cmd.malformed = true;
            }
        }
    }

    fn check(&self) -> Result<(), Error> {
        let cmd = &self.command;
        if self.options.require_line_number {
            let in_sequence = cmd.has(Seen::N)
                && if self.options.allow_line_number_skip {
                    cmd.n >= cmd.expected_n
                } else {
                    cmd.n == cmd.expected_n
                };
            if !in_sequence {
                return Err(Error::BadLineNumber(cmd.expected_n));
            }
        }

        let matches = cmd.checksum_received == Some(cmd.checksum_computed);
        let accepted = if self.options.require_checksum {
            cmd.has(Seen::CHECKSUM) && matches
        } else {
            !cmd.has(Seen::CHECKSUM) || matches
        };
        if accepted {
            Ok(())
        } else {
            Err(Error::BadChecksum(cmd.checksum_computed))
        }
    }

    fn end_of_line<F>(&mut self, on_line: F)
    where
        F: FnOnce(Result<(), Error>, &mut Command),
    {
        let verdict = self.check();
        match verdict {
            Ok(()) => {
                if self.command.has(Seen::N) {
                    self.command.expected_n = self.command.n.saturating_add(1);
                }
                debug!(
                    "line accepted: G{:?} M{:?} {:?}",
                    self.command.g_code(),
                    self.command.m_code(),
                    self.command.target
                );
            }
            Err(e) => warn!("line rejected: {}", e),
        }

        on_line(verdict, &mut self.command);

        self.command.reset_line();
        self.value.clear();
        self.state = ParserState::Idle;
    }
}
