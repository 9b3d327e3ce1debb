//! This crate implements the command intake of a RepRap style motion controller.
//!
//! Bytes are consumed one at a time, with no lookahead, and folded into a reusable [`Command`]
//! record. Numbers are accumulated as decimal fixed point values and scaled to motor steps when
//! their field completes. At the end of each line the checksum and line number are checked; a
//! bad line is answered with a resend request, a good one is routed either to the command
//! dispatcher or, while a file is being written, to storage.
//!
//! The wire protocol is the one spoken by RepRap host software:
//! ```ebnf
//! line       ::= ( [Nn] [0-9]+ )?
//!                ( [a-zA-Z] real_value? | '(' [^)]* ')' )*
//!                ( '*' [0-9]+ /* 0 to 255 */ )?
//!                ( ';' [^\n]* )? ( '\r' | '\n' )
//! real_value ::= '-'? ( [0-9]+ ( '.' [0-9]* )? | '.' [0-9]+ )
//! ```
#![cfg_attr(not(feature = "std"), no_std)]

mod decimal;
mod motion;
mod parser;
mod router;
mod session;
mod stream;
mod types;
mod units;

pub use decimal::{decimal_to_int, DecimalValue};
pub use motion::{move_e, move_xy, move_z, MotionQueue, SyntheticMove};
pub use parser::{Parser, ParserOptions};
pub use router::{Dispatcher, Reply, Router, Storage, Transport};
pub use session::Session;
pub use stream::LineFramer;
pub use types::{Command, Filename, LineBuffer, Modes, MoveKind, Seen, Target, MAX_LINE};
pub use units::{Axis, Scale, StepsPerMm};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// A numeric field did not fit its accumulator or its slot.
    NumberOverflow,
    /// The received checksum did not match. Holds the computed one.
    BadChecksum(u8),
    /// The line number was missing or out of sequence. Holds the expected one.
    BadLineNumber(u32),
    /// A filename was longer than its buffer.
    FilenameTruncated,
    /// A line did not fit its buffer and was discarded.
    LineTooLong,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NumberOverflow => write!(f, "number overflow"),
            Error::BadChecksum(sum) => write!(f, "bad checksum, expected {}", sum),
            Error::BadLineNumber(n) => write!(f, "bad line number, expected {}", n),
            Error::FilenameTruncated => write!(f, "filename truncated"),
            Error::LineTooLong => write!(f, "line too long"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
