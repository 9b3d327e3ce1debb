//! Where accepted lines go: to the command dispatcher, or to storage while a file is being
//! written with `M28`..`M29`.

use core::fmt;

use log::{debug, warn};

use crate::{
    types::{Command, LineBuffer},
    Error,
};

/// A reply to the host. `Display` gives the wire text, without the line terminator.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Reply {
    Ok,
    /// Resend starting from this line number.
    Resend(u32),
    ExpectedChecksum(u8),
    ExpectedLineNumber(u32),
    DoneSavingFile,
    WriteFailed,
    OpenFailed,
    NumberOverflow,
    LineTooLong,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => f.write_str("ok"),
            Reply::Resend(n) => write!(f, "rs {}", n),
            Reply::ExpectedChecksum(sum) => write!(f, "Expected checksum {}", sum),
            Reply::ExpectedLineNumber(n) => write!(f, "Expected line number {}", n),
            Reply::DoneSavingFile => f.write_str("Done saving file"),
            Reply::WriteFailed => f.write_str("error writing to file"),
            Reply::OpenFailed => f.write_str("error opening file"),
            Reply::NumberOverflow => f.write_str("error: number overflow"),
            Reply::LineTooLong => f.write_str("error: line too long"),
        }
    }
}

/// The link back to the host.
pub trait Transport {
    fn reply(&mut self, reply: Reply);
}

#[cfg(feature = "std")]
impl Transport for std::vec::Vec<Reply> {
    fn reply(&mut self, reply: Reply) {
        self.push(reply)
    }
}

/// Executes accepted commands.
pub trait Dispatcher {
    /// Runs the command. Returns `false` if the command already answered the host and the
    /// default `ok` must not be sent.
    ///
    /// The record is mutable so that mode commands (G20/G21, G90/G91, M110) can update the
    /// session state it carries.
    fn process(&mut self, command: &mut Command) -> bool;
}

/// Persistent storage for captured files.
pub trait Storage {
    type Error: fmt::Debug;

    fn create(&mut self, name: &[u8]) -> Result<(), Self::Error>;
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;
    fn close(&mut self) -> Result<(), Self::Error>;
}

pub struct Router<D, S, T> {
    dispatcher: D,
    storage: S,
    transport: T,
    capturing: bool,
}

impl<D, S, T> Router<D, S, T>
where
    D: Dispatcher,
    S: Storage,
    T: Transport,
{
    pub fn new(dispatcher: D, storage: S, transport: T) -> Self {
        Self {
            dispatcher,
            storage,
            transport,
            capturing: false,
        }
    }

    /// Whether lines are currently written to storage instead of executed.
    pub fn capturing(&self) -> bool {
        self.capturing
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Handles the outcome of one line.
    pub fn route(&mut self, verdict: Result<(), Error>, command: &mut Command, line: &mut LineBuffer) {
        match verdict {
            Ok(()) if self.capturing => self.capture(command, line),
            Ok(()) => self.execute(command),
            Err(e) => self.reject(e, command),
        }
    }

    /// Answers a line that must not be executed or stored.
    ///
    /// Sequence and checksum errors ask for a resend. A line that did not fit its buffer would
    /// overflow again, so it only gets an error.
    pub fn reject(&mut self, error: Error, command: &Command) {
        match error {
            Error::BadLineNumber(expected) => {
                self.transport.reply(Reply::ExpectedLineNumber(expected));
                self.request_resend(command);
            }
            Error::BadChecksum(sum) => {
                self.transport.reply(Reply::ExpectedChecksum(sum));
                self.request_resend(command);
            }
            Error::LineTooLong => self.transport.reply(Reply::LineTooLong),
            e => {
                warn!("unexpected line verdict: {}", e);
                self.request_resend(command);
            }
        }
    }

    /// Asks the host to send again from the line it should have sent.
    pub fn request_resend(&mut self, command: &Command) {
        self.transport
            .reply(Reply::Resend(command.expected_line_number()));
    }

    fn execute(&mut self, command: &mut Command) {
        if command.malformed() {
            self.transport.reply(Reply::NumberOverflow);
            return;
        }

        if command.m_code() == Some(28) {
            self.begin_capture(command);
            return;
        }

        if self.dispatcher.process(command) {
            self.transport.reply(Reply::Ok);
        }
    }

    fn begin_capture(&mut self, command: &Command) {
        let name = &command.filename;
        if name.is_empty() || name.truncated() {
            warn!("refusing to open file: {}", Error::FilenameTruncated);
            self.transport.reply(Reply::OpenFailed);
            return;
        }
        match self.storage.create(name.as_bytes()) {
            Ok(()) => {
                debug!("capturing lines to file");
                self.capturing = true;
                self.transport.reply(Reply::Ok);
            }
            Err(e) => {
                warn!("cannot open file: {:?}", e);
                self.transport.reply(Reply::OpenFailed);
            }
        }
    }

    fn capture(&mut self, command: &Command, line: &mut LineBuffer) {
        match command.m_code() {
            Some(29) => {
                self.capturing = false;
                match self.storage.close() {
                    Ok(()) => {
                        debug!("file capture done");
                        self.transport.reply(Reply::DoneSavingFile);
                    }
                    // the tail of the file may not have reached the medium
                    Err(e) => {
                        warn!("closing file: {:?}", e);
                        self.transport.reply(Reply::WriteFailed);
                    }
                }
            }
            // other file commands are acknowledged, not stored
            Some(20..=28) => self.transport.reply(Reply::Ok),
            _ => {
                line.terminate_with_lf();
                match self.storage.write(line.as_bytes()) {
                    Ok(()) => self.transport.reply(Reply::Ok),
                    Err(e) => {
                        warn!("writing to file: {:?}", e);
                        self.transport.reply(Reply::WriteFailed);
                    }
                }
            }
        }
    }
}
