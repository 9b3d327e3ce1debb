use bitflags::bitflags;

use crate::Error;

/// Capacity of a line as delivered by the transport, and of a captured filename.
pub const MAX_LINE: usize = 120;

bitflags! {
    /// The fields seen on the current line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Seen: u16 {
        const G = 1 << 0;
        const M = 1 << 1;
        const X = 1 << 2;
        const Y = 1 << 3;
        const Z = 1 << 4;
        const E = 1 << 5;
        const F = 1 << 6;
        const S = 1 << 7;
        const P = 1 << 8;
        const N = 1 << 9;
        const CHECKSUM = 1 << 10;
    }
}

bitflags! {
    /// Session options, kept across lines until a command changes them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Modes: u8 {
        /// Coordinates are deltas from the last committed position (G91).
        const RELATIVE = 1 << 0;
        /// Coordinates and feed are in inches (G20).
        const INCHES = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveKind {
    /// Built from a parsed line.
    #[default]
    Parsed,
    /// Built by the firmware for a homing sequence.
    Homing,
}

/// A position in steps, plus the raw feed rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Target {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub e: i32,
    pub f: u32,
    pub kind: MoveKind,
}

/// A filename captured from an `M23`/`M28` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filename {
    data: [u8; MAX_LINE],
    len: usize,
    truncated: bool,
}

impl Default for Filename {
    fn default() -> Self {
        Self {
            data: [0; MAX_LINE],
            len: 0,
            truncated: false,
        }
    }
}

impl Filename {
    /// Appends a byte, or records the truncation once the buffer is full.
    pub fn push(&mut self, b: u8) -> Result<(), Error> {
        if self.len < self.data.len() {
            self.data[self.len] = b;
            self.len += 1;
            Ok(())
        } else {
            self.truncated = true;
            Err(Error::FilenameTruncated)
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.truncated = false;
    }
}

/// One line as framed by the transport, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    data: [u8; MAX_LINE],
    len: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self {
            data: [0; MAX_LINE],
            len: 0,
        }
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `bytes` into a new buffer. Returns `None` if they do not fit.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let mut line = Self::new();
        line.data.get_mut(..bytes.len())?.copy_from_slice(bytes);
        line.len = bytes.len();
        Some(line)
    }

    /// Appends a byte. Returns `false` if the buffer is full.
    pub fn push(&mut self, b: u8) -> bool {
        match self.data.get_mut(self.len) {
            Some(slot) => {
                *slot = b;
                self.len += 1;
                true
            }
            None => false,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    /// Makes sure the line ends with a single `\n`, as the stored file reader expects.
    pub(crate) fn terminate_with_lf(&mut self) {
        match self.as_bytes().last() {
            Some(b'\n') => {}
            Some(b'\r') => self.data[self.len - 1] = b'\n',
            _ => {
                if !self.push(b'\n') {
                    self.data[self.len - 1] = b'\n';
                }
            }
        }
    }
}

/// Everything seen so far on the current line.
///
/// The same record is reused for every line. The line number counter and the [`Modes`] outlive
/// the line; everything else is reset when it ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub seen: Seen,
    pub modes: Modes,
    pub g: u8,
    pub m: u16,
    pub target: Target,
    pub s: i16,
    pub p: u16,
    pub n: u32,
    pub filename: Filename,
    pub(crate) expected_n: u32,
    pub(crate) checksum_computed: u8,
    pub(crate) checksum_received: Option<u8>,
    pub(crate) malformed: bool,
}

impl Default for Command {
    fn default() -> Self {
        Self {
            seen: Seen::G,
            modes: Modes::empty(),
            g: 1,
            m: 0,
            target: Target::default(),
            s: 0,
            p: 0,
            n: 0,
            filename: Filename::default(),
            expected_n: 0,
            checksum_computed: 0,
            checksum_received: None,
            malformed: false,
        }
    }
}

impl Command {
    pub fn has(&self, seen: Seen) -> bool {
        self.seen.contains(seen)
    }

    /// The G code, if this line is a G command.
    pub fn g_code(&self) -> Option<u8> {
        self.has(Seen::G).then_some(self.g)
    }

    /// The M code, if this line is an M command.
    pub fn m_code(&self) -> Option<u16> {
        self.has(Seen::M).then_some(self.m)
    }

    pub fn relative(&self) -> bool {
        self.modes.contains(Modes::RELATIVE)
    }

    pub fn set_relative(&mut self, relative: bool) {
        self.modes.set(Modes::RELATIVE, relative);
    }

    pub fn inches(&self) -> bool {
        self.modes.contains(Modes::INCHES)
    }

    pub fn set_inches(&mut self, inches: bool) {
        self.modes.set(Modes::INCHES, inches);
    }

    /// The line number the next numbered line must carry.
    pub fn expected_line_number(&self) -> u32 {
        self.expected_n
    }

    /// Restarts the line numbering, as `M110` does.
    pub fn set_expected_line_number(&mut self, n: u32) {
        self.expected_n = n;
    }

    pub fn checksum_computed(&self) -> u8 {
        self.checksum_computed
    }

    pub fn checksum_received(&self) -> Option<u8> {
        self.checksum_received
    }

    /// Whether a numeric field on this line failed to convert and was dropped.
    pub fn malformed(&self) -> bool {
        self.malformed
    }

    /// Starts a new line: forgets the fields, keeps the position, modes and numbering.
    pub(crate) fn reset_line(&mut self) {
        self.seen = Seen::G;
        self.g = 1;
        self.m = 0;
        self.checksum_computed = 0;
        self.checksum_received = None;
        self.malformed = false;
        self.filename.clear();

        if self.relative() {
            self.target.x = 0;
            self.target.y = 0;
            self.target.z = 0;
            self.target.e = 0;
        }
    }
}
