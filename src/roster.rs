use log::warn;
use std::io::{self, BufReader, Bytes, Read};
use thiserror::Error;

pub const DEFAULT_SEPARATOR: u8 = b',';
pub const DEFAULT_FIELD: usize = 1;

/// Where the interesting fields are on a roster line.
///
/// Fields are numbered from 1. The identifier and the password both default
/// to the first field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterLayout {
    pub separator: u8,
    pub id_field: usize,
    pub secret_field: usize,
}

impl Default for RosterLayout {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            id_field: DEFAULT_FIELD,
            secret_field: DEFAULT_FIELD,
        }
    }
}

/// One terminated physical line of the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterLine {
    /// 1-based line number
    pub number: usize,
    pub identifier: String,
    pub secret: String,
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("escape character just before end of file (line {line})")]
    TruncatedEscape { line: usize },

    #[error("could not read roster: {0}")]
    Io(#[from] io::Error),
}

/// Streams a roster one byte at a time and extracts the identifier and
/// password fields of every line.
///
/// `"` toggles quoting (a separator between quotes does not end a field) and
/// is dropped from the value. `\` takes the next byte literally, whatever it
/// is. A newline always ends the line and resets quoting, so an unbalanced
/// quote cannot swallow the rest of the file.
pub struct FieldTokenizer<R: Read> {
    bytes: Bytes<BufReader<R>>,
    layout: RosterLayout,
    line: usize,
    done: bool,
}

impl<R: Read> FieldTokenizer<R> {
    pub fn new(reader: R, layout: RosterLayout) -> Self {
        Self {
            bytes: BufReader::new(reader).bytes(),
            layout,
            line: 0,
            done: false,
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>, RosterError> {
        match self.bytes.next() {
            Some(Ok(b)) => Ok(Some(b)),
            Some(Err(e)) => Err(RosterError::Io(e)),
            None => Ok(None),
        }
    }

    fn read_line(&mut self) -> Result<Option<RosterLine>, RosterError> {
        let mut field = 1;
        let mut quoted = false;
        let mut identifier = Vec::new();
        let mut secret = Vec::new();
        let mut seen = false;

        loop {
            let b = match self.next_byte()? {
                Some(b) => b,
                None => {
                    if seen {
                        warn!(
                            "line {} has no line terminator and was ignored",
                            self.line + 1
                        );
                    }
                    return Ok(None);
                }
            };
            seen = true;

            let literal = match b {
                b'"' => {
                    quoted = !quoted;
                    continue;
                }
                b'\\' => match self.next_byte()? {
                    Some(escaped) => escaped,
                    None => {
                        return Err(RosterError::TruncatedEscape {
                            line: self.line + 1,
                        })
                    }
                },
                b'\n' => {
                    self.line += 1;
                    return Ok(Some(RosterLine {
                        number: self.line,
                        identifier: String::from_utf8_lossy(&identifier).into_owned(),
                        secret: String::from_utf8_lossy(&secret).into_owned(),
                    }));
                }
                b if b == self.layout.separator && !quoted => {
                    field += 1;
                    continue;
                }
                b => b,
            };

            if field == self.layout.id_field {
                identifier.push(literal);
            }
            if field == self.layout.secret_field {
                secret.push(literal);
            }
        }
    }
}

impl<R: Read> Iterator for FieldTokenizer<R> {
    type Item = Result<RosterLine, RosterError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
