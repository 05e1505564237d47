use std::io::{self, BufRead, Read, Write};
use std::mem;
use std::str;

use intermediate::RECORD_TERMINATOR;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// ASCII token separators.
pub fn is_separator(byte: u8) -> bool {
    match byte {
        b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => true,
        _ => false,
    }
}

// Length of the UTF-8 sequence introduced by `lead`, 1 for ASCII and for bytes that cannot start a
// multi-byte sequence.
fn sequence_length(lead: u8) -> usize {
    match lead {
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => 1,
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xc0 == 0x80
}

/// `Scanner` splits a byte stream into tokens one byte at a time.
///
/// Multi-byte sequences are decoded so that Unicode whitespace such as U+00A0 or U+3000 separates
/// tokens. Bytes which do not decode are kept inside the token.
#[derive(Debug, Default)]
struct Scanner {
    token: Vec<u8>,
    pending: Vec<u8>,
}

impl Scanner {
    /// Returns true when `byte` ends a separator.
    fn push(&mut self, byte: u8) -> bool {
        if !self.pending.is_empty() {
            if is_continuation(byte) {
                self.pending.push(byte);
                if self.pending.len() < sequence_length(self.pending[0]) {
                    return false;
                }

                let separator = str::from_utf8(&self.pending)
                    .ok()
                    .and_then(|decoded| decoded.chars().next())
                    .map_or(false, char::is_whitespace);
                if separator {
                    self.pending.clear();
                } else {
                    self.flush_pending();
                }
                return separator;
            }
            self.flush_pending();
        }

        if is_separator(byte) {
            return true;
        }
        if sequence_length(byte) > 1 {
            self.pending.push(byte);
        } else {
            self.token.push(byte);
        }
        false
    }

    fn flush_pending(&mut self) {
        self.token.extend_from_slice(&self.pending);
        self.pending.clear();
    }

    fn take_token(&mut self) -> Vec<u8> {
        mem::replace(&mut self.token, Vec::new())
    }

    // A truncated sequence at end of input belongs to the last token.
    fn finish(&mut self) -> Option<Vec<u8>> {
        self.flush_pending();
        if self.token.is_empty() {
            return None;
        }
        Some(self.take_token())
    }
}

/// `Tokens` is a streaming whitespace tokenizer over any `BufRead`.
///
/// Tokens are yielded as raw bytes, runs of separators never produce empty tokens and at most one
/// token is held in memory at a time.
pub struct Tokens<R> {
    source: R,
    scanner: Scanner,
    done: bool,
}

impl<R: BufRead> Tokens<R> {
    pub fn new(source: R) -> Self {
        Tokens {
            source,
            scanner: Scanner::default(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for Tokens<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let (consumed, complete) = {
                let buf = match self.source.fill_buf() {
                    Ok(buf) => buf,
                    Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        self.done = true;
                        return Some(Err(err));
                    }
                };

                if buf.is_empty() {
                    self.done = true;
                    return self.scanner.finish().map(Ok);
                }

                let mut consumed = 0;
                let mut complete = false;
                for &byte in buf {
                    consumed += 1;
                    if self.scanner.push(byte) && !self.scanner.token.is_empty() {
                        complete = true;
                        break;
                    }
                }
                (consumed, complete)
            };

            self.source.consume(consumed);
            if complete {
                return Some(Ok(self.scanner.take_token()));
            }
        }
    }
}

/// Reads the next line into `line` with its terminator stripped.
///
/// Returns `false` at end of input.
pub fn read_line<R: BufRead>(source: &mut R, line: &mut Vec<u8>) -> io::Result<bool> {
    line.clear();
    if source.read_until(RECORD_TERMINATOR, line)? == 0 {
        return Ok(false);
    }
    if line.last() == Some(&RECORD_TERMINATOR) {
        line.pop();
    }
    Ok(true)
}

/// `append_object` copies a whole object into `sink` through a fixed-size buffer.
///
/// When the object is non-empty and does not end with a record terminator one is appended, so the
/// next object's first record cannot be glued onto this object's last one. Returns the number of
/// bytes written.
pub fn append_object<R: Read, W: Write>(source: &mut R, sink: &mut W) -> io::Result<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut written: u64 = 0;
    let mut last_byte = None;

    loop {
        let read = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        sink.write_all(&buffer[..read])?;
        last_byte = Some(buffer[read - 1]);
        written += read as u64;
    }

    if let Some(byte) = last_byte {
        if byte != RECORD_TERMINATOR {
            sink.write_all(&[RECORD_TERMINATOR])?;
            written += 1;
        }
    }
    Ok(written)
}
