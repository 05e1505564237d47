use std::io::{self, Write};
use std::str;

use errors::*;

pub const FIELD_SEPARATOR: u8 = b'\t';
pub const RECORD_TERMINATOR: u8 = b'\n';

/// `IntermediateRecord` is one `key<TAB>value` line of an intermediate stream, borrowed from the
/// line buffer it was parsed from.
///
/// Fields are never escaped: a key containing a tab or a newline cannot be represented.
#[derive(Debug, PartialEq)]
pub struct IntermediateRecord<'a> {
    pub key: &'a [u8],
    pub value: i64,
}

impl<'a> IntermediateRecord<'a> {
    pub fn new(key: &'a [u8], value: i64) -> Self {
        IntermediateRecord { key, value }
    }

    /// Parses a line (without its terminator), splitting on the first tab.
    pub fn parse(line: &'a [u8]) -> Result<Self> {
        let separator = match line.iter().position(|byte| *byte == FIELD_SEPARATOR) {
            Some(index) => index,
            None => return Err(parse_error(line)),
        };

        let value = str::from_utf8(&line[separator + 1..])
            .ok()
            .and_then(|value| value.parse::<i64>().ok());

        match value {
            Some(value) => Ok(IntermediateRecord {
                key: &line[..separator],
                value,
            }),
            None => Err(parse_error(line)),
        }
    }

    pub fn write_to<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        write_record(sink, self.key, self.value)
    }
}

/// `FinalRecord` is one aggregated `key<TAB>count` line of a reduce output.
#[derive(Clone, Debug, PartialEq)]
pub struct FinalRecord {
    pub key: Vec<u8>,
    pub count: i64,
}

impl FinalRecord {
    pub fn write_to<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        write_record(sink, &self.key, self.count)
    }
}

fn write_record<W: Write>(sink: &mut W, key: &[u8], value: i64) -> io::Result<()> {
    sink.write_all(key)?;
    sink.write_all(&[FIELD_SEPARATOR])?;
    write!(sink, "{}", value)?;
    sink.write_all(&[RECORD_TERMINATOR])
}

fn parse_error(line: &[u8]) -> Error {
    ErrorKind::ParseError(String::from_utf8_lossy(line).into_owned()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_record() {
        let record = IntermediateRecord::parse(b"hello\t1").unwrap();

        assert_eq!(b"hello", record.key);
        assert_eq!(1, record.value);
    }

    #[test]
    fn parse_rejects_extra_fields() {
        let err = IntermediateRecord::parse(b"hello\t1\t2").unwrap_err();
        match *err.kind() {
            ErrorKind::ParseError(ref line) => assert_eq!("hello\t1\t2", line),
            ref kind => panic!("unexpected error kind {:?}", kind),
        }
    }

    #[test]
    fn parse_missing_separator() {
        match *IntermediateRecord::parse(b"orphan").unwrap_err().kind() {
            ErrorKind::ParseError(ref line) => assert_eq!("orphan", line),
            ref kind => panic!("unexpected error kind {:?}", kind),
        }
    }

    #[test]
    fn parse_non_numeric_value() {
        assert!(IntermediateRecord::parse(b"word\tmany").is_err());
        assert!(IntermediateRecord::parse(b"word\t").is_err());
        assert!(IntermediateRecord::parse(b"word\t1.5").is_err());
    }

    #[test]
    fn parse_signed_values() {
        assert_eq!(-3, IntermediateRecord::parse(b"word\t-3").unwrap().value);
        assert_eq!(12, IntermediateRecord::parse(b"word\t12").unwrap().value);
    }

    #[test]
    fn write_record_format() {
        let mut sink = Vec::new();
        IntermediateRecord::new(b"token", 1).write_to(&mut sink).unwrap();
        let record = FinalRecord {
            key: b"token".to_vec(),
            count: 42,
        };
        record.write_to(&mut sink).unwrap();

        assert_eq!(b"token\t1\ntoken\t42\n".to_vec(), sink);
    }
}
