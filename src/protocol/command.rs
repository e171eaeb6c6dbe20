//! RESP Command Views
//!
//! A client request in RESP is always an array of bulk strings:
//!
//! ```text
//! *3\r\n
//! $3\r\nSET\r\n
//! $3\r\nkey\r\n
//! $3\r\nval\r\n
//! ```
//!
//! This module defines the borrowed [`Command`] produced by the parser and a
//! small request encoder used by tests, benchmarks and the inspector tool.
//! Reply serialization lives elsewhere in the server.

use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP type prefixes understood by the command parser
pub mod prefix {
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// One decoded command whose tokens alias the input buffer.
///
/// Nothing is copied: each token is a slice of the buffer the parser was
/// given, so a `Command` can't outlive that buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command<'a> {
    tokens: Vec<&'a [u8]>,
    consumed: usize,
}

impl<'a> Command<'a> {
    pub(crate) fn new(tokens: Vec<&'a [u8]>, consumed: usize) -> Self {
        Self { tokens, consumed }
    }

    /// All tokens in declaration order.
    #[inline]
    pub fn tokens(&self) -> &[&'a [u8]] {
        &self.tokens
    }

    /// Consumes the command, returning its tokens.
    pub fn into_tokens(self) -> Vec<&'a [u8]> {
        self.tokens
    }

    /// Exact encoded length of the frame, framing included.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Number of bulk strings in the command.
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true for `*0\r\n`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The command name (first token), if any.
    pub fn name(&self) -> Option<&'a [u8]> {
        self.tokens.first().copied()
    }

    /// Every token after the name.
    pub fn args(&self) -> &[&'a [u8]] {
        self.tokens.get(1..).unwrap_or(&[])
    }

    /// Case-insensitive comparison of the command name, the way Redis
    /// matches command names.
    pub fn name_eq_ignore_case(&self, expected: &[u8]) -> bool {
        self.name()
            .is_some_and(|name| name.eq_ignore_ascii_case(expected))
    }
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", String::from_utf8_lossy(token))?;
        }
        Ok(())
    }
}

/// Encodes a request as an array of bulk strings.
///
/// # Example
///
/// ```
/// use flashkv_core::protocol::encode_command;
///
/// let wire = encode_command(&[b"GET".as_slice(), b"name".as_slice()]);
/// assert_eq!(wire, b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
/// ```
pub fn encode_command<T: AsRef<[u8]>>(parts: &[T]) -> Vec<u8> {
    let payload: usize = parts.iter().map(|p| p.as_ref().len() + 16).sum();
    let mut buf = Vec::with_capacity(16 + payload);
    encode_command_into(parts, &mut buf);
    buf
}

/// Appends the encoding of `parts` to `buf`.
pub fn encode_command_into<T: AsRef<[u8]>>(parts: &[T], buf: &mut Vec<u8>) {
    buf.push(prefix::ARRAY);
    buf.extend_from_slice(parts.len().to_string().as_bytes());
    buf.extend_from_slice(CRLF);
    for part in parts {
        let part = part.as_ref();
        buf.push(prefix::BULK_STRING);
        buf.extend_from_slice(part.len().to_string().as_bytes());
        buf.extend_from_slice(CRLF);
        buf.extend_from_slice(part);
        buf.extend_from_slice(CRLF);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_set_command() {
        let wire = encode_command(&["SET", "key", "val"]);
        assert_eq!(wire, b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$3\r\nval\r\n");
        assert_eq!(wire.len(), 31);
    }

    #[test]
    fn test_encode_empty_command() {
        let parts: [&[u8]; 0] = [];
        assert_eq!(encode_command(&parts), b"*0\r\n");
    }

    #[test]
    fn test_encode_into_appends() {
        let mut buf = b"prefix".to_vec();
        encode_command_into(&["PING"], &mut buf);
        assert_eq!(buf, b"prefix*1\r\n$4\r\nPING\r\n");
    }

    #[test]
    fn test_command_accessors() {
        let cmd = Command::new(vec![&b"GET"[..], &b"name"[..]], 23);
        assert_eq!(cmd.len(), 2);
        assert_eq!(cmd.consumed(), 23);
        assert_eq!(cmd.name(), Some(&b"GET"[..]));
        assert_eq!(cmd.args(), &[&b"name"[..]]);
        assert!(cmd.name_eq_ignore_case(b"get"));
        assert!(!cmd.name_eq_ignore_case(b"set"));
    }

    #[test]
    fn test_empty_command_has_no_name() {
        let cmd = Command::new(Vec::new(), 4);
        assert!(cmd.is_empty());
        assert_eq!(cmd.name(), None);
        assert!(cmd.args().is_empty());
        assert!(!cmd.name_eq_ignore_case(b"PING"));
    }

    #[test]
    fn test_display() {
        let cmd = Command::new(vec![&b"SET"[..], &b"user:101"[..], &b"Ariz"[..]], 0);
        assert_eq!(cmd.to_string(), "SET user:101 Ariz");

        let binary = Command::new(vec![&b"hel\xffo"[..]], 0);
        assert_eq!(binary.to_string(), "hel\u{FFFD}o");
    }
}
