//! URL percent-encoding and decoding.
//!
//! This crate provides an [`Encoder`] and a [`Decoder`], two immutable and
//! cheaply clonable configurations turning text into percent-encoded text and
//! back. Both are parameterized by a [`Charset`], used to convert characters to
//! bytes before escaping and escaped bytes back to characters.
//!
//! # Basic usage
//!
//! The [`encode`] and [`decode`] functions use the RFC 3986 encoder and the
//! strict UTF-8 decoder.
//!
//! ```
//! let encoded = pct_codec::encode("Hello World!");
//! assert_eq!(encoded, "Hello%20World%21");
//!
//! let decoded = pct_codec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "Hello World!");
//! ```
//!
//! Other configurations are derived from the presets returned by [`encoder`],
//! [`form_encoder`], [`decoder`] and [`lenient_decoder`].
//!
//! ```
//! use pct_codec::UTF_16BE;
//!
//! // `application/x-www-form-urlencoded`, as sent by HTML forms.
//! assert_eq!(pct_codec::form_encoder().encode("Hello World!"), "Hello+World%21");
//!
//! // Malformed escapes are kept as is by the lenient decoder.
//! assert_eq!(pct_codec::lenient_decoder().decode("100%").unwrap(), "100%");
//!
//! let decoder = pct_codec::decoder().with_charset(UTF_16BE);
//! assert_eq!(decoder.decode("%00%44%00%45").unwrap(), "DE");
//! ```
//!
//! You can choose which bytes are left unescaped by implementing the
//! [`SafeChars`] trait, or with a closure.
//!
//! ```
//! use pct_codec::{SafeChars, Unreserved};
//!
//! struct Path;
//!
//! impl SafeChars for Path {
//! 	fn is_safe(&self, byte: u8) -> bool {
//! 		Unreserved.is_safe(byte) || byte == b'/'
//! 	}
//! }
//!
//! let encoder = pct_codec::encoder().with_safe_chars(Path);
//! assert_eq!(encoder.encode("/a b/c"), "/a%20b/c");
//! ```

use std::borrow::Cow;
use std::io;

mod charset;
mod decoder;
mod encoder;

pub use charset::{Charset, UnknownCharset, SHIFT_JIS, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
pub use decoder::Decoder;
pub use encoder::{Encoder, FormUrlencoded, SafeChars, Unreserved};

/// Encoding error.
///
/// Raised by strict decoders when the input is not percent-encoded as
/// expected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidEncoding {
	/// The input ends with `%`, or with `%` and a single hex digit.
	#[error("invalid percent-encoding: incomplete trailing escape `{sequence}` at offset {offset}")]
	IncompleteEscape { offset: usize, sequence: String },

	/// A `%` is followed by characters that are not hex digits.
	#[error("invalid percent-encoding: illegal hex characters in escape `{sequence}` at offset {offset}")]
	InvalidHexDigit { offset: usize, sequence: String },
}

impl InvalidEncoding {
	/// Byte offset of the offending `%` in the input.
	pub fn offset(&self) -> usize {
		match self {
			Self::IncompleteEscape { offset, .. } | Self::InvalidHexDigit { offset, .. } => *offset,
		}
	}

	/// The malformed escape, starting with `%`.
	pub fn sequence(&self) -> &str {
		match self {
			Self::IncompleteEscape { sequence, .. } | Self::InvalidHexDigit { sequence, .. } => {
				sequence
			}
		}
	}
}

impl From<InvalidEncoding> for io::Error {
	fn from(e: InvalidEncoding) -> Self {
		io::Error::new(io::ErrorKind::InvalidData, e)
	}
}

/// Result of a function performing a percent-encoding check.
pub type Result<T> = std::result::Result<T, InvalidEncoding>;

#[inline(always)]
fn to_digit(c: char) -> Option<u8> {
	match c {
		'0'..='9' => Some(c as u8 - b'0'),
		'A'..='F' => Some(c as u8 - b'A' + 10),
		'a'..='f' => Some(c as u8 - b'a' + 10),
		_ => None,
	}
}

#[inline(always)]
fn hex_digit(nibble: u8, upper_case: bool) -> char {
	let nibble = nibble & 0x0F;
	match nibble {
		0..=9 => (b'0' + nibble) as char,
		_ if upper_case => (b'A' + nibble - 10) as char,
		_ => (b'a' + nibble - 10) as char,
	}
}

#[inline]
fn push_escape(byte: u8, upper_case: bool, out: &mut String) {
	out.push('%');
	out.push(hex_digit(byte >> 4, upper_case));
	out.push(hex_digit(byte, upper_case));
}

/// Standard RFC 3986 encoder.
///
/// UTF-8, upper case hex digits, and everything but the
/// [unreserved](Unreserved) characters escaped. Spaces become `%20`.
pub fn encoder() -> &'static Encoder {
	&encoder::RFC3986
}

/// `application/x-www-form-urlencoded` encoder.
///
/// UTF-8, upper case hex digits, and everything but the
/// [form-safe](FormUrlencoded) characters escaped. Spaces become `+`.
pub fn form_encoder() -> &'static Encoder {
	&encoder::FORM
}

/// Strict UTF-8 decoder, turning `+` into a space.
pub fn decoder() -> &'static Decoder {
	&decoder::STRICT
}

/// Lenient UTF-8 decoder, turning `+` into a space.
pub fn lenient_decoder() -> &'static Decoder {
	&decoder::LENIENT
}

/// Percent-encode all characters but the RFC 3986 unreserved ones.
///
/// See [`encoder`].
pub fn encode(s: &str) -> Cow<str> {
	encoder().encode(s)
}

/// Percent-decode in strict mode with UTF-8.
///
/// See [`decoder`].
pub fn decode(s: &str) -> Result<Cow<str>> {
	decoder().decode(s)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn digits() {
		for byte in 0..=255u8 {
			let upper = format!("{:02X}", byte);
			let lower = format!("{:02x}", byte);
			let mut escaped = String::new();
			push_escape(byte, true, &mut escaped);
			push_escape(byte, false, &mut escaped);
			assert_eq!(escaped, format!("%{}%{}", upper, lower));

			let mut chars = upper.chars();
			let high = to_digit(chars.next().unwrap()).unwrap();
			let low = to_digit(chars.next().unwrap()).unwrap();
			assert_eq!(high << 4 | low, byte);
		}

		assert_eq!(to_digit('g'), None);
		assert_eq!(to_digit('%'), None);
		assert_eq!(to_digit('٣'), None);
	}

	#[test]
	fn presets() {
		assert!(Encoder::ptr_eq(encoder(), encoder()));
		assert!(!Encoder::ptr_eq(encoder(), form_encoder()));
		assert!(!form_encoder().is_safe(b' '));
		assert!(form_encoder().space_to_plus());
		assert!(!encoder().space_to_plus());
		assert!(decoder().is_strict());
		assert!(!lenient_decoder().is_strict());
		assert!(lenient_decoder().plus_to_space());
	}

	#[test]
	fn individual_reserved() {
		let mappings = [
			("!", "%21"),
			("#", "%23"),
			("$", "%24"),
			("&", "%26"),
			("'", "%27"),
			("(", "%28"),
			(")", "%29"),
			("*", "%2A"),
			("+", "%2B"),
			(",", "%2C"),
			("/", "%2F"),
			(":", "%3A"),
			(";", "%3B"),
			("=", "%3D"),
			("?", "%3F"),
			("@", "%40"),
			("[", "%5B"),
			("]", "%5D"),
		];

		for (raw, escaped) in mappings {
			assert_eq!(encode(raw), escaped);
			assert_eq!(decode(escaped).unwrap(), raw);
			assert_eq!(lenient_decoder().decode(escaped).unwrap(), raw);
		}
	}

	#[test]
	fn error_details() {
		let e = decode("ab%zz").unwrap_err();
		assert_eq!(e.offset(), 2);
		assert_eq!(e.sequence(), "%zz");
		assert_eq!(
			e.to_string(),
			"invalid percent-encoding: illegal hex characters in escape `%zz` at offset 2"
		);

		let e = decode("ab%").unwrap_err();
		assert_eq!(
			e.to_string(),
			"invalid percent-encoding: incomplete trailing escape `%` at offset 2"
		);

		let e: io::Error = e.into();
		assert_eq!(e.kind(), io::ErrorKind::InvalidData);
	}
}
