//! Character sets used to turn text into bytes before escaping, and escaped
//! bytes back into text.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::{EncoderResult, Encoding};

/// Unknown charset label.
///
/// Raised by [`Charset::for_label`] when the label does not name an encoding
/// known to the [WHATWG Encoding Standard](https://encoding.spec.whatwg.org/).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown charset label `{0}`")]
pub struct UnknownCharset(pub String);

/// Character set.
///
/// A thin wrapper around an [`encoding_rs::Encoding`], comparing by identity.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

/// UTF-8, the default of every encoder and decoder.
pub static UTF_8: Charset = Charset(&encoding_rs::UTF_8_INIT);

/// UTF-16, little endian, without byte order mark.
pub static UTF_16LE: Charset = Charset(&encoding_rs::UTF_16LE_INIT);

/// UTF-16, big endian, without byte order mark.
pub static UTF_16BE: Charset = Charset(&encoding_rs::UTF_16BE_INIT);

/// windows-1252.
///
/// This is what the `iso-8859-1`, `latin1` and `us-ascii` labels resolve to.
pub static WINDOWS_1252: Charset = Charset(&encoding_rs::WINDOWS_1252_INIT);

/// Shift_JIS.
pub static SHIFT_JIS: Charset = Charset(&encoding_rs::SHIFT_JIS_INIT);

impl Charset {
	/// Wrap an existing encoding.
	///
	/// Encodings whose output encoding differs from themselves are rejected,
	/// except UTF-16 which is encoded explicitly. In practice this rules out
	/// the `replacement` pseudo-encoding, which cannot decode what it encodes.
	///
	/// ```
	/// use pct_codec::{Charset, SHIFT_JIS};
	///
	/// assert_eq!(Charset::new(encoding_rs::SHIFT_JIS).unwrap(), SHIFT_JIS);
	/// assert!(Charset::new(encoding_rs::REPLACEMENT).is_err());
	/// ```
	pub fn new(encoding: &'static Encoding) -> Result<Self, UnknownCharset> {
		let charset = Self(encoding);
		if encoding.output_encoding() != encoding && charset != UTF_16LE && charset != UTF_16BE {
			log::debug!("rejecting charset {} without a round trip", encoding.name());
			return Err(UnknownCharset(encoding.name().to_string()));
		}

		Ok(charset)
	}

	/// Look up a charset by label, ignoring case and surrounding whitespace.
	///
	/// Labels mapping to the `replacement` pseudo-encoding are rejected along
	/// with unknown ones, as nothing meaningful can be decoded with it.
	///
	/// ```
	/// use pct_codec::{Charset, UTF_16BE};
	///
	/// assert_eq!(Charset::for_label("UTF-16BE").unwrap(), UTF_16BE);
	/// assert!(Charset::for_label("utf-42").is_err());
	/// ```
	pub fn for_label(label: &str) -> Result<Self, UnknownCharset> {
		match Encoding::for_label_no_replacement(label.as_bytes()) {
			Some(encoding) => Self::new(encoding),
			None => {
				log::debug!("rejecting unknown charset label {:?}", label);
				Err(UnknownCharset(label.to_string()))
			}
		}
	}

	/// Canonical name of the charset.
	#[inline]
	pub fn name(&self) -> &'static str {
		self.0.name()
	}

	/// Whether every character of this charset is a single byte, and every
	/// ASCII character is represented by its own ASCII byte.
	///
	/// For such charsets an ASCII byte of the encoded output always stands for
	/// the ASCII character itself, so bytes can be escaped one by one.
	#[inline]
	pub(crate) fn is_byte_transparent(&self) -> bool {
		*self == UTF_8 || self.0.is_single_byte()
	}

	/// Encode the given string.
	///
	/// Characters the charset cannot represent are replaced with `?`.
	pub fn encode<'a>(&self, s: &'a str) -> Cow<'a, [u8]> {
		if *self == UTF_8 {
			Cow::Borrowed(s.as_bytes())
		} else if *self == UTF_16LE {
			Cow::Owned(s.encode_utf16().flat_map(u16::to_le_bytes).collect())
		} else if *self == UTF_16BE {
			Cow::Owned(s.encode_utf16().flat_map(u16::to_be_bytes).collect())
		} else {
			Cow::Owned(self.encode_with_substitution(s))
		}
	}

	fn encode_with_substitution(&self, mut s: &str) -> Vec<u8> {
		let mut encoder = self.0.new_encoder();
		let mut bytes = Vec::with_capacity(
			encoder
				.max_buffer_length_from_utf8_without_replacement(s.len())
				.unwrap_or(s.len()),
		);

		loop {
			let (result, read) =
				encoder.encode_from_utf8_to_vec_without_replacement(s, &mut bytes, true);
			s = &s[read..];
			match result {
				EncoderResult::InputEmpty => break,
				EncoderResult::Unmappable(_) => bytes.push(b'?'),
				EncoderResult::OutputFull => {
					let additional = encoder
						.max_buffer_length_from_utf8_without_replacement(s.len())
						.unwrap_or(s.len())
						.max(16);
					bytes.reserve(additional)
				}
			}
		}

		bytes
	}

	/// Decode the given bytes, appending the result to `out`.
	///
	/// Malformed sequences are replaced with U+FFFD.
	pub fn decode_into(&self, bytes: &[u8], out: &mut String) {
		if bytes.is_empty() {
			return;
		}

		let (decoded, _) = self.0.decode_without_bom_handling(bytes);
		out.push_str(&decoded)
	}
}

impl Default for Charset {
	#[inline]
	fn default() -> Self {
		UTF_8
	}
}

impl fmt::Debug for Charset {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl fmt::Display for Charset {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn labels() {
		assert_eq!(Charset::for_label("utf8").unwrap(), UTF_8);
		assert_eq!(Charset::for_label(" Latin1 ").unwrap(), WINDOWS_1252);
		assert_eq!(Charset::for_label("utf-16").unwrap(), UTF_16LE);
		assert_eq!(
			Charset::for_label("iso-2022-kr"),
			Err(UnknownCharset("iso-2022-kr".to_string()))
		);
	}

	#[test]
	fn replacement_is_rejected() {
		assert_eq!(
			Charset::new(encoding_rs::REPLACEMENT),
			Err(UnknownCharset("replacement".to_string()))
		);
		assert_eq!(Charset::new(encoding_rs::UTF_16BE).unwrap(), UTF_16BE);
		assert_eq!(Charset::new(encoding_rs::WINDOWS_1252).unwrap(), WINDOWS_1252);

		let charset = Charset::new(encoding_rs::EUC_KR).unwrap();
		let encoder = crate::encoder().with_charset(charset);
		let decoder = crate::decoder().with_charset(charset);
		assert_eq!(decoder.decode(&encoder.encode("a b 한국")).unwrap(), "a b 한국");
	}

	#[test]
	fn utf8_is_borrowed() {
		let encoded = UTF_8.encode("héllo");
		assert!(matches!(encoded, Cow::Borrowed(_)));
		assert_eq!(&*encoded, "héllo".as_bytes());
	}

	#[test]
	fn utf16_encoding() {
		assert_eq!(&*UTF_16LE.encode("\n\u{101}"), b"\n\x00\x01\x01");
		assert_eq!(&*UTF_16BE.encode("\n\u{101}"), b"\x00\n\x01\x01");
	}

	#[test]
	fn unmappable_characters() {
		assert_eq!(&*WINDOWS_1252.encode("é€😂"), b"\xE9\x80?");
	}

	#[test]
	fn replacement_on_decode() {
		let mut out = String::new();
		UTF_8.decode_into(&[b'a', 0xFF, b'b'], &mut out);
		assert_eq!(out, "a\u{FFFD}b");

		out.clear();
		UTF_16LE.decode_into(&[0x01, 0x01, 0x0A], &mut out);
		assert_eq!(out, "\u{101}\u{FFFD}");
	}
}
