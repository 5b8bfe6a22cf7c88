use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::charset::{Charset, UTF_8};
use crate::{to_digit, InvalidEncoding, Result};

pub(crate) static STRICT: Lazy<Decoder> = Lazy::new(|| {
	Decoder::from_config(Config {
		charset: UTF_8,
		plus_to_space: true,
		strict: true,
	})
});

pub(crate) static LENIENT: Lazy<Decoder> = Lazy::new(|| STRICT.lenient());

#[derive(Clone, Copy)]
struct Config {
	charset: Charset,
	plus_to_space: bool,
	strict: bool,
}

/// URL decoder.
///
/// An immutable decoding configuration: charset, `+` handling and
/// strictness. In strict mode any malformed escape is an error. In lenient
/// mode a `%` that does not start a valid escape is kept as is, and decoding
/// resumes right after it, so a valid escape following a broken one is still
/// decoded.
///
/// # Example
///
/// ```
/// let strict = pct_codec::decoder();
/// assert!(strict.decode("a%4%44").is_err());
///
/// let lenient = pct_codec::lenient_decoder();
/// assert_eq!(lenient.decode("a%4%44").unwrap(), "a%4D");
/// ```
#[derive(Clone)]
pub struct Decoder {
	config: Arc<Config>,
}

/// Outcome of reading one escape run.
struct Run {
	/// Position right after the last valid escape.
	end: usize,

	/// Malformed escape stopping the run, if any.
	malformed: Option<InvalidEncoding>,
}

impl Decoder {
	fn from_config(config: Config) -> Self {
		Self {
			config: Arc::new(config),
		}
	}

	fn with(&self, f: impl FnOnce(&mut Config)) -> Self {
		let mut config = *self.config;
		f(&mut config);
		Self::from_config(config)
	}

	/// Charset used to turn escaped bytes into characters.
	#[inline]
	pub fn charset(&self) -> Charset {
		self.config.charset
	}

	/// Whether `+` is decoded as a space.
	#[inline]
	pub fn plus_to_space(&self) -> bool {
		self.config.plus_to_space
	}

	/// Whether malformed escapes are errors.
	#[inline]
	pub fn is_strict(&self) -> bool {
		self.config.strict
	}

	/// Returns `true` if both decoders share the same configuration value.
	#[inline]
	pub fn ptr_eq(this: &Self, other: &Self) -> bool {
		Arc::ptr_eq(&this.config, &other.config)
	}

	/// Return a decoder using the given charset.
	pub fn with_charset(&self, charset: Charset) -> Self {
		if self.config.charset == charset {
			return self.clone();
		}

		self.with(|config| config.charset = charset)
	}

	/// Return a decoder turning `+` into a space (or leaving it alone).
	pub fn decode_plus_to_space(&self, plus_to_space: bool) -> Self {
		if self.config.plus_to_space == plus_to_space {
			return self.clone();
		}

		self.with(|config| config.plus_to_space = plus_to_space)
	}

	/// Return a strict decoder.
	#[inline]
	pub fn strict(&self) -> Self {
		self.with_strict(true)
	}

	/// Return a lenient decoder.
	#[inline]
	pub fn lenient(&self) -> Self {
		self.with_strict(false)
	}

	fn with_strict(&self, strict: bool) -> Self {
		if self.config.strict == strict {
			return self.clone();
		}

		self.with(|config| config.strict = strict)
	}

	/// Decode the given percent-encoded string.
	///
	/// The input is returned as is when it contains neither `%` nor, if
	/// enabled, `+`. Lenient decoders never return an error.
	///
	/// ```
	/// let decoder = pct_codec::decoder();
	/// assert_eq!(decoder.decode("%44%20%45").unwrap(), "D E");
	/// assert_eq!(decoder.decode("100%25").unwrap(), "100%");
	/// assert!(decoder.decode("%GG").is_err());
	/// assert_eq!(decoder.lenient().decode("%GG").unwrap(), "%GG");
	/// ```
	pub fn decode<'a>(&self, input: &'a str) -> Result<Cow<'a, str>> {
		let plus_to_space = self.config.plus_to_space;
		let bytes = input.as_bytes();
		if !bytes
			.iter()
			.any(|&b| b == b'%' || (plus_to_space && b == b'+'))
		{
			return Ok(Cow::Borrowed(input));
		}

		// Decoding never makes the output longer.
		let mut decoded = String::with_capacity(input.len());
		let mut scratch = Vec::new();
		// The input is only sliced at `%` and `+`, which are char boundaries.
		let mut pos = 0;
		let mut pending = 0;

		while pos < bytes.len() {
			match bytes[pos] {
				b'%' => {
					decoded.push_str(&input[pending..pos]);
					pos = self.decode_run(input, pos, &mut scratch, &mut decoded)?;
					pending = pos;
				}
				b'+' if plus_to_space => {
					decoded.push_str(&input[pending..pos]);
					decoded.push(' ');
					pos += 1;
					pending = pos;
				}
				_ => pos += 1,
			}
		}

		decoded.push_str(&input[pending..]);
		Ok(Cow::Owned(decoded))
	}

	/// Decode the escape run starting at `start`, returning the position at
	/// which the scan resumes.
	fn decode_run(
		&self,
		input: &str,
		start: usize,
		scratch: &mut Vec<u8>,
		out: &mut String,
	) -> Result<usize> {
		scratch.clear();
		let run = read_run(input, start, scratch);
		self.config.charset.decode_into(scratch, out);

		match run.malformed {
			None => Ok(run.end),
			Some(e) if self.config.strict => Err(e),
			Some(e) => {
				log::debug!("keeping malformed escape: {}", e);
				// Rewind to just after the `%`: the characters following it
				// may start a valid escape.
				out.push('%');
				Ok(run.end + 1)
			}
		}
	}
}

/// Collect the bytes of consecutive `%XX` escapes starting at `start`.
fn read_run(input: &str, start: usize, scratch: &mut Vec<u8>) -> Run {
	let bytes = input.as_bytes();
	let mut end = start;

	while bytes.get(end) == Some(&b'%') {
		match read_escape(input, end) {
			Ok(byte) => {
				scratch.push(byte);
				end += 3
			}
			Err(e) => {
				return Run {
					end,
					malformed: Some(e),
				}
			}
		}
	}

	Run {
		end,
		malformed: None,
	}
}

/// Read the escape at `offset`, which must point to a `%`.
fn read_escape(input: &str, offset: usize) -> Result<u8> {
	let mut chars = input[offset + 1..].chars();
	match (chars.next(), chars.next()) {
		(Some(high), Some(low)) => match (to_digit(high), to_digit(low)) {
			(Some(high), Some(low)) => Ok(high << 4 | low),
			_ => Err(InvalidEncoding::InvalidHexDigit {
				offset,
				sequence: format!("%{}{}", high, low),
			}),
		},
		// A lone trailing character is only incomplete if it could start an
		// escape.
		(Some(high), None) if to_digit(high).is_none() => {
			Err(InvalidEncoding::InvalidHexDigit {
				offset,
				sequence: input[offset..].to_string(),
			})
		}
		_ => Err(InvalidEncoding::IncompleteEscape {
			offset,
			sequence: input[offset..].to_string(),
		}),
	}
}

impl Default for Decoder {
	/// The strict decoder, see [`decoder`](crate::decoder).
	fn default() -> Self {
		STRICT.clone()
	}
}

impl fmt::Debug for Decoder {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Decoder")
			.field("charset", &self.config.charset)
			.field("plus_to_space", &self.config.plus_to_space)
			.field("strict", &self.config.strict)
			.finish()
	}
}
