use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::charset::{Charset, UTF_8};
use crate::push_escape;

pub(crate) static RFC3986: Lazy<Encoder> =
	Lazy::new(|| Encoder::from_config(Config::new(Unreserved, false)));

pub(crate) static FORM: Lazy<Encoder> =
	Lazy::new(|| Encoder::from_config(Config::new(FormUrlencoded, true)));

/// Safe-character predicate.
///
/// Instances of this trait decide which bytes an [`Encoder`] passes through
/// unescaped. Only ASCII bytes are ever submitted: bytes `0x80` and above are
/// always escaped, so the output of an encoder is always an ASCII string.
///
/// The predicate must be stateless. Any `Fn(u8) -> bool` closure that is
/// [`Send`] and [`Sync`] is a valid predicate.
///
/// # Example
///
/// ```
/// use pct_codec::{SafeChars, Unreserved};
///
/// let encoder = pct_codec::encoder()
/// 	.with_safe_chars(|b: u8| Unreserved.is_safe(b) && !b.is_ascii_uppercase());
///
/// assert_eq!(encoder.encode("Hello World!"), "%48ello%20%57orld%21");
/// ```
pub trait SafeChars: Send + Sync {
	/// Decide if the given byte can be left unescaped.
	///
	/// Note that returning `true` for `%` breaks decoding.
	fn is_safe(&self, byte: u8) -> bool;
}

impl<F> SafeChars for F
where
	F: Fn(u8) -> bool + Send + Sync,
{
	#[inline]
	fn is_safe(&self, byte: u8) -> bool {
		self(byte)
	}
}

/// RFC 3986 unreserved characters.
///
/// ASCII letters, digits and `-`, `_`, `.`, `~`, as defined by
/// [RFC 3986](https://tools.ietf.org/html/rfc3986#section-2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unreserved;

impl SafeChars for Unreserved {
	fn is_safe(&self, byte: u8) -> bool {
		matches!(byte, b'-' | b'_' | b'.' | b'~') || byte.is_ascii_alphanumeric()
	}
}

/// `application/x-www-form-urlencoded` safe characters.
///
/// ASCII letters, digits and `-`, `_`, `.`, `*`, as serialized by the
/// [URL standard](https://url.spec.whatwg.org/#urlencoded-serializing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormUrlencoded;

impl SafeChars for FormUrlencoded {
	fn is_safe(&self, byte: u8) -> bool {
		matches!(byte, b'-' | b'_' | b'.' | b'*') || byte.is_ascii_alphanumeric()
	}
}

#[derive(Clone)]
struct Config {
	charset: Charset,
	safe_chars: Arc<dyn SafeChars>,
	space_to_plus: bool,
	upper_case: bool,
}

impl Config {
	fn new<S: SafeChars + 'static>(safe_chars: S, space_to_plus: bool) -> Self {
		Self {
			charset: UTF_8,
			safe_chars: Arc::new(safe_chars),
			space_to_plus,
			upper_case: true,
		}
	}

	#[inline]
	fn is_safe(&self, byte: u8) -> bool {
		byte.is_ascii() && self.safe_chars.is_safe(byte)
	}

	#[inline]
	fn is_passed_through(&self, byte: u8) -> bool {
		self.is_safe(byte) || (self.space_to_plus && byte == b' ')
	}

	#[inline]
	fn push_byte(&self, byte: u8, out: &mut String) {
		if self.is_safe(byte) {
			out.push(byte as char)
		} else if self.space_to_plus && byte == b' ' {
			out.push('+')
		} else {
			push_escape(byte, self.upper_case, out)
		}
	}
}

/// URL encoder.
///
/// An immutable encoding configuration: charset, safe characters, space
/// handling and hex digit case. Each `with_*` method returns a new encoder,
/// or the same one if nothing changes (see [`Encoder::ptr_eq`]). Cloning is
/// cheap and encoders can be shared between threads.
///
/// # Example
///
/// ```
/// use pct_codec::UTF_16LE;
///
/// let encoder = pct_codec::encoder().with_charset(UTF_16LE).lower_case();
/// assert_eq!(encoder.encode("a\nb"), "a%0a%00b");
/// ```
#[derive(Clone)]
pub struct Encoder {
	config: Arc<Config>,
}

impl Encoder {
	/// Create a UTF-8 encoder with upper case hex digits, keeping the bytes
	/// accepted by `safe_chars` and escaping everything else, spaces included.
	pub fn new<S: SafeChars + 'static>(safe_chars: S) -> Self {
		Self::from_config(Config::new(safe_chars, false))
	}

	fn from_config(config: Config) -> Self {
		Self {
			config: Arc::new(config),
		}
	}

	fn with(&self, f: impl FnOnce(&mut Config)) -> Self {
		let mut config = (*self.config).clone();
		f(&mut config);
		Self::from_config(config)
	}

	/// Charset used to turn characters into bytes.
	#[inline]
	pub fn charset(&self) -> Charset {
		self.config.charset
	}

	/// Whether spaces are encoded as `+`.
	#[inline]
	pub fn space_to_plus(&self) -> bool {
		self.config.space_to_plus
	}

	/// Whether hex digits are upper case.
	#[inline]
	pub fn is_upper_case(&self) -> bool {
		self.config.upper_case
	}

	/// Whether the given byte is passed through unescaped.
	#[inline]
	pub fn is_safe(&self, byte: u8) -> bool {
		self.config.is_safe(byte)
	}

	/// Returns `true` if both encoders share the same configuration value.
	///
	/// ```
	/// use pct_codec::{Encoder, UTF_8};
	///
	/// let encoder = pct_codec::encoder();
	/// assert!(Encoder::ptr_eq(encoder, &encoder.with_charset(UTF_8)));
	/// assert!(!Encoder::ptr_eq(encoder, &encoder.lower_case()));
	/// ```
	#[inline]
	pub fn ptr_eq(this: &Self, other: &Self) -> bool {
		Arc::ptr_eq(&this.config, &other.config)
	}

	/// Return an encoder using the given charset.
	pub fn with_charset(&self, charset: Charset) -> Self {
		if self.config.charset == charset {
			return self.clone();
		}

		self.with(|config| config.charset = charset)
	}

	/// Return an encoder using the given safe-character predicate.
	///
	/// The predicate takes precedence over [`Encoder::encode_space_to_plus`]:
	/// if it accepts `b' '`, spaces are left alone.
	pub fn with_safe_chars<S: SafeChars + 'static>(&self, safe_chars: S) -> Self {
		let safe_chars: Arc<dyn SafeChars> = Arc::new(safe_chars);
		self.with(|config| config.safe_chars = safe_chars)
	}

	/// Return an encoder turning spaces into `+` (or not).
	pub fn encode_space_to_plus(&self, space_to_plus: bool) -> Self {
		if self.config.space_to_plus == space_to_plus {
			return self.clone();
		}

		self.with(|config| config.space_to_plus = space_to_plus)
	}

	/// Return an encoder emitting upper case hex digits.
	#[inline]
	pub fn upper_case(&self) -> Self {
		self.with_upper_case(true)
	}

	/// Return an encoder emitting lower case hex digits.
	#[inline]
	pub fn lower_case(&self) -> Self {
		self.with_upper_case(false)
	}

	fn with_upper_case(&self, upper_case: bool) -> Self {
		if self.config.upper_case == upper_case {
			return self.clone();
		}

		self.with(|config| config.upper_case = upper_case)
	}

	/// Percent-encode the given string.
	///
	/// The input is returned as is when no byte needs escaping.
	///
	/// ```
	/// assert_eq!(pct_codec::encoder().encode("Hello World!"), "Hello%20World%21");
	/// assert_eq!(pct_codec::form_encoder().encode("Hello World!"), "Hello+World%21");
	/// ```
	pub fn encode<'a>(&self, input: &'a str) -> Cow<'a, str> {
		let config = &*self.config;
		if input.bytes().all(|b| config.is_safe(b)) {
			return Cow::Borrowed(input);
		}

		let encoded = if config.charset.is_byte_transparent() {
			let bytes = config.charset.encode(input);
			// One byte is at most three characters.
			let mut encoded = String::with_capacity(bytes.len() * 3);
			for &b in bytes.iter() {
				config.push_byte(b, &mut encoded)
			}
			encoded
		} else {
			log::trace!("encoding character runs through {}", config.charset);
			self.encode_runs(input)
		};

		Cow::Owned(encoded)
	}

	/// Encode with a charset in which ASCII bytes may be part of a multi-byte
	/// character.
	///
	/// Characters passed through are emitted as is; every maximal run of other
	/// characters goes through the charset as a unit and is fully escaped.
	fn encode_runs(&self, input: &str) -> String {
		let config = &*self.config;
		let mut encoded = String::with_capacity(input.len() * 3);
		let mut run_start = None;

		for (i, c) in input.char_indices() {
			if c.is_ascii() && config.is_passed_through(c as u8) {
				if let Some(start) = run_start.take() {
					self.escape_run(&input[start..i], &mut encoded)
				}
				config.push_byte(c as u8, &mut encoded)
			} else if run_start.is_none() {
				run_start = Some(i)
			}
		}

		if let Some(start) = run_start {
			self.escape_run(&input[start..], &mut encoded)
		}

		encoded
	}

	fn escape_run(&self, run: &str, out: &mut String) {
		for &b in self.config.charset.encode(run).iter() {
			push_escape(b, self.config.upper_case, out)
		}
	}
}

impl Default for Encoder {
	/// The RFC 3986 encoder, see [`encoder`](crate::encoder).
	fn default() -> Self {
		RFC3986.clone()
	}
}

impl fmt::Debug for Encoder {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Encoder")
			.field("charset", &self.config.charset)
			.field("space_to_plus", &self.config.space_to_plus)
			.field("upper_case", &self.config.upper_case)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::charset::{SHIFT_JIS, UTF_16BE, UTF_16LE, WINDOWS_1252};

	const HTML: &str = r#"<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="en" lang="en">"#;

	#[test]
	fn rfc3986_reserved() {
		let reserved = "! # $ & ' ( ) * + , / : ; = ? @ [ ]";
		assert_eq!(
			RFC3986.encode(reserved),
			"%21%20%23%20%24%20%26%20%27%20%28%20%29%20%2A%20%2B%20%2C%20\
			 %2F%20%3A%20%3B%20%3D%20%3F%20%40%20%5B%20%5D"
		);
	}

	#[test]
	fn unreserved_is_borrowed() {
		let input = "Az09-_.~";
		assert!(matches!(RFC3986.encode(input), Cow::Borrowed("Az09-_.~")));
		assert_eq!(FORM.encode("Az09-_.*"), "Az09-_.*");
		assert_eq!(FORM.encode("~"), "%7E");
		assert_eq!(RFC3986.encode("*"), "%2A");
		assert_eq!(RFC3986.encode(""), "");
	}

	#[test]
	fn non_ascii() {
		assert_eq!(RFC3986.encode("é€"), "%C3%A9%E2%82%AC");
		assert_eq!(RFC3986.lower_case().encode("é€"), "%c3%a9%e2%82%ac");
		assert_eq!(RFC3986.with_charset(WINDOWS_1252).encode("é€"), "%E9%80");
	}

	#[test]
	fn high_bytes_are_always_escaped() {
		let encoder = RFC3986.with_safe_chars(|_: u8| true);
		assert_eq!(encoder.encode("a é"), "a %C3%A9");
	}

	#[test]
	fn custom_rules() {
		assert_eq!(
			RFC3986
				.with_safe_chars(|_: u8| false)
				.encode_space_to_plus(true)
				.encode(HTML),
			"%3C%68%74%6D%6C+%78%6D%6C%6E%73%3D%22%68%74%74%70%3A%2F%2F%77%77%77%2E%77%33%2E%6F\
			 %72%67%2F%31%39%39%39%2F%78%68%74%6D%6C%22+%78%6D%6C%3A%6C%61%6E%67%3D%22%65%6E%22\
			 +%6C%61%6E%67%3D%22%65%6E%22%3E"
		);
		assert_eq!(
			RFC3986
				.with_safe_chars(|b: u8| matches!(b, b'=' | b':' | b'<' | b'>'))
				.encode(HTML),
			"<%68%74%6D%6C%20%78%6D%6C%6E%73=%22%68%74%74%70:%2F%2F%77%77%77%2E%77%33%2E%6F%72\
			 %67%2F%31%39%39%39%2F%78%68%74%6D%6C%22%20%78%6D%6C:%6C%61%6E%67=%22%65%6E%22%20\
			 %6C%61%6E%67=%22%65%6E%22>"
		);
	}

	#[test]
	fn space_handling() {
		let everything = RFC3986.with_safe_chars(|_: u8| true);
		assert_eq!(everything.encode_space_to_plus(true).encode(" "), " ");
		let nothing = RFC3986.with_safe_chars(|_: u8| false);
		assert_eq!(nothing.encode_space_to_plus(true).encode(" "), "+");
		assert_eq!(nothing.encode_space_to_plus(false).encode(" "), "%20");
	}

	#[test]
	fn utf16_runs() {
		assert_eq!(
			RFC3986.with_charset(UTF_16LE).upper_case().encode("\n\n"),
			"%0A%00%0A%00"
		);
		assert_eq!(
			RFC3986.with_charset(UTF_16BE).lower_case().encode("\n\n"),
			"%00%0a%00%0a"
		);
		assert_eq!(
			FORM.with_charset(UTF_16BE).encode("a b\u{101}c"),
			"a+b%01%01c"
		);
	}

	#[test]
	fn multi_byte_charset_runs() {
		// The second byte of "ソ" in Shift_JIS is 0x5C, an ASCII backslash.
		let encoder = RFC3986.with_charset(SHIFT_JIS).with_safe_chars(|_: u8| true);
		assert_eq!(encoder.encode("aソb"), "a%83%5Cb");
	}

	#[test]
	fn config_identity() {
		assert!(Encoder::ptr_eq(&RFC3986, &RFC3986.with_charset(UTF_8)));
		assert!(Encoder::ptr_eq(&RFC3986, &RFC3986.upper_case()));
		assert!(!Encoder::ptr_eq(&RFC3986, &RFC3986.lower_case()));
		assert!(Encoder::ptr_eq(&RFC3986, &RFC3986.encode_space_to_plus(false)));
		assert!(!Encoder::ptr_eq(&RFC3986, &RFC3986.encode_space_to_plus(true)));
		assert!(Encoder::ptr_eq(&FORM, &FORM.with_charset(UTF_8)));
		assert!(Encoder::ptr_eq(&FORM, &FORM.upper_case()));
		assert!(!Encoder::ptr_eq(&FORM, &FORM.lower_case()));
		assert!(Encoder::ptr_eq(&FORM, &FORM.encode_space_to_plus(true)));
		assert!(!Encoder::ptr_eq(&FORM, &FORM.encode_space_to_plus(false)));
		assert!(!Encoder::ptr_eq(&RFC3986, &RFC3986.with_safe_chars(Unreserved)));
		assert!(Encoder::ptr_eq(&RFC3986, &Encoder::default()));
	}

	#[test]
	fn accessors() {
		let encoder = FORM.with_charset(UTF_16LE).lower_case();
		assert_eq!(encoder.charset(), UTF_16LE);
		assert!(encoder.space_to_plus());
		assert!(!encoder.is_upper_case());
		assert!(encoder.is_safe(b'*'));
		assert!(!encoder.is_safe(b'~'));
		assert!(!encoder.is_safe(b' '));
	}
}
