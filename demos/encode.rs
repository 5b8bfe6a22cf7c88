extern crate pct_codec;

use pct_codec::{SafeChars, Unreserved, UTF_16LE};

struct CustomSafeChars;

impl SafeChars for CustomSafeChars {
    fn is_safe(&self, byte: u8) -> bool {
        Unreserved.is_safe(byte) && !byte.is_ascii_uppercase()
    }
}

fn main() {
    // You can encode any string with the RFC 3986 encoder
    // using the [`pct_codec::encode`] function.
    println!("{}", pct_codec::encode("Hello World!"));
    // => Hello%20World%21

    // HTML forms turn spaces into `+`.
    println!("{}", pct_codec::form_encoder().encode("Hello World!"));
    // => Hello+World%21

    // You can choose which bytes are left alone by implementing the [`SafeChars`] trait.
    let encoder = pct_codec::encoder().with_safe_chars(CustomSafeChars);
    println!("{}", encoder.encode("Hello World!"));
    // => %48ello%20%57orld%21

    // Every setting can be changed, each change giving a new encoder.
    let encoder = encoder.with_charset(UTF_16LE).lower_case();
    println!("{}", encoder.encode("Hello World!"));
    // => %48%00ello%20%00%57%00orld%21%00
}
