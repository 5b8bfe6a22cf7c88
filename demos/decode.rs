extern crate pct_codec;

fn main() -> pct_codec::Result<()> {
    // Strict decoding fails on malformed escapes.
    let decoded = pct_codec::decode("Hello%20World%21")?;
    println!("{}", decoded);
    // => Hello World!

    if let Err(e) = pct_codec::decode("100%") {
        println!("{}", e);
        // => invalid percent-encoding: incomplete trailing escape `%` at offset 3
    }

    // Lenient decoding keeps them as is, and still decodes what follows.
    let decoded = pct_codec::lenient_decoder().decode("a%4%44")?;
    println!("{}", decoded);
    // => a%4D

    Ok(())
}
