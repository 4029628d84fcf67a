//! Text encodings and slicing helpers shared by the hash schemes.
//!
//! bcrypt uses its own base-64 alphabet. It orders the symbols differently from RFC 4648
//! base64 and doesn't pad, so the two are not interchangeable even though both map six bits
//! to one symbol.

const RADIX64_ALPHABET: &[u8; 64] =
    b"./ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn radix64_value(symbol: u8) -> Option<u32> {
    match symbol {
        b'.' => Some(0),
        b'/' => Some(1),
        b'A'..=b'Z' => Some(u32::from(symbol - b'A') + 2),
        b'a'..=b'z' => Some(u32::from(symbol - b'a') + 28),
        b'0'..=b'9' => Some(u32::from(symbol - b'0') + 54),
        _ => None,
    }
}

/// Encodes `bytes` with the bcrypt alphabet. The output has `ceil(8 * len / 6)` symbols.
pub fn encode_radix64(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 4 + 2) / 3);
    for chunk in bytes.chunks(3) {
        let mut group = 0u32;
        for (i, byte) in chunk.iter().enumerate() {
            group |= u32::from(*byte) << (16 - 8 * i);
        }
        for i in 0..=chunk.len() {
            let index = (group >> (18 - 6 * i)) & 0x3f;
            out.push(char::from(RADIX64_ALPHABET[index as usize]));
        }
    }
    out
}

/// Decodes bcrypt radix-64 text.
///
/// Returns `None` for symbols outside the alphabet, for a length that can't come out of
/// [`encode_radix64`] and for non-zero padding bits in the last symbol. The last rule keeps
/// decoding injective, so re-encoding the result always reproduces `text`.
pub fn decode_radix64(text: &str) -> Option<Vec<u8>> {
    let symbols = text.as_bytes();
    if symbols.len() % 4 == 1 {
        return None;
    }
    let mut out = Vec::with_capacity(symbols.len() * 3 / 4);
    for chunk in symbols.chunks(4) {
        let mut group = 0u32;
        for (i, symbol) in chunk.iter().enumerate() {
            group |= radix64_value(*symbol)? << (18 - 6 * i);
        }
        let produced = chunk.len() - 1;
        let unused_bits = 24 - 8 * produced;
        if group & ((1 << unused_bits) - 1) != 0 {
            return None;
        }
        for i in 0..produced {
            out.push((group >> (16 - 8 * i)) as u8);
        }
    }
    Some(out)
}

/// Whether `symbol` belongs to the crypt(3) alphabet `./0-9A-Za-z`.
pub fn is_crypt_symbol(symbol: u8) -> bool {
    symbol == b'.' || symbol == b'/' || symbol.is_ascii_alphanumeric()
}

/// Splits off the first `count` characters of an ASCII string.
pub fn split_chars(text: &str, count: usize) -> Option<(&str, &str)> {
    if !text.is_ascii() || text.len() < count {
        return None;
    }
    Some(text.split_at(count))
}

/// Splits `text` at the first `delim`, dropping the delimiter.
pub fn split_delim(text: &str, delim: char) -> Option<(&str, &str)> {
    let index = text.find(delim)?;
    Some((&text[..index], &text[index + delim.len_utf8()..]))
}
