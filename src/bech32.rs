use crate::error::Error;

/// Bech32 data alphabet, index -> character.
pub const CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// BIP-173 generator constants for the 30-bit checksum LFSR. A payment
/// request is well-formed when the polymod of hrp-expand || data folds
/// to exactly 1.
const GENERATOR: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];

fn polymod(words: impl IntoIterator<Item = u8>) -> u32 {
    let mut state = 1u32;
    for word in words {
        let carry = state >> 25;
        state = ((state & 0x01ff_ffff) << 5) ^ u32::from(word);
        for (bit, generator) in GENERATOR.iter().enumerate() {
            if (carry >> bit) & 1 == 1 {
                state ^= generator;
            }
        }
    }
    state
}

/// High halves of the HRP bytes, a zero separator, then the low halves.
fn hrp_expand(hrp: &str) -> Vec<u8> {
    let bytes = hrp.as_bytes();
    let mut expanded = Vec::with_capacity(bytes.len() * 2 + 1);
    expanded.extend(bytes.iter().map(|b| b >> 5));
    expanded.push(0);
    expanded.extend(bytes.iter().map(|b| b & 31));
    expanded
}

fn checksum_state(hrp: &str, data: &[u8], trailer: &[u8]) -> u32 {
    polymod(
        hrp_expand(hrp)
            .into_iter()
            .chain(data.iter().copied())
            .chain(trailer.iter().copied()),
    )
}

fn create_checksum(hrp: &str, data: &[u8]) -> [u8; 6] {
    let target = checksum_state(hrp, data, &[0; 6]) ^ 1;
    let mut checksum = [0u8; 6];
    for (i, word) in checksum.iter_mut().enumerate() {
        *word = ((target >> (5 * (5 - i))) & 31) as u8;
    }
    checksum
}

/// Bech32 string codec, without the 90-character length cap of BIP-173:
/// payment requests routinely exceed it.
pub struct Bech32;

impl Bech32 {
    /// Render `hrp` and 5-bit `data` words as a checksummed bech32
    /// string. Output is always lowercase.
    pub fn encode(hrp: &str, data: &[u8]) -> String {
        let checksum = create_checksum(hrp, data);

        let mut result = String::with_capacity(hrp.len() + 1 + data.len() + checksum.len());
        result.push_str(hrp);
        result.push('1');
        for &word in data.iter().chain(checksum.iter()) {
            result.push(CHARSET.as_bytes()[word as usize] as char);
        }
        result
    }

    /// Split a bech32 string into `(hrp, data_words)` with the checksum
    /// verified and stripped. All-lowercase and all-uppercase inputs are
    /// accepted; mixed case is rejected.
    pub fn decode(bech: &str) -> Result<(String, Vec<u8>), Error> {
        if bech.chars().any(|c| (c as u32) < 33 || (c as u32) > 126) {
            return Err(Error::invoice("invalid character in bech32 string"));
        }

        let bech_lower = bech.to_lowercase();
        let bech_upper = bech.to_uppercase();

        if bech != bech_lower && bech != bech_upper {
            return Err(Error::InvalidChecksum);
        }

        let bech = bech_lower;
        let pos = bech
            .rfind('1')
            .ok_or_else(|| Error::invoice("no separator found"))?;

        if pos < 1 {
            return Err(Error::invoice("empty human-readable part"));
        }
        if pos + 7 > bech.len() {
            return Err(Error::InvalidChecksum);
        }

        let hrp = &bech[..pos];
        let data_part = &bech[pos + 1..];

        let mut data = Vec::with_capacity(data_part.len());
        for c in data_part.chars() {
            let value = CHARSET
                .find(c)
                .ok_or_else(|| Error::invoice("invalid character in data part"))?;
            data.push(value as u8);
        }

        if checksum_state(hrp, &data, &[]) != 1 {
            return Err(Error::InvalidChecksum);
        }

        Ok((hrp.to_string(), data[..data.len() - 6].to_vec()))
    }
}

fn regroup(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Vec<u8> {
    let mut acc = 0u32;
    let mut bits = 0u32;
    let mut ret = Vec::new();
    let maxv = (1u32 << to_bits) - 1;
    let max_acc = (1u32 << (from_bits + to_bits - 1)) - 1;

    for value in data {
        acc = ((acc << from_bits) | (*value as u32)) & max_acc;
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            ret.push(((acc >> bits) & maxv) as u8);
        }
    }

    if pad && bits > 0 {
        ret.push(((acc << (to_bits - bits)) & maxv) as u8);
    }
    // !pad: leftover bits are dropped.

    ret
}

/// Bytes to big-endian 5-bit words, zero-padding the last word if needed.
pub fn bytes_to_words(bytes: &[u8]) -> Vec<u8> {
    regroup(bytes, 8, 5, true)
}

/// Words to bytes with leftover bits zero-extended into a final byte.
/// This is the form the signing digest preimage uses.
pub fn words_to_bytes_padded(words: &[u8]) -> Vec<u8> {
    regroup(words, 5, 8, true)
}

/// Words to bytes with leftover bits discarded. Used for payload
/// extraction where a tag's fixed word length guarantees the payload
/// ends on a byte boundary.
pub fn words_to_bytes_trim(words: &[u8]) -> Vec<u8> {
    regroup(words, 5, 8, false)
}

/// `n` as exactly `count` big-endian 5-bit words.
pub fn int_to_words_fixed(n: u64, count: usize) -> Vec<u8> {
    let mut words = vec![0u8; count];
    let mut n = n;
    for slot in words.iter_mut().rev() {
        *slot = (n & 0x1f) as u8;
        n >>= 5;
    }
    words
}

/// `n` as the minimum number of big-endian 5-bit words, at least one.
pub fn int_to_words_min(n: u64) -> Vec<u8> {
    let mut words = Vec::new();
    let mut n = n;
    while n > 0 {
        words.insert(0, (n & 0x1f) as u8);
        n >>= 5;
    }
    if words.is_empty() {
        words.push(0);
    }
    words
}

/// Big-endian base-32 reconstruction of a word slice.
pub fn words_to_int(words: &[u8]) -> u64 {
    words.iter().fold(0u64, |acc, w| (acc << 5) | (*w as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_bip173_strings_decode() {
        for s in [
            "a12uel5l",
            "an83characterlonghumanreadablepartthatcontainsthenumber1andtheexcludedcharactersbio1tt5tgs",
            "abcdef1qpzry9x8gf2tvdw0s3jn54khce6mua7lmqqqxw",
            "split1checkupstagehandshakeupstreamerranterredcaperred2y9e3w",
        ] {
            assert!(Bech32::decode(s).is_ok(), "{s}");
        }
    }

    #[test]
    fn uppercase_accepted_mixed_case_rejected() {
        assert!(Bech32::decode("A12UEL5L").is_ok());
        assert_eq!(Bech32::decode("a12UEL5L"), Err(Error::InvalidChecksum));
    }

    #[test]
    fn corrupted_checksum_rejected() {
        assert_eq!(Bech32::decode("a12uel5m"), Err(Error::InvalidChecksum));
    }

    #[test]
    fn separator_and_hrp_errors() {
        assert!(matches!(
            Bech32::decode("qpzry9x8"),
            Err(Error::InvalidInvoice(_))
        ));
        assert!(matches!(
            Bech32::decode("1qpzry9x8gf2tvdw0"),
            Err(Error::InvalidInvoice(_))
        ));
        assert_eq!(Bech32::decode("a1qqqqq"), Err(Error::InvalidChecksum));
    }

    #[test]
    fn encode_decode_round_trip() {
        let data: Vec<u8> = (0..32).chain(0..17).collect();
        let encoded = Bech32::encode("lnbc", &data);
        let (hrp, decoded) = Bech32::decode(&encoded).unwrap();
        assert_eq!(hrp, "lnbc");
        assert_eq!(decoded, data);
    }

    #[test]
    fn long_strings_are_not_rejected() {
        // BOLT 11 requests exceed the BIP-173 cap of 90 characters.
        let data = vec![0u8; 400];
        let encoded = Bech32::encode("lnbc", &data);
        assert!(encoded.len() > 90);
        assert!(Bech32::decode(&encoded).is_ok());
    }

    #[test]
    fn bytes_words_padding() {
        // 1 byte -> 2 words, 3 trailing zero bits in the second word.
        assert_eq!(bytes_to_words(&[0xff]), vec![31, 28]);
        // 5 bytes -> exactly 8 words, no padding.
        assert_eq!(bytes_to_words(&[0; 5]).len(), 8);
    }

    #[test]
    fn words_to_bytes_trim_drops_leftover_bits() {
        // 3 words = 15 bits: one full byte, 7 bits dropped.
        assert_eq!(words_to_bytes_trim(&[31, 31, 31]), vec![0xff]);
        assert_eq!(words_to_bytes_trim(&[1]), Vec::<u8>::new());
    }

    #[test]
    fn words_to_bytes_padded_extends_final_byte() {
        assert_eq!(words_to_bytes_padded(&[31, 31, 31]), vec![0xff, 0xfe]);
    }

    #[test]
    fn int_word_helpers() {
        assert_eq!(
            int_to_words_fixed(1496314658, 7),
            vec![1, 12, 18, 31, 28, 25, 2]
        );
        assert_eq!(int_to_words_min(0), vec![0]);
        assert_eq!(int_to_words_min(60), vec![1, 28]);
        assert_eq!(int_to_words_min(32), vec![1, 0]);
        assert_eq!(words_to_int(&[1, 12, 18, 31, 28, 25, 2]), 1496314658);
        assert_eq!(words_to_int(&int_to_words_min(987654321)), 987654321);
    }
}
