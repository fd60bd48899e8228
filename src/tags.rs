use crate::bech32::{bytes_to_words, int_to_words_min, words_to_bytes_trim, words_to_int};
use crate::error::Error;
use crate::features::FeatureBits;

// Tag type codes. Each code is the charset index of the mnemonic
// character BOLT 11 assigns to the field ('p', 'r', '9', ...).
pub const PAYMENT_HASH: u8 = 1;
pub const ROUTE_HINT: u8 = 3;
pub const FEATURE_BITS: u8 = 5;
pub const EXPIRY: u8 = 6;
pub const FALLBACK_ADDRESS: u8 = 9;
pub const DESCRIPTION: u8 = 13;
pub const PAYMENT_SECRET: u8 = 16;
pub const PAYEE: u8 = 19;
pub const DESCRIPTION_HASH: u8 = 23;
pub const MIN_FINAL_CLTV_EXPIRY: u8 = 24;
pub const METADATA: u8 = 27;

// Fixed payload sizes for the digest-style tags, in 5-bit words.
const HASH_WORDS: usize = 52;
const PAYEE_WORDS: usize = 53;

// Integer tags wider than this overflow u64 and are treated like any
// other malformed known tag: dropped.
const MAX_INT_WORDS: usize = 12;

/// One hop of a private route: who to ask, over which channel, and at
/// what price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHop {
    pub pubkey: [u8; 33],
    pub short_channel_id: [u8; 8],
    pub fee_base_msat: u32,
    pub fee_proportional_millionths: u32,
    pub cltv_expiry_delta: u16,
}

impl RouteHop {
    pub const SERIALIZED_LEN: usize = 51;

    fn to_bytes(&self) -> [u8; Self::SERIALIZED_LEN] {
        let mut out = [0u8; Self::SERIALIZED_LEN];
        out[..33].copy_from_slice(&self.pubkey);
        out[33..41].copy_from_slice(&self.short_channel_id);
        out[41..45].copy_from_slice(&self.fee_base_msat.to_be_bytes());
        out[45..49].copy_from_slice(&self.fee_proportional_millionths.to_be_bytes());
        out[49..51].copy_from_slice(&self.cltv_expiry_delta.to_be_bytes());
        out
    }

    fn from_bytes(chunk: &[u8]) -> Self {
        let mut pubkey = [0u8; 33];
        pubkey.copy_from_slice(&chunk[..33]);
        let mut short_channel_id = [0u8; 8];
        short_channel_id.copy_from_slice(&chunk[33..41]);
        RouteHop {
            pubkey,
            short_channel_id,
            fee_base_msat: u32::from_be_bytes(chunk[41..45].try_into().unwrap()),
            fee_proportional_millionths: u32::from_be_bytes(chunk[45..49].try_into().unwrap()),
            cltv_expiry_delta: u16::from_be_bytes(chunk[49..51].try_into().unwrap()),
        }
    }
}

/// A tagged field of the invoice data section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    PaymentHash([u8; 32]),
    PaymentSecret([u8; 32]),
    Description(String),
    Metadata(Vec<u8>),
    Payee([u8; 33]),
    DescriptionHash([u8; 32]),
    /// Seconds until the request expires, from its timestamp.
    Expiry(u64),
    MinFinalCltvExpiry(u64),
    /// Raw on-chain fallback: witness/address version word plus the
    /// program or key/script hash bytes.
    FallbackAddress { version: u8, hash: Vec<u8> },
    RouteHint(Vec<RouteHop>),
    Features(FeatureBits),
}

impl Tag {
    pub fn code(&self) -> u8 {
        match self {
            Tag::PaymentHash(_) => PAYMENT_HASH,
            Tag::PaymentSecret(_) => PAYMENT_SECRET,
            Tag::Description(_) => DESCRIPTION,
            Tag::Metadata(_) => METADATA,
            Tag::Payee(_) => PAYEE,
            Tag::DescriptionHash(_) => DESCRIPTION_HASH,
            Tag::Expiry(_) => EXPIRY,
            Tag::MinFinalCltvExpiry(_) => MIN_FINAL_CLTV_EXPIRY,
            Tag::FallbackAddress { .. } => FALLBACK_ADDRESS,
            Tag::RouteHint(_) => ROUTE_HINT,
            Tag::Features(_) => FEATURE_BITS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tag::PaymentHash(_) => "payment_hash",
            Tag::PaymentSecret(_) => "payment_secret",
            Tag::Description(_) => "description",
            Tag::Metadata(_) => "metadata",
            Tag::Payee(_) => "payee",
            Tag::DescriptionHash(_) => "description_hash",
            Tag::Expiry(_) => "expiry",
            Tag::MinFinalCltvExpiry(_) => "min_final_cltv_expiry",
            Tag::FallbackAddress { .. } => "fallback_address",
            Tag::RouteHint(_) => "route_hint",
            Tag::Features(_) => "feature_bits",
        }
    }

    /// 32-byte digest tag from a hex string.
    fn digest32(hex_digest: &str, name: &str) -> Result<[u8; 32], Error> {
        let bytes = hex::decode(hex_digest)
            .map_err(|_| Error::invoice(format!("{name} is not valid hex")))?;
        bytes
            .try_into()
            .map_err(|_| Error::invoice(format!("{name} must be 32 bytes")))
    }

    pub fn payment_hash_hex(hex_digest: &str) -> Result<Tag, Error> {
        Ok(Tag::PaymentHash(Self::digest32(hex_digest, "payment_hash")?))
    }

    pub fn payment_secret_hex(hex_digest: &str) -> Result<Tag, Error> {
        Ok(Tag::PaymentSecret(Self::digest32(
            hex_digest,
            "payment_secret",
        )?))
    }

    pub fn description_hash_hex(hex_digest: &str) -> Result<Tag, Error> {
        Ok(Tag::DescriptionHash(Self::digest32(
            hex_digest,
            "description_hash",
        )?))
    }

    pub fn payee_hex(hex_key: &str) -> Result<Tag, Error> {
        let bytes =
            hex::decode(hex_key).map_err(|_| Error::invoice("payee is not valid hex"))?;
        let key: [u8; 33] = bytes
            .try_into()
            .map_err(|_| Error::invoice("payee must be a 33-byte compressed key"))?;
        Ok(Tag::Payee(key))
    }

    pub fn metadata_hex(hex_bytes: &str) -> Result<Tag, Error> {
        Ok(Tag::Metadata(hex::decode(hex_bytes).map_err(|_| {
            Error::invoice("metadata is not valid hex")
        })?))
    }

    fn payload_words(&self) -> Vec<u8> {
        match self {
            Tag::PaymentHash(hash) | Tag::PaymentSecret(hash) | Tag::DescriptionHash(hash) => {
                bytes_to_words(hash)
            }
            Tag::Payee(key) => bytes_to_words(key),
            Tag::Description(text) => bytes_to_words(text.as_bytes()),
            Tag::Metadata(bytes) => bytes_to_words(bytes),
            Tag::Expiry(seconds) => int_to_words_min(*seconds),
            Tag::MinFinalCltvExpiry(blocks) => int_to_words_min(*blocks),
            Tag::FallbackAddress { version, hash } => {
                let mut words = vec![version & 0x1f];
                words.extend(bytes_to_words(hash));
                words
            }
            Tag::RouteHint(hops) => {
                let mut bytes = Vec::with_capacity(hops.len() * RouteHop::SERIALIZED_LEN);
                for hop in hops {
                    bytes.extend_from_slice(&hop.to_bytes());
                }
                bytes_to_words(&bytes)
            }
            Tag::Features(bits) => bits.words().to_vec(),
        }
    }

    /// Serialize as `[type][len_hi][len_lo][payload...]`.
    pub fn to_words(&self) -> Result<Vec<u8>, Error> {
        let payload = self.payload_words();
        if payload.len() > 1023 {
            return Err(Error::invoice(format!(
                "{} payload of {} words exceeds the 10-bit length field",
                self.name(),
                payload.len()
            )));
        }
        let mut words = Vec::with_capacity(3 + payload.len());
        words.push(self.code());
        words.push((payload.len() >> 5) as u8);
        words.push((payload.len() & 0x1f) as u8);
        words.extend(payload);
        Ok(words)
    }

    /// Dispatch one sliced payload by type code. `None` means the tag is
    /// skipped: unknown codes for forward compatibility, known tags whose
    /// payload breaks their length or format rules.
    fn parse(code: u8, payload: &[u8]) -> Option<Tag> {
        match code {
            PAYMENT_HASH if payload.len() == HASH_WORDS => Some(Tag::PaymentHash(
                words_to_bytes_trim(payload).try_into().ok()?,
            )),
            PAYMENT_SECRET if payload.len() == HASH_WORDS => Some(Tag::PaymentSecret(
                words_to_bytes_trim(payload).try_into().ok()?,
            )),
            DESCRIPTION_HASH if payload.len() == HASH_WORDS => Some(Tag::DescriptionHash(
                words_to_bytes_trim(payload).try_into().ok()?,
            )),
            PAYEE if payload.len() == PAYEE_WORDS => {
                Some(Tag::Payee(words_to_bytes_trim(payload).try_into().ok()?))
            }
            DESCRIPTION => String::from_utf8(words_to_bytes_trim(payload))
                .ok()
                .map(Tag::Description),
            METADATA => Some(Tag::Metadata(words_to_bytes_trim(payload))),
            EXPIRY if payload.len() <= MAX_INT_WORDS => Some(Tag::Expiry(words_to_int(payload))),
            MIN_FINAL_CLTV_EXPIRY if payload.len() <= MAX_INT_WORDS => {
                Some(Tag::MinFinalCltvExpiry(words_to_int(payload)))
            }
            FALLBACK_ADDRESS if !payload.is_empty() => Some(Tag::FallbackAddress {
                version: payload[0],
                hash: words_to_bytes_trim(&payload[1..]),
            }),
            ROUTE_HINT => {
                let bytes = words_to_bytes_trim(payload);
                // Trailing bytes shorter than one hop are ignored.
                let hops = bytes
                    .chunks_exact(RouteHop::SERIALIZED_LEN)
                    .map(RouteHop::from_bytes)
                    .collect();
                Some(Tag::RouteHint(hops))
            }
            FEATURE_BITS => Some(Tag::Features(FeatureBits::from_words(payload.to_vec()))),
            _ => None,
        }
    }
}

/// Parse the tag stream between the timestamp and the signature. Skipped
/// tags leave no trace; a tag whose declared length runs past the end of
/// the stream is a hard error.
pub fn parse_stream(words: &[u8]) -> Result<Vec<Tag>, Error> {
    let mut tags = Vec::new();
    let mut pos = 0;

    while pos < words.len() {
        if pos + 3 > words.len() {
            return Err(Error::invoice("truncated tag header"));
        }
        let code = words[pos];
        let length = (words[pos + 1] as usize) * 32 + words[pos + 2] as usize;
        pos += 3;

        if pos + length > words.len() {
            return Err(Error::invoice("tag extends past end of data"));
        }
        if let Some(tag) = Tag::parse(code, &words[pos..pos + length]) {
            tags.push(tag);
        }
        pos += length;
    }

    Ok(tags)
}

/// Serialize tags in order, each with its own length framing.
pub fn encode_stream(tags: &[Tag]) -> Result<Vec<u8>, Error> {
    let mut words = Vec::new();
    for tag in tags {
        words.extend(tag.to_words()?);
    }
    Ok(words)
}
