use std::time::{SystemTime, UNIX_EPOCH};

use secp256k1::{PublicKey, Secp256k1, SecretKey};

use crate::amount;
use crate::bech32::{self, Bech32};
use crate::error::Error;
use crate::features::FeatureBits;
use crate::signature;
use crate::tags::{self, RouteHop, Tag};

/// Seconds an invoice stays payable when it carries no expiry tag.
pub const DEFAULT_EXPIRY: u64 = 3600;
/// Final-hop CLTV delta assumed when the tag is absent.
pub const DEFAULT_MIN_FINAL_CLTV_EXPIRY: u64 = 18;

const TIMESTAMP_WORDS: usize = 7;
const SIGNATURE_WORDS: usize = 104;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Bitcoin,
    Testnet,
    Signet,
    Regtest,
}

impl Network {
    pub fn prefix(self) -> &'static str {
        match self {
            Network::Bitcoin => "bc",
            Network::Testnet => "tb",
            Network::Signet => "tbs",
            Network::Regtest => "bcrt",
        }
    }

    /// Match the start of an HRP remainder (after `ln`), longest prefix
    /// first so `bcrt` is not mistaken for `bc` nor `tbs` for `tb`.
    fn split_prefix(hrp_rest: &str) -> Option<(Network, &str)> {
        for network in [
            Network::Regtest,
            Network::Signet,
            Network::Testnet,
            Network::Bitcoin,
        ] {
            if let Some(rest) = hrp_rest.strip_prefix(network.prefix()) {
                return Some((network, rest));
            }
        }
        None
    }
}

impl std::str::FromStr for Network {
    type Err = Error;

    /// Accepts an HRP prefix (`bc`) or a long name (`bitcoin`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bc" | "bitcoin" | "mainnet" => Ok(Network::Bitcoin),
            "tb" | "testnet" => Ok(Network::Testnet),
            "tbs" | "signet" => Ok(Network::Signet),
            "bcrt" | "regtest" => Ok(Network::Regtest),
            other => Err(Error::UnsupportedNetwork(other.to_string())),
        }
    }
}

/// A BOLT 11 payment request, either freshly assembled (unsigned) or
/// carrying a signature. Values are immutable; [`Invoice::sign`] returns
/// a new, complete value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    complete: bool,
    prefix: String,
    network: Network,
    amount_msat: Option<u64>,
    timestamp: u64,
    tags: Vec<Tag>,
    signature: Option<[u8; 64]>,
    recovery_flag: Option<u8>,
    payee_node_key: Option<[u8; 33]>,
    payment_request: Option<String>,
}

impl Invoice {
    /// Whether a signature is attached.
    pub fn complete(&self) -> bool {
        self.complete
    }

    /// The full human-readable prefix, e.g. `lnbc2500u`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn millisatoshis(&self) -> Option<u64> {
        self.amount_msat
    }

    /// Whole-satoshi view of the amount. Sub-satoshi invoices have
    /// millisatoshis but no satoshi value.
    pub fn satoshis(&self) -> Option<u64> {
        match self.amount_msat {
            Some(msat) if msat % 1000 == 0 => Some(msat / 1000),
            _ => None,
        }
    }

    /// Creation time, Unix seconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Every tag in original stream order, duplicates included.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn signature(&self) -> Option<&[u8; 64]> {
        self.signature.as_ref()
    }

    pub fn recovery_flag(&self) -> Option<u8> {
        self.recovery_flag
    }

    /// Compressed payee key: the explicit payee tag when present,
    /// otherwise the key recovered from the signature.
    pub fn payee_node_key(&self) -> Option<&[u8; 33]> {
        self.payee_node_key.as_ref()
    }

    /// The bech32 string, present once signed.
    pub fn payment_request(&self) -> Option<&str> {
        self.payment_request.as_deref()
    }

    pub fn payment_hash(&self) -> Option<&[u8; 32]> {
        self.tags.iter().find_map(|tag| match tag {
            Tag::PaymentHash(hash) => Some(hash),
            _ => None,
        })
    }

    pub fn payment_secret(&self) -> Option<&[u8; 32]> {
        self.tags.iter().find_map(|tag| match tag {
            Tag::PaymentSecret(secret) => Some(secret),
            _ => None,
        })
    }

    pub fn description(&self) -> Option<&str> {
        self.tags.iter().find_map(|tag| match tag {
            Tag::Description(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn description_hash(&self) -> Option<&[u8; 32]> {
        self.tags.iter().find_map(|tag| match tag {
            Tag::DescriptionHash(hash) => Some(hash),
            _ => None,
        })
    }

    pub fn metadata(&self) -> Option<&[u8]> {
        self.tags.iter().find_map(|tag| match tag {
            Tag::Metadata(bytes) => Some(bytes.as_slice()),
            _ => None,
        })
    }

    pub fn expiry(&self) -> u64 {
        self.tags
            .iter()
            .find_map(|tag| match tag {
                Tag::Expiry(seconds) => Some(*seconds),
                _ => None,
            })
            .unwrap_or(DEFAULT_EXPIRY)
    }

    pub fn min_final_cltv_expiry(&self) -> u64 {
        self.tags
            .iter()
            .find_map(|tag| match tag {
                Tag::MinFinalCltvExpiry(blocks) => Some(*blocks),
                _ => None,
            })
            .unwrap_or(DEFAULT_MIN_FINAL_CLTV_EXPIRY)
    }

    pub fn fallback_address(&self) -> Option<(u8, &[u8])> {
        self.tags.iter().find_map(|tag| match tag {
            Tag::FallbackAddress { version, hash } => Some((*version, hash.as_slice())),
            _ => None,
        })
    }

    /// All route hints, in stream order.
    pub fn route_hints(&self) -> Vec<&[RouteHop]> {
        self.tags
            .iter()
            .filter_map(|tag| match tag {
                Tag::RouteHint(hops) => Some(hops.as_slice()),
                _ => None,
            })
            .collect()
    }

    pub fn features(&self) -> Option<&FeatureBits> {
        self.tags.iter().find_map(|tag| match tag {
            Tag::Features(bits) => Some(bits),
            _ => None,
        })
    }

    /// Unix second after which the request should not be paid.
    /// Saturates rather than wrapping for absurd expiry values.
    pub fn expiry_date(&self) -> u64 {
        self.timestamp.saturating_add(self.expiry())
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expiry_date()
    }

    /// Timestamp and tag words, the portion of the data section the
    /// signature commits to. Exposed so an external signer can produce
    /// the signature out of process.
    pub fn signable_data(&self) -> Result<Vec<u8>, Error> {
        let mut words = bech32::int_to_words_fixed(self.timestamp, TIMESTAMP_WORDS);
        words.extend(tags::encode_stream(&self.tags)?);
        Ok(words)
    }

    /// Sign with the payee's key, producing the complete invoice: the
    /// 64-byte low-S signature and recovery flag are packed into 104
    /// words and appended, then the whole string is re-checksummed.
    pub fn sign(&self, secret_key: &[u8; 32]) -> Result<Invoice, Error> {
        let secret =
            SecretKey::from_byte_array(*secret_key).map_err(|_| Error::InvalidSignature)?;

        let mut data = self.signable_data()?;
        let digest = signature::signing_digest(&self.prefix, &data);
        let (sig, recovery_flag) = signature::sign_recoverable(digest, &secret)?;

        let mut sig_with_flag = sig.to_vec();
        sig_with_flag.push(recovery_flag);
        data.extend(bech32::bytes_to_words(&sig_with_flag));

        let secp = Secp256k1::new();
        let payee = PublicKey::from_secret_key(&secp, &secret).serialize();

        Ok(Invoice {
            complete: true,
            signature: Some(sig),
            recovery_flag: Some(recovery_flag),
            payee_node_key: Some(payee),
            payment_request: Some(Bech32::encode(&self.prefix, &data)),
            ..self.clone()
        })
    }
}

/// Assembles an unsigned invoice. Tags are emitted in the order they are
/// added and survive a decode round-trip in that order.
#[derive(Debug, Clone)]
pub struct InvoiceBuilder {
    network: Network,
    satoshis: Option<u64>,
    millisatoshis: Option<u64>,
    timestamp: Option<u64>,
    tags: Vec<Tag>,
}

impl InvoiceBuilder {
    pub fn new(network: Network) -> Self {
        InvoiceBuilder {
            network,
            satoshis: None,
            millisatoshis: None,
            timestamp: None,
            tags: Vec::new(),
        }
    }

    pub fn satoshis(mut self, sat: u64) -> Self {
        self.satoshis = Some(sat);
        self
    }

    pub fn millisatoshis(mut self, msat: u64) -> Self {
        self.millisatoshis = Some(msat);
        self
    }

    pub fn timestamp(mut self, unix_seconds: u64) -> Self {
        self.timestamp = Some(unix_seconds);
        self
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn description(self, text: &str) -> Self {
        self.tag(Tag::Description(text.to_string()))
    }

    pub fn expiry(self, seconds: u64) -> Self {
        self.tag(Tag::Expiry(seconds))
    }

    fn resolve_amount(&self) -> Result<Option<u64>, Error> {
        let from_sat = match self.satoshis {
            Some(sat) => Some(
                sat.checked_mul(1000)
                    .ok_or_else(|| Error::amount(format!("amount out of range: {sat} sat")))?,
            ),
            None => None,
        };
        match (from_sat, self.millisatoshis) {
            (Some(a), Some(b)) if a != b => Err(Error::amount(format!(
                "satoshi and millisatoshi amounts disagree: {a} vs {b} msat"
            ))),
            (Some(a), _) => Ok(Some(a)),
            (None, other) => Ok(other),
        }
    }

    /// Validate and produce the unsigned invoice.
    pub fn encode(self) -> Result<Invoice, Error> {
        let amount_msat = self.resolve_amount()?;

        if !self.tags.iter().any(|t| matches!(t, Tag::PaymentHash(_))) {
            return Err(Error::invoice("missing payment_hash tag"));
        }
        if !self.tags.iter().any(|t| matches!(t, Tag::PaymentSecret(_))) {
            return Err(Error::invoice("missing payment_secret tag"));
        }
        let has_description = self
            .tags
            .iter()
            .any(|t| matches!(t, Tag::Description(_) | Tag::DescriptionHash(_)));
        if !has_description {
            return Err(Error::invoice(
                "missing description or description_hash tag",
            ));
        }
        // Surface unserializable tags here rather than at signing time.
        tags::encode_stream(&self.tags)?;

        let timestamp = match self.timestamp {
            Some(ts) => ts,
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        if timestamp >> 35 != 0 {
            return Err(Error::invoice(format!(
                "timestamp {timestamp} does not fit in 35 bits"
            )));
        }

        let mut prefix = format!("ln{}", self.network.prefix());
        if let Some(msat) = amount_msat {
            prefix.push_str(&amount::msat_to_prefix(msat));
        }

        Ok(Invoice {
            complete: false,
            prefix,
            network: self.network,
            amount_msat,
            timestamp,
            tags: self.tags,
            signature: None,
            recovery_flag: None,
            payee_node_key: None,
            payment_request: None,
        })
    }
}

/// Parse and verify a payment request string.
pub fn decode(request: &str) -> Result<Invoice, Error> {
    let (hrp, data) = Bech32::decode(request)?;

    let rest = hrp
        .strip_prefix("ln")
        .ok_or_else(|| Error::UnsupportedNetwork(hrp.clone()))?;
    let (network, amount_part) =
        Network::split_prefix(rest).ok_or_else(|| Error::UnsupportedNetwork(hrp.clone()))?;

    let amount_msat = if amount_part.is_empty() {
        None
    } else {
        Some(amount::prefix_to_msat(amount_part)?)
    };

    if data.len() < TIMESTAMP_WORDS + SIGNATURE_WORDS {
        return Err(Error::invoice("data section too short for a signature"));
    }
    let (payload, sig_words) = data.split_at(data.len() - SIGNATURE_WORDS);

    let timestamp = bech32::words_to_int(&payload[..TIMESTAMP_WORDS]);
    let tags = tags::parse_stream(&payload[TIMESTAMP_WORDS..])?;

    // 104 words are exactly 65 bytes: r || s, then the recovery flag in
    // the final byte (the three pad bits ahead of it are zero).
    let sig_bytes = bech32::words_to_bytes_trim(sig_words);
    let signature: [u8; 64] = sig_bytes[..64].try_into().expect("65-byte signature block");
    let recovery_flag = sig_bytes[64] & 3;

    let digest = signature::signing_digest(&hrp, payload);
    let recovered = signature::recover_pubkey(digest, &signature, recovery_flag);

    let explicit_payee = tags.iter().find_map(|tag| match tag {
        Tag::Payee(key) => Some(*key),
        _ => None,
    });
    // An explicit payee tag wins over, and excuses a failure of, key
    // recovery.
    let payee_node_key = match explicit_payee {
        Some(key) => Some(key),
        None => Some(recovered?.serialize()),
    };

    Ok(Invoice {
        complete: true,
        prefix: hrp,
        network,
        amount_msat,
        timestamp,
        tags,
        signature: Some(signature),
        recovery_flag: Some(recovery_flag),
        payee_node_key,
        payment_request: Some(request.to_lowercase()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "e126f68f7eafcc8b74f54d269fe206be715000f94dac067d1c04a8ca3b2db734";

    fn secret_key() -> [u8; 32] {
        hex::decode(TEST_KEY).unwrap().try_into().unwrap()
    }

    fn hex_33(hex_key: &str) -> [u8; 33] {
        hex::decode(hex_key).unwrap().try_into().unwrap()
    }

    fn base_builder() -> InvoiceBuilder {
        InvoiceBuilder::new(Network::Bitcoin)
            .timestamp(1_496_314_658)
            .tag(Tag::PaymentSecret([0x11; 32]))
            .tag(
                Tag::payment_hash_hex(
                    "0001020304050607080900010203040506070809000102030405060708090102",
                )
                .unwrap(),
            )
    }

    #[test]
    fn network_prefixes_match_longest_first() {
        assert_eq!(
            Network::split_prefix("bcrt20m"),
            Some((Network::Regtest, "20m"))
        );
        assert_eq!(Network::split_prefix("tbs1"), Some((Network::Signet, "1")));
        assert_eq!(
            Network::split_prefix("tb20m"),
            Some((Network::Testnet, "20m"))
        );
        assert_eq!(Network::split_prefix("bc"), Some((Network::Bitcoin, "")));
        assert_eq!(Network::split_prefix("xy20m"), None);
    }

    #[test]
    fn encode_requires_mandatory_tags() {
        let missing_hash = InvoiceBuilder::new(Network::Bitcoin)
            .tag(Tag::PaymentSecret([0x11; 32]))
            .description("x")
            .encode();
        assert!(matches!(missing_hash, Err(Error::InvalidInvoice(_))));

        let missing_description = base_builder().encode();
        assert!(matches!(missing_description, Err(Error::InvalidInvoice(_))));

        assert!(base_builder().description("x").encode().is_ok());
    }

    #[test]
    fn encode_rejects_conflicting_amounts() {
        let conflict = base_builder()
            .description("x")
            .satoshis(1)
            .millisatoshis(1001)
            .encode();
        assert!(matches!(conflict, Err(Error::InvalidAmount(_))));

        let agree = base_builder()
            .description("x")
            .satoshis(250_000)
            .millisatoshis(250_000_000)
            .encode()
            .unwrap();
        assert_eq!(agree.prefix(), "lnbc2500u");
    }

    #[test]
    fn encode_rejects_wide_timestamps() {
        let invoice = base_builder().description("x").timestamp(1 << 35).encode();
        assert!(matches!(invoice, Err(Error::InvalidInvoice(_))));
    }

    #[test]
    fn sign_completes_the_invoice() {
        let unsigned = base_builder().description("x").encode().unwrap();
        assert!(!unsigned.complete());
        assert!(unsigned.payment_request().is_none());

        let signed = unsigned.sign(&secret_key()).unwrap();
        assert!(signed.complete());
        assert!(signed.payment_request().unwrap().starts_with("lnbc1"));
        assert_eq!(
            hex::encode(signed.payee_node_key().unwrap()),
            "03e7156ae33b0a208d0744199163177e909e80176e55d97a2f221ede0f934dd9ad"
        );
    }

    #[test]
    fn round_trip_preserves_fields() {
        let hops = vec![RouteHop {
            pubkey: hex_33("029e03a901b85534ff1e92c43c74431f7ce72046060fcf7a95c37e148f78c77255"),
            short_channel_id: [1, 2, 3, 4, 5, 6, 7, 8],
            fee_base_msat: 1,
            fee_proportional_millionths: 20,
            cltv_expiry_delta: 3,
        }];
        let unsigned = base_builder()
            .description("1 cup coffee")
            .expiry(60)
            .tag(Tag::MinFinalCltvExpiry(10))
            .tag(Tag::RouteHint(hops.clone()))
            .satoshis(250_000)
            .encode()
            .unwrap();
        let signed = unsigned.sign(&secret_key()).unwrap();

        let decoded = decode(signed.payment_request().unwrap()).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(decoded.network(), Network::Bitcoin);
        assert_eq!(decoded.satoshis(), Some(250_000));
        assert_eq!(decoded.millisatoshis(), Some(250_000_000));
        assert_eq!(decoded.timestamp(), 1_496_314_658);
        assert_eq!(decoded.description(), Some("1 cup coffee"));
        assert_eq!(decoded.expiry(), 60);
        assert_eq!(decoded.min_final_cltv_expiry(), 10);
        assert_eq!(decoded.route_hints(), vec![hops.as_slice()]);
        assert_eq!(decoded.tags(), signed.tags());
    }

    #[test]
    fn sub_satoshi_amounts_have_no_satoshi_view() {
        let signed = base_builder()
            .description("x")
            .millisatoshis(967_878_534)
            .encode()
            .unwrap()
            .sign(&secret_key())
            .unwrap();
        assert_eq!(signed.prefix(), "lnbc9678785340p");

        let decoded = decode(signed.payment_request().unwrap()).unwrap();
        assert_eq!(decoded.millisatoshis(), Some(967_878_534));
        assert_eq!(decoded.satoshis(), None);
    }

    #[test]
    fn accessors_return_first_duplicate() {
        let invoice = base_builder()
            .description("first")
            .description("second")
            .encode()
            .unwrap();
        assert_eq!(invoice.description(), Some("first"));
        assert_eq!(
            invoice
                .tags()
                .iter()
                .filter(|t| matches!(t, Tag::Description(_)))
                .count(),
            2
        );
    }

    #[test]
    fn defaults_apply_without_tags() {
        let invoice = base_builder().description("x").encode().unwrap();
        assert_eq!(invoice.expiry(), DEFAULT_EXPIRY);
        assert_eq!(
            invoice.min_final_cltv_expiry(),
            DEFAULT_MIN_FINAL_CLTV_EXPIRY
        );
        assert_eq!(invoice.expiry_date(), 1_496_314_658 + 3600);
        assert!(invoice.is_expired(1_600_000_000));
        assert!(!invoice.is_expired(1_496_314_659));
    }

    #[test]
    fn expiry_date_saturates() {
        let invoice = base_builder()
            .description("x")
            .tag(Tag::Expiry(u64::MAX))
            .encode()
            .unwrap();
        assert_eq!(invoice.expiry_date(), u64::MAX);
    }

    #[test]
    fn unknown_hrp_is_unsupported_network() {
        let signed = base_builder()
            .description("x")
            .encode()
            .unwrap()
            .sign(&secret_key())
            .unwrap();
        let request = signed.payment_request().unwrap();
        // Re-checksum the same data under a bogus HRP.
        let (_, data) = Bech32::decode(request).unwrap();
        let bogus = Bech32::encode("lnxy", &data);
        assert!(matches!(decode(&bogus), Err(Error::UnsupportedNetwork(_))));
    }
}
