use thiserror::Error;

/// Everything that can go wrong while encoding, signing or decoding a
/// payment request. Decoding never recovers internally except for the
/// high-S signature retry; every other anomaly surfaces as one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Structural problem: missing separator, empty HRP, truncated tag,
    /// missing required tag on encode, bad hex input.
    #[error("invalid invoice: {0}")]
    InvalidInvoice(String),

    /// Bech32 polymod mismatch, mixed-case input or a data part too short
    /// to hold the 6-word checksum.
    #[error("invalid checksum")]
    InvalidChecksum,

    /// No recovery flag yields the signer's key on sign, or the signature
    /// is unrecoverable on decode and no explicit payee tag is present.
    #[error("invalid signature")]
    InvalidSignature,

    /// Malformed or unrepresentable amount suffix.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// HRP does not start with `ln` followed by a known network prefix.
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),
}

impl Error {
    pub(crate) fn invoice(msg: impl Into<String>) -> Self {
        Error::InvalidInvoice(msg.into())
    }

    pub(crate) fn amount(msg: impl Into<String>) -> Self {
        Error::InvalidAmount(msg.into())
    }
}
