use bitcoin_hashes::sha256;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

use crate::bech32::words_to_bytes_padded;
use crate::error::Error;

/// The digest a payment request signature commits to: SHA-256 over the
/// HRP bytes followed by the data words packed into bytes with the final
/// partial byte zero-extended.
pub fn signing_digest(hrp: &str, data_words: &[u8]) -> [u8; 32] {
    let mut preimage = hrp.as_bytes().to_vec();
    preimage.extend(words_to_bytes_padded(data_words));
    sha256::Hash::hash(&preimage).to_byte_array()
}

/// Deterministic low-S ECDSA over the digest, plus the 2-bit recovery
/// flag. The flag is discovered by recovering a candidate key for each
/// `v` and picking the one that matches the signer; no match on any of
/// the four is a signature failure.
pub fn sign_recoverable(digest: [u8; 32], secret: &SecretKey) -> Result<([u8; 64], u8), Error> {
    let secp = Secp256k1::new();
    let msg = Message::from_digest(digest);

    let mut sig = secp.sign_ecdsa(msg, secret);
    sig.normalize_s();
    let compact = sig.serialize_compact();

    let own_key = PublicKey::from_secret_key(&secp, secret);
    for flag in 0..4u8 {
        if let Ok(candidate) = recover_with_flag(&secp, msg, &compact, flag) {
            if candidate == own_key {
                return Ok((compact, flag));
            }
        }
    }
    Err(Error::InvalidSignature)
}

/// Recover the compressed payee key from `(r, s, v)`.
///
/// Low-S signatures recover directly. For historical high-S signatures
/// the stored flag refers to the normalized form, so recovery goes
/// through the compatibility ladder: `v XOR 1` with the original `s`,
/// then the original `v` with `n - s`. (The plain `(s, v)` attempt is
/// omitted for high-S input: the backend accepts high-S and would
/// yield the wrong candidate instead of failing.)
pub fn recover_pubkey(
    digest: [u8; 32],
    signature: &[u8; 64],
    recovery_flag: u8,
) -> Result<PublicKey, Error> {
    let secp = Secp256k1::new();
    let msg = Message::from_digest(digest);

    let mut parsed =
        Signature::from_compact(signature).map_err(|_| Error::InvalidSignature)?;
    parsed.normalize_s();
    let normalized = parsed.serialize_compact();

    let attempts = if normalized != *signature {
        vec![(*signature, recovery_flag ^ 1), (normalized, recovery_flag)]
    } else {
        vec![(*signature, recovery_flag)]
    };

    for (sig, flag) in &attempts {
        if let Ok(key) = recover_with_flag(&secp, msg, sig, *flag) {
            return Ok(key);
        }
    }
    Err(Error::InvalidSignature)
}

fn recover_with_flag(
    secp: &Secp256k1<secp256k1::All>,
    msg: Message,
    compact: &[u8; 64],
    flag: u8,
) -> Result<PublicKey, secp256k1::Error> {
    let recovery_id = RecoveryId::from_u8_masked(flag);
    let sig = RecoverableSignature::from_compact(compact, recovery_id)?;
    secp.recover_ecdsa(msg, &sig)
}
