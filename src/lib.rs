//! Encoding, signing and decoding of BOLT 11 Lightning Network payment
//! requests.
//!
//! A payment request is a bech32 string: a human-readable prefix carrying
//! the network and an optional amount, then a 35-bit timestamp, a stream
//! of tagged fields, and a recoverable ECDSA signature over everything
//! before it. [`InvoiceBuilder`] assembles the unsigned form,
//! [`Invoice::sign`] attaches the signature, and [`decode`] parses and
//! verifies a request string back into an [`Invoice`].
//!
//! ```no_run
//! use lnpayreq::{decode, InvoiceBuilder, Network, Tag};
//!
//! let unsigned = InvoiceBuilder::new(Network::Bitcoin)
//!     .satoshis(250_000)
//!     .tag(Tag::payment_hash_hex(
//!         "0001020304050607080900010203040506070809000102030405060708090102",
//!     )?)
//!     .tag(Tag::PaymentSecret([0x11; 32]))
//!     .description("1 cup coffee")
//!     .encode()?;
//! let signed = unsigned.sign(&[0x41; 32])?;
//! let invoice = decode(signed.payment_request().unwrap())?;
//! assert_eq!(invoice.satoshis(), Some(250_000));
//! # Ok::<(), lnpayreq::Error>(())
//! ```

pub mod amount;
pub mod bech32;
pub mod error;
pub mod features;
pub mod invoice;
pub mod signature;
pub mod tags;

pub use amount::{msat_to_prefix, prefix_to_msat, prefix_to_sat, sat_to_prefix};
pub use error::Error;
pub use features::{Feature, FeatureBits};
pub use invoice::{
    DEFAULT_EXPIRY, DEFAULT_MIN_FINAL_CLTV_EXPIRY, Invoice, InvoiceBuilder, Network, decode,
};
pub use tags::{RouteHop, Tag};
