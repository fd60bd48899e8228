use clap::{Parser, Subcommand};
use serde::Serialize;

use lnpayreq::{Feature, Invoice, InvoiceBuilder, Network, Tag, decode};

#[derive(Parser)]
#[command(name = "lnpayreq")]
#[command(about = "BOLT 11 payment request encoder/decoder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and sign a payment request.
    Encode {
        #[arg(long, default_value = "bc")]
        network: Network,
        #[arg(long)]
        description: Option<String>,
        /// SHA-256 of a longer description, hex.
        #[arg(long)]
        description_hash: Option<String>,
        /// Expiry in seconds.
        #[arg(long)]
        expires: Option<u64>,
        #[arg(long)]
        min_final_cltv: Option<u64>,
        #[arg(long)]
        amount_sat: Option<u64>,
        #[arg(long)]
        amount_msat: Option<u64>,
        /// Unix seconds; defaults to now.
        #[arg(long)]
        timestamp: Option<u64>,
        /// 32-byte payment hash, hex.
        payment_hash: String,
        /// 32-byte payment secret, hex.
        payment_secret: String,
        /// 32-byte signing key, hex.
        privkey: String,
    },
    /// Parse and verify a payment request.
    Decode {
        invoice: String,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        verbose: bool,
    },
}

#[derive(Serialize)]
struct FallbackOutput {
    version: u8,
    hash: String,
}

#[derive(Serialize)]
struct HopOutput {
    pubkey: String,
    short_channel_id: String,
    fee_base_msat: u32,
    fee_proportional_millionths: u32,
    cltv_expiry_delta: u16,
}

#[derive(Serialize)]
struct FeaturesOutput {
    required: Vec<&'static str>,
    supported: Vec<&'static str>,
    extra_bits: Vec<usize>,
}

#[derive(Serialize)]
struct DecodeOutput {
    network: String,
    prefix: String,
    millisatoshis: Option<u64>,
    satoshis: Option<u64>,
    timestamp: u64,
    expiry: u64,
    expiry_date: u64,
    min_final_cltv_expiry: u64,
    payment_hash: Option<String>,
    payment_secret: Option<String>,
    description: Option<String>,
    description_hash: Option<String>,
    metadata: Option<String>,
    payee_node_key: Option<String>,
    fallback_address: Option<FallbackOutput>,
    route_hints: Vec<Vec<HopOutput>>,
    features: Option<FeaturesOutput>,
    signature: String,
    recovery_flag: u8,
}

impl DecodeOutput {
    fn from_invoice(invoice: &Invoice) -> Self {
        let features = invoice.features().map(|bits| FeaturesOutput {
            required: Feature::ALL
                .iter()
                .filter(|f| bits.is_required(**f))
                .map(|f| f.name())
                .collect(),
            supported: Feature::ALL
                .iter()
                .filter(|f| bits.is_supported(**f))
                .map(|f| f.name())
                .collect(),
            extra_bits: bits.extra_bits(),
        });

        DecodeOutput {
            network: invoice.network().prefix().to_string(),
            prefix: invoice.prefix().to_string(),
            millisatoshis: invoice.millisatoshis(),
            satoshis: invoice.satoshis(),
            timestamp: invoice.timestamp(),
            expiry: invoice.expiry(),
            expiry_date: invoice.expiry_date(),
            min_final_cltv_expiry: invoice.min_final_cltv_expiry(),
            payment_hash: invoice.payment_hash().map(hex::encode),
            payment_secret: invoice.payment_secret().map(hex::encode),
            description: invoice.description().map(str::to_string),
            description_hash: invoice.description_hash().map(hex::encode),
            metadata: invoice.metadata().map(hex::encode),
            payee_node_key: invoice.payee_node_key().map(hex::encode),
            fallback_address: invoice
                .fallback_address()
                .map(|(version, hash)| FallbackOutput {
                    version,
                    hash: hex::encode(hash),
                }),
            route_hints: invoice
                .route_hints()
                .iter()
                .map(|hops| {
                    hops.iter()
                        .map(|hop| HopOutput {
                            pubkey: hex::encode(hop.pubkey),
                            short_channel_id: hex::encode(hop.short_channel_id),
                            fee_base_msat: hop.fee_base_msat,
                            fee_proportional_millionths: hop.fee_proportional_millionths,
                            cltv_expiry_delta: hop.cltv_expiry_delta,
                        })
                        .collect()
                })
                .collect(),
            features,
            signature: hex::encode(invoice.signature().expect("decoded invoice is signed")),
            recovery_flag: invoice.recovery_flag().unwrap_or(0),
        }
    }
}

fn print_invoice(invoice: &Invoice, verbose: bool) {
    println!("Network: {}", invoice.network().prefix());
    if let Some(key) = invoice.payee_node_key() {
        println!("Payee node key: {}", hex::encode(key));
    }
    if let Some(msat) = invoice.millisatoshis() {
        match invoice.satoshis() {
            Some(sat) => println!("Amount: {sat} sat"),
            None => println!("Amount: {msat} msat"),
        }
    }
    println!("Timestamp: {}", invoice.timestamp());
    println!("Expires after: {}s", invoice.expiry());
    println!("Min final CLTV expiry: {}", invoice.min_final_cltv_expiry());

    for tag in invoice.tags() {
        match tag {
            Tag::PaymentHash(hash) => println!("Payment hash: {}", hex::encode(hash)),
            Tag::PaymentSecret(secret) => println!("Payment secret: {}", hex::encode(secret)),
            Tag::Description(text) => println!("Description: {text}"),
            Tag::DescriptionHash(hash) => println!("Description hash: {}", hex::encode(hash)),
            Tag::Metadata(bytes) => println!("Metadata: {}", hex::encode(bytes)),
            Tag::Payee(key) => println!("Payee (explicit): {}", hex::encode(key)),
            Tag::FallbackAddress { version, hash } => {
                println!("Fallback: version {version}, hash {}", hex::encode(hash));
            }
            Tag::RouteHint(hops) => {
                println!("Route hint ({} hops):", hops.len());
                for hop in hops {
                    println!(
                        "  {} via channel {} (base {} msat, {} ppm, cltv delta {})",
                        hex::encode(hop.pubkey),
                        hex::encode(hop.short_channel_id),
                        hop.fee_base_msat,
                        hop.fee_proportional_millionths,
                        hop.cltv_expiry_delta,
                    );
                }
            }
            Tag::Features(bits) => {
                for feature in Feature::ALL {
                    if bits.is_required(feature) {
                        println!("Feature: {} (required)", feature.name());
                    } else if bits.is_supported(feature) {
                        println!("Feature: {} (supported)", feature.name());
                    }
                }
                for bit in bits.extra_bits() {
                    println!("Feature: bit {bit}");
                }
            }
            Tag::Expiry(_) | Tag::MinFinalCltvExpiry(_) => {}
        }
    }

    if verbose {
        if let Some(sig) = invoice.signature() {
            println!("Signature: {}", hex::encode(sig));
        }
        if let Some(flag) = invoice.recovery_flag() {
            println!("Recovery flag: {flag}");
        }
    }
}

fn hex32(label: &str, value: &str) -> Result<[u8; 32], Box<dyn std::error::Error>> {
    let bytes = hex::decode(value)?;
    bytes
        .try_into()
        .map_err(|_| format!("{label} must be 32 bytes of hex").into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            network,
            description,
            description_hash,
            expires,
            min_final_cltv,
            amount_sat,
            amount_msat,
            timestamp,
            payment_hash,
            payment_secret,
            privkey,
        } => {
            let mut builder = InvoiceBuilder::new(network)
                .tag(Tag::PaymentHash(hex32("payment_hash", &payment_hash)?))
                .tag(Tag::PaymentSecret(hex32("payment_secret", &payment_secret)?));

            if let Some(desc) = description {
                builder = builder.description(&desc);
            }
            if let Some(hash) = description_hash {
                builder = builder.tag(Tag::description_hash_hex(&hash)?);
            }
            if let Some(seconds) = expires {
                builder = builder.expiry(seconds);
            }
            if let Some(blocks) = min_final_cltv {
                builder = builder.tag(Tag::MinFinalCltvExpiry(blocks));
            }
            if let Some(sat) = amount_sat {
                builder = builder.satoshis(sat);
            }
            if let Some(msat) = amount_msat {
                builder = builder.millisatoshis(msat);
            }
            if let Some(ts) = timestamp {
                builder = builder.timestamp(ts);
            }

            let signed = builder.encode()?.sign(&hex32("privkey", &privkey)?)?;
            println!("{}", signed.payment_request().expect("signed invoice"));
        }
        Commands::Decode {
            invoice,
            json,
            verbose,
        } => {
            let invoice = decode(&invoice)?;
            if json {
                let output = DecodeOutput::from_invoice(&invoice);
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_invoice(&invoice, verbose);
            }
        }
    }

    Ok(())
}
