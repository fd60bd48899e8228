use regex::Regex;

use crate::error::Error;

/// 1 BTC in millisatoshi, the minimum amount unit.
pub const MSAT_PER_BTC: u64 = 100_000_000_000;

const MSAT_PER_MILLI: u64 = 100_000_000;
const MSAT_PER_MICRO: u64 = 100_000;
const MSAT_PER_NANO: u64 = 100;

/// Millisatoshi to the shortest HRP amount suffix, e.g. `250000000` ->
/// `"2500u"`. Each multiplier is used only when the amount divides it
/// exactly; pico is the catch-all and is always a multiple of 10.
pub fn msat_to_prefix(msat: u64) -> String {
    if msat >= MSAT_PER_MILLI && msat % MSAT_PER_MILLI == 0 {
        format!("{}m", msat / MSAT_PER_MILLI)
    } else if msat >= MSAT_PER_MICRO && msat % MSAT_PER_MICRO == 0 {
        format!("{}u", msat / MSAT_PER_MICRO)
    } else if msat >= MSAT_PER_NANO && msat % MSAT_PER_NANO == 0 {
        format!("{}n", msat / MSAT_PER_NANO)
    } else {
        // 1 pico-BTC = 0.1 msat, so the numeric part is msat * 10.
        format!("{}p", msat as u128 * 10)
    }
}

/// Parse an HRP amount suffix back to millisatoshi.
pub fn prefix_to_msat(amount: &str) -> Result<u64, Error> {
    if amount.is_empty() {
        return Err(Error::amount("empty amount"));
    }

    let re = Regex::new(r"^(0|[1-9][0-9]*)([munp]?)$").unwrap();
    let caps = re
        .captures(amount)
        .ok_or_else(|| Error::amount(format!("malformed amount {amount:?}")))?;

    // Parse wide, then range-check: the pico form of a near-maximal msat
    // value has one more decimal digit than u64 can hold.
    let number: u128 = caps[1]
        .parse()
        .map_err(|_| Error::amount(format!("amount out of range: {amount}")))?;
    let multiplier = caps.get(2).map(|m| m.as_str()).unwrap_or("");

    let msat = match multiplier {
        "m" => number.checked_mul(MSAT_PER_MILLI as u128),
        "u" => number.checked_mul(MSAT_PER_MICRO as u128),
        "n" => number.checked_mul(MSAT_PER_NANO as u128),
        "p" => {
            if number % 10 != 0 {
                return Err(Error::amount(format!(
                    "pico amount {number} is not a multiple of 10"
                )));
            }
            Some(number / 10)
        }
        _ => number.checked_mul(MSAT_PER_BTC as u128),
    };

    msat.and_then(|wide| u64::try_from(wide).ok())
        .ok_or_else(|| Error::amount(format!("amount out of range: {amount}")))
}

/// Satoshi to the shortest HRP amount suffix.
pub fn sat_to_prefix(sat: u64) -> Result<String, Error> {
    let msat = sat
        .checked_mul(1000)
        .ok_or_else(|| Error::amount(format!("amount out of range: {sat} sat")))?;
    Ok(msat_to_prefix(msat))
}

/// Parse an HRP amount suffix to whole satoshi. Sub-satoshi amounts are
/// rejected; use [`prefix_to_msat`] for those.
pub fn prefix_to_sat(amount: &str) -> Result<u64, Error> {
    let msat = prefix_to_msat(amount)?;
    if msat % 1000 != 0 {
        return Err(Error::amount(format!(
            "{amount} is not an integer number of satoshi"
        )));
    }
    Ok(msat / 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortest_multiplier_wins() {
        assert_eq!(msat_to_prefix(250_000_000), "2500u");
        assert_eq!(msat_to_prefix(2_000_000_000), "20m");
        assert_eq!(msat_to_prefix(MSAT_PER_BTC), "1000m");
        assert_eq!(msat_to_prefix(100), "1n");
        assert_eq!(msat_to_prefix(250_000_100), "2500001n");
        assert_eq!(msat_to_prefix(1), "10p");
        assert_eq!(msat_to_prefix(967_878_534), "9678785340p");
    }

    #[test]
    fn prefix_round_trips() {
        for msat in [
            1u64,
            99,
            100,
            1_000,
            250_000_000,
            967_878_534,
            MSAT_PER_BTC,
            MSAT_PER_BTC * 21_000_000,
            // Pico forms up here have 20 decimal digits.
            MSAT_PER_BTC * 21_000_000 + 1,
            u64::MAX,
        ] {
            assert_eq!(prefix_to_msat(&msat_to_prefix(msat)).unwrap(), msat, "{msat}");
        }
    }

    #[test]
    fn parse_each_multiplier() {
        assert_eq!(prefix_to_msat("20m").unwrap(), 2_000_000_000);
        assert_eq!(prefix_to_msat("2500u").unwrap(), 250_000_000);
        assert_eq!(prefix_to_msat("2500001n").unwrap(), 250_000_100);
        assert_eq!(prefix_to_msat("9678785340p").unwrap(), 967_878_534);
        // No multiplier means whole BTC.
        assert_eq!(prefix_to_msat("1").unwrap(), MSAT_PER_BTC);
    }

    #[test]
    fn malformed_amounts_rejected() {
        assert!(prefix_to_msat("").is_err());
        assert!(prefix_to_msat("m").is_err());
        assert!(prefix_to_msat("0100u").is_err());
        assert!(prefix_to_msat("2500x").is_err());
        assert!(prefix_to_msat("25.00u").is_err());
        // Pico must be a multiple of 10: 1 pico-BTC is below the msat unit.
        assert!(prefix_to_msat("1p").is_err());
        assert!(prefix_to_msat("15p").is_err());
    }

    #[test]
    fn overflow_is_an_amount_error() {
        assert!(prefix_to_msat("999999999999m").is_err());
        // One pico past the largest representable msat value.
        assert!(prefix_to_msat("184467440737095516160p").is_err());
        assert!(sat_to_prefix(u64::MAX).is_err());
    }

    #[test]
    fn satoshi_helpers() {
        assert_eq!(sat_to_prefix(250_000).unwrap(), "2500u");
        assert_eq!(prefix_to_sat("2500u").unwrap(), 250_000);
        assert_eq!(prefix_to_sat("20m").unwrap(), 2_000_000);
        // 9678785340p is 967878.534 sat.
        assert!(prefix_to_sat("9678785340p").is_err());
    }
}
