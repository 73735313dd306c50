//! Block subsidy schedule and total-issuance curve.

use thiserror::Error;

/// Blocks per subsidy era.
pub const HALVING_INTERVAL: u64 = 210_000;

/// Block subsidy at genesis, satoshis (50 BTC).
pub const INITIAL_SUBSIDY_SAT: u64 = 5_000_000_000;

/// Satoshis per bitcoin.
pub const SAT_PER_BTC: u64 = 100_000_000;

/// The 21,000,000-coin cap, satoshis.
pub const SUPPLY_CAP_SAT: u64 = 21_000_000 * SAT_PER_BTC;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssuanceError {
    #[error("invalid block height {0}: must be non-negative")]
    InvalidInput(i64),
}

/// Total satoshis issued through block `height`, inclusive.
///
/// Walks the schedule era by era: [`HALVING_INTERVAL`] blocks per era,
/// reward halved with integer floor at each boundary, the era containing
/// `height` truncated so only blocks up to and including it count. The
/// floor at every halving makes the curve discrete; summing a closed form
/// would drift from it once sub-satoshi remainders start getting dropped.
pub fn total_issued(height: i64) -> Result<u64, IssuanceError> {
    if height < 0 {
        return Err(IssuanceError::InvalidInput(height));
    }
    let height = height as u64;

    let mut total: u64 = 0;
    let mut reward = INITIAL_SUBSIDY_SAT;
    let mut era_start: u64 = 0;

    while reward > 0 && era_start <= height {
        let era_end = height.min(era_start + HALVING_INTERVAL - 1);
        let blocks = era_end - era_start + 1;
        total += blocks * reward;
        reward /= 2;
        era_start += HALVING_INTERVAL;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_block_only() {
        assert_eq!(total_issued(0).unwrap(), INITIAL_SUBSIDY_SAT);
    }

    #[test]
    fn test_last_block_of_first_era() {
        assert_eq!(
            total_issued(209_999).unwrap(),
            210_000 * INITIAL_SUBSIDY_SAT
        );
    }

    #[test]
    fn test_first_block_after_halving() {
        assert_eq!(
            total_issued(210_000).unwrap(),
            210_000 * INITIAL_SUBSIDY_SAT + 2_500_000_000
        );
    }

    #[test]
    fn test_height_650000() {
        // Three full eras (50 + 25 + 12.5 BTC) plus 20,001 blocks at 6.25.
        let three_eras = 210_000 * (5_000_000_000 + 2_500_000_000 + 1_250_000_000);
        let partial = 20_001 * 625_000_000;
        assert_eq!(total_issued(650_000).unwrap(), three_eras + partial);
        assert_eq!(total_issued(650_000).unwrap(), 1_850_000_625_000_000);
    }

    #[test]
    fn test_supply_saturates_after_final_era() {
        // floor(5e9 / 2^33) = 0, so era 33 onward issues nothing.
        let final_era_end = 33 * HALVING_INTERVAL as i64 - 1;
        let saturated = total_issued(final_era_end).unwrap();
        assert_eq!(total_issued(final_era_end + 1).unwrap(), saturated);
        assert_eq!(total_issued(final_era_end + 10_000_000).unwrap(), saturated);
        assert!(saturated < SUPPLY_CAP_SAT);
    }

    #[test]
    fn test_monotonic_in_height() {
        let mut previous = 0;
        for height in (0..7_000_000).step_by(104_729) {
            let issued = total_issued(height).unwrap();
            assert!(issued >= previous, "supply decreased at height {height}");
            previous = issued;
        }
    }

    #[test]
    fn test_negative_height_rejected() {
        assert_eq!(total_issued(-1), Err(IssuanceError::InvalidInput(-1)));
    }
}
