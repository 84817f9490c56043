use super::models::{ContractKey, Provenance, PutContract};
use std::collections::HashMap;

/// Merge a primary and a fallback put chain into one list.
///
/// Contracts are matched on (strike, expiration). For a matched pair every
/// mergeable field keeps the primary value unless it is missing or exactly
/// zero, in which case the fallback value is taken (a zero never replaces a
/// zero). The record is tagged `Both` only if at least one field was filled
/// that way. Unmatched contracts pass through with their own provenance. Output keeps primary
/// order, followed by fallback-only contracts in fallback order.
pub fn merge(primary: Vec<PutContract>, fallback: Vec<PutContract>) -> Vec<PutContract> {
    let mut merged: Vec<PutContract> = Vec::with_capacity(primary.len() + fallback.len());
    let mut index: HashMap<ContractKey, usize> = HashMap::with_capacity(primary.len());

    for mut contract in primary {
        let key = contract.key();
        // A feed listing the same contract twice keeps the first row
        if index.contains_key(&key) {
            continue;
        }
        contract.provenance = Provenance::Primary;
        index.insert(key, merged.len());
        merged.push(contract);
    }

    for mut fb in fallback {
        let key = fb.key();
        match index.get(&key) {
            Some(&pos) => {
                let target = &mut merged[pos];
                let filled = backfill(target, &fb);
                if filled && target.provenance == Provenance::Primary {
                    target.provenance = Provenance::Both;
                }
            }
            None => {
                fb.provenance = Provenance::Fallback;
                index.insert(key, merged.len());
                merged.push(fb);
            }
        }
    }

    merged
}

/// Fill each empty field of `target` from `source`. Returns true if anything changed.
fn backfill(target: &mut PutContract, source: &PutContract) -> bool {
    let mut filled = false;
    filled |= fill_f64(&mut target.bid, source.bid);
    filled |= fill_f64(&mut target.last_price, source.last_price);
    filled |= fill_count(&mut target.volume, source.volume);
    filled |= fill_count(&mut target.open_interest, source.open_interest);
    filled |= fill_f64(&mut target.implied_volatility, source.implied_volatility);
    filled
}

/// A missing target takes any source value; a zero target only a non-zero one.
fn fill_f64(target: &mut Option<f64>, source: Option<f64>) -> bool {
    let Some(value) = source else {
        return false;
    };
    match *target {
        None => {
            *target = Some(value);
            true
        }
        Some(current) if current == 0.0 && value != 0.0 => {
            *target = Some(value);
            true
        }
        _ => false,
    }
}

fn fill_count(target: &mut Option<u64>, source: Option<u64>) -> bool {
    let Some(value) = source else {
        return false;
    };
    match *target {
        None => {
            *target = Some(value);
            true
        }
        Some(0) if value != 0 => {
            *target = Some(value);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn exp() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 20).unwrap()
    }

    #[test]
    fn test_zero_is_not_replaced_by_zero() {
        let mut primary = PutContract::new(50.0, Some(1.0), exp(), Provenance::Primary);
        primary.volume = Some(0);
        let mut fallback = PutContract::new(50.0, Some(1.1), exp(), Provenance::Fallback);
        fallback.volume = Some(0);

        let merged = merge(vec![primary], vec![fallback]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].volume, Some(0));
        assert_eq!(merged[0].last_price, Some(1.0));
        assert_eq!(merged[0].provenance, Provenance::Primary);
    }

    #[test]
    fn test_duplicate_primary_rows_keep_first() {
        let a = PutContract::new(50.0, Some(1.0), exp(), Provenance::Primary);
        let b = PutContract::new(50.0, Some(9.0), exp(), Provenance::Primary);
        let merged = merge(vec![a, b], vec![]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].last_price, Some(1.0));
    }
}
