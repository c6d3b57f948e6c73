use crate::error::GridError;

/// Primes which may form the coarsest level of a multigrid-friendly cell number
pub const MG_PRIMES: [usize; 8] = [2, 3, 5, 7, 11, 13, 17, 19];

/// Default largest prime factor of the coarsest level
pub const DEFAULT_MAX_PRIME: usize = 5;

/// Default minimum number of times a cell number can be halved
pub const DEFAULT_MIN_DIV: u32 = 3;

/// All cell numbers `p * 2^k <= max_nr` with a prime `p <= max_prime` and `k >= min_div` (sorted, unique)
///
/// A multigrid solver can coarsen an axis with such a number of cells `k` times before
/// reaching the small prime `p`.
pub fn good_cell_numbers(
    max_nr: usize,
    max_prime: usize,
    min_div: u32,
) -> Result<Vec<usize>, GridError> {
    if max_prime < MG_PRIMES[0] || max_prime > MG_PRIMES[MG_PRIMES.len() - 1] {
        return Err(GridError::invalid(format!(
            "max_prime must be within [{}, {}] (got {})",
            MG_PRIMES[0],
            MG_PRIMES[MG_PRIMES.len() - 1],
            max_prime
        )));
    }

    let mut numbers: Vec<usize> = MG_PRIMES
        .iter()
        .filter(|p| **p <= max_prime)
        .flat_map(|p| {
            (min_div..usize::BITS)
                .map(move |k| p.checked_shl(k).filter(|n| n >> k == *p))
                .take_while(|n| n.map_or(false, |n| n <= max_nr))
                .flatten()
        })
        .collect();

    numbers.sort_unstable();
    numbers.dedup();
    Ok(numbers)
}

/// The largest multigrid-friendly cell number not exceeding `budget` (if there is one)
pub fn largest_good_cell_number(
    budget: usize,
    max_prime: usize,
    min_div: u32,
) -> Result<Option<usize>, GridError> {
    Ok(good_cell_numbers(budget, max_prime, min_div)?.last().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_numbers() {
        let numbers = good_cell_numbers(100, DEFAULT_MAX_PRIME, DEFAULT_MIN_DIV).unwrap();
        assert_eq!(numbers, vec![16, 24, 32, 40, 48, 64, 80, 96]);
    }

    #[test]
    fn larger_primes_and_fewer_divisions() {
        let numbers = good_cell_numbers(40, 7, 2).unwrap();
        assert_eq!(numbers, vec![8, 12, 16, 20, 24, 28, 32, 40]);
    }

    #[test]
    fn largest_within_budget() {
        assert_eq!(largest_good_cell_number(130, 5, 3).unwrap(), Some(128));
        assert_eq!(largest_good_cell_number(10, 5, 3).unwrap(), None);
    }

    #[test]
    fn bad_prime_bound() {
        assert!(matches!(
            good_cell_numbers(100, 23, 3),
            Err(GridError::InvalidParameter(_))
        ));
        assert!(matches!(
            good_cell_numbers(100, 1, 3),
            Err(GridError::InvalidParameter(_))
        ));
    }
}
