//! Divides an amount into equal shares without losing a cent.

use rust_decimal::Decimal;

use crate::money::{from_cents, to_cents};

/// Divide `total` into `count` shares that differ by at most one cent.
///
/// `total` is first rounded to whole cents, half away from zero. Each share
/// gets the floor of an even split, and the cents left over go one each to the
/// first shares, so the shares always add up to the rounded total.
///
/// Returns an empty vector when `count` is zero, when `total` is negative, or
/// when `total` is too large to be expressed in cents.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use split_bank::partition;
///
/// let shares = partition(Decimal::new(1000, 2), 3);
///
/// assert_eq!(
///     shares,
///     vec![Decimal::new(334, 2), Decimal::new(333, 2), Decimal::new(333, 2)]
/// );
/// ```
pub fn partition(total: Decimal, count: usize) -> Vec<Decimal> {
    if count == 0 || total < Decimal::ZERO {
        return Vec::new();
    }

    let (Some(cents), Ok(divisor)) = (to_cents(total), i64::try_from(count)) else {
        return Vec::new();
    };

    let base = cents / divisor;
    let remainder = cents % divisor;

    (0..divisor)
        .map(|index| {
            if index < remainder {
                from_cents(base + 1)
            } else {
                from_cents(base)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::partition;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn leftover_cent_goes_to_the_first_share() {
        assert_eq!(
            partition(d("10.00"), 3),
            vec![d("3.34"), d("3.33"), d("3.33")]
        );
    }

    #[test]
    fn leftover_cents_are_front_loaded() {
        assert_eq!(
            partition(d("0.05"), 3),
            vec![d("0.02"), d("0.02"), d("0.01")]
        );
    }

    #[test]
    fn even_split_has_no_remainder() {
        assert_eq!(partition(d("9"), 3), vec![d("3.00"), d("3.00"), d("3.00")]);
    }

    #[test]
    fn zero_total_gives_zero_shares() {
        assert_eq!(partition(Decimal::ZERO, 5), vec![Decimal::ZERO; 5]);
    }

    #[test]
    fn zero_count_gives_no_shares() {
        assert!(partition(d("10.00"), 0).is_empty());
    }

    #[test]
    fn negative_total_gives_no_shares() {
        assert!(partition(d("-10.00"), 3).is_empty());
    }

    #[test]
    fn fewer_cents_than_members() {
        assert_eq!(
            partition(d("0.02"), 4),
            vec![d("0.01"), d("0.01"), d("0.00"), d("0.00")]
        );
    }

    #[test]
    fn sub_cent_total_is_rounded_half_away_from_zero() {
        let shares = partition(d("1.005"), 2);

        assert_eq!(shares, vec![d("0.51"), d("0.50")]);
    }

    #[test]
    fn shares_sum_to_total_and_spread_at_most_one_cent() {
        let totals = ["0.01", "1.00", "7.77", "10.00", "99.99", "1234.56", "100000.03"];

        for total in totals {
            for count in 1..=13 {
                let shares = partition(d(total), count);

                assert_eq!(shares.len(), count);
                assert_eq!(
                    shares.iter().sum::<Decimal>(),
                    d(total),
                    "sum of {count} shares of {total}"
                );

                let max = shares.iter().max().unwrap();
                let min = shares.iter().min().unwrap();
                assert!(*max - *min <= d("0.01"), "spread of {count} shares of {total}");
                assert!(
                    shares.windows(2).all(|pair| pair[0] >= pair[1]),
                    "{count} shares of {total} are front-loaded"
                );
            }
        }
    }
}
