//! RFM scoring and segmentation
//!
//! Recency, Frequency, and Monetary scores are each graded 1-5 against fixed
//! thresholds, then mapped onto a behavioral segment by an ordered decision
//! list. Rule order matters: several rules overlap, and the first match wins.

use crate::domain::metrics::CustomerSegment;

/// The three RFM dimension scores for one customer, each in [1, 5]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RfmScores {
    pub recency: u8,
    pub frequency: u8,
    pub monetary: u8,
}

impl RfmScores {
    /// Sum of the three scores, in [3, 15]
    pub fn combined(&self) -> u8 {
        self.recency + self.frequency + self.monetary
    }
}

/// Score recency from days since the most recent order (smaller = better)
pub fn recency_score(days_since_last_purchase: i64) -> u8 {
    match days_since_last_purchase {
        d if d <= 30 => 5,
        d if d <= 60 => 4,
        d if d <= 90 => 3,
        d if d <= 180 => 2,
        _ => 1,
    }
}

/// Score frequency from lifetime order count
pub fn frequency_score(total_orders: u32) -> u8 {
    match total_orders {
        o if o >= 20 => 5,
        o if o >= 10 => 4,
        o if o >= 5 => 3,
        o if o >= 2 => 2,
        _ => 1,
    }
}

/// Score monetary value from lifetime revenue
pub fn monetary_score(total_revenue: f64) -> u8 {
    if total_revenue >= 5000.0 {
        5
    } else if total_revenue >= 2000.0 {
        4
    } else if total_revenue >= 500.0 {
        3
    } else if total_revenue >= 100.0 {
        2
    } else {
        1
    }
}

/// Score all three dimensions at once
pub fn score(days_since_last_purchase: i64, total_orders: u32, total_revenue: f64) -> RfmScores {
    RfmScores {
        recency: recency_score(days_since_last_purchase),
        frequency: frequency_score(total_orders),
        monetary: monetary_score(total_revenue),
    }
}

/// Map RFM scores onto a segment
///
/// Ordered decision list; the first matching rule wins. A triple like
/// (5, 5, 5) matches `Champions` and never falls through to a later rule.
pub fn segment(scores: RfmScores) -> CustomerSegment {
    let RfmScores {
        recency,
        frequency,
        monetary,
    } = scores;
    let combined = scores.combined();

    if recency >= 4 && frequency >= 4 && monetary >= 4 {
        CustomerSegment::Champions
    } else if frequency >= 3 && monetary >= 3 && combined >= 9 {
        CustomerSegment::LoyalCustomers
    } else if recency >= 3 && frequency >= 2 && combined >= 7 {
        CustomerSegment::PotentialLoyalists
    } else if recency >= 4 && frequency <= 2 {
        CustomerSegment::NewCustomers
    } else if recency <= 2 && frequency >= 3 && monetary >= 3 {
        CustomerSegment::AtRisk
    } else if recency <= 2 && monetary >= 4 {
        CustomerSegment::CannotLose
    } else if recency <= 2 && frequency <= 2 && monetary <= 2 {
        CustomerSegment::Hibernating
    } else if monetary <= 2 && frequency >= 3 {
        CustomerSegment::PriceSensitive
    } else {
        CustomerSegment::Regular
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 5; "same day")]
    #[test_case(30, 5; "thirty days inclusive")]
    #[test_case(31, 4; "just over thirty")]
    #[test_case(60, 4; "sixty days inclusive")]
    #[test_case(90, 3; "ninety days inclusive")]
    #[test_case(180, 2; "one-eighty inclusive")]
    #[test_case(181, 1; "over one-eighty")]
    #[test_case(-5, 5; "negative days still scores best")]
    fn test_recency_score(days: i64, expected: u8) {
        assert_eq!(recency_score(days), expected);
    }

    #[test_case(0, 1)]
    #[test_case(1, 1)]
    #[test_case(2, 2)]
    #[test_case(5, 3)]
    #[test_case(10, 4)]
    #[test_case(19, 4)]
    #[test_case(20, 5)]
    fn test_frequency_score(orders: u32, expected: u8) {
        assert_eq!(frequency_score(orders), expected);
    }

    #[test_case(0.0, 1)]
    #[test_case(99.99, 1)]
    #[test_case(100.0, 2)]
    #[test_case(500.0, 3)]
    #[test_case(2000.0, 4)]
    #[test_case(4999.99, 4)]
    #[test_case(5000.0, 5)]
    fn test_monetary_score(revenue: f64, expected: u8) {
        assert_eq!(monetary_score(revenue), expected);
    }

    #[test]
    fn test_scores_always_in_range() {
        for days in [-100i64, 0, 15, 45, 75, 120, 400, 10_000] {
            for orders in [0u32, 1, 3, 7, 15, 50] {
                for revenue in [0.0, 50.0, 300.0, 1000.0, 3000.0, 100_000.0] {
                    let s = score(days, orders, revenue);
                    assert!((1..=5).contains(&s.recency));
                    assert!((1..=5).contains(&s.frequency));
                    assert!((1..=5).contains(&s.monetary));
                    assert!((3..=15).contains(&s.combined()));
                }
            }
        }
    }

    fn scores(r: u8, f: u8, m: u8) -> RfmScores {
        RfmScores {
            recency: r,
            frequency: f,
            monetary: m,
        }
    }

    #[test]
    fn test_champions_wins_over_later_rules() {
        // (5,5,5) also satisfies the Loyal Customers rule; Champions must win
        assert_eq!(segment(scores(5, 5, 5)), CustomerSegment::Champions);
        assert_eq!(segment(scores(4, 4, 4)), CustomerSegment::Champions);
    }

    #[test]
    fn test_loyal_customers() {
        // High frequency and monetary but recency too low for Champions
        assert_eq!(segment(scores(3, 4, 4)), CustomerSegment::LoyalCustomers);
    }

    #[test]
    fn test_potential_loyalists() {
        assert_eq!(
            segment(scores(3, 2, 2)),
            CustomerSegment::PotentialLoyalists
        );
    }

    #[test]
    fn test_new_customers() {
        // Very recent, few orders, low spend
        assert_eq!(segment(scores(5, 1, 1)), CustomerSegment::NewCustomers);
    }

    #[test]
    fn test_at_risk() {
        assert_eq!(segment(scores(1, 3, 3)), CustomerSegment::AtRisk);
    }

    #[test]
    fn test_cannot_lose() {
        // Lapsed big spender with low frequency
        assert_eq!(segment(scores(1, 2, 4)), CustomerSegment::CannotLose);
    }

    #[test]
    fn test_hibernating() {
        assert_eq!(segment(scores(1, 1, 1)), CustomerSegment::Hibernating);
    }

    #[test]
    fn test_price_sensitive() {
        // Orders often, spends little, recently enough to escape Hibernating
        assert_eq!(segment(scores(2, 3, 1)), CustomerSegment::PriceSensitive);
    }

    #[test]
    fn test_regular_fallthrough() {
        assert_eq!(segment(scores(3, 1, 4)), CustomerSegment::Regular);
    }

    #[test]
    fn test_segment_is_pure() {
        // Identical triples always yield identical segments
        for r in 1..=5u8 {
            for f in 1..=5u8 {
                for m in 1..=5u8 {
                    let s = scores(r, f, m);
                    assert_eq!(segment(s), segment(s));
                }
            }
        }
    }
}
