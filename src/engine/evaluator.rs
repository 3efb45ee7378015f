//! Deal evaluation across one route's check cycle.
//!
//! Accumulates normalized offers combination by combination, tracking
//! the single cheapest offer at or below the route's threshold. The
//! flight list grows regardless of whether anything qualifies; deal
//! detection and snapshot content are independent concerns.

use rust_decimal::Decimal;

use crate::types::{DateCombination, FlightEntry, NormalizedOffer};

/// The cheapest qualifying offer seen so far, with the dates it was
/// found for.
#[derive(Debug, Clone)]
pub struct BestDeal {
    pub combo: DateCombination,
    pub offer: NormalizedOffer,
}

/// Everything one route check produced.
#[derive(Debug)]
pub struct CheckOutcome {
    /// Set when at least one offer priced at or below the threshold was
    /// seen this cycle.
    pub best: Option<BestDeal>,
    pub flights: Vec<FlightEntry>,
}

/// Per-cycle accumulator. Create one per route check, feed it each
/// combination's offers in order, then take the outcome.
#[derive(Debug)]
pub struct DealEvaluator {
    max_price: Decimal,
    adults: u32,
    best: Option<BestDeal>,
    flights: Vec<FlightEntry>,
}

impl DealEvaluator {
    pub fn new(max_price: Decimal, adults: u32) -> Self {
        DealEvaluator {
            max_price,
            adults,
            best: None,
            flights: Vec::new(),
        }
    }

    /// Record one combination's offers.
    ///
    /// Every offer lands in the flight list. The best-deal slot only
    /// moves when an offer both qualifies (price <= threshold) and beats
    /// the current best; ties keep the earlier find.
    pub fn observe(&mut self, combo: &DateCombination, offers: &[NormalizedOffer]) {
        for offer in offers {
            if offer.price <= self.max_price {
                let beats_current = self
                    .best
                    .as_ref()
                    .map(|b| offer.price < b.offer.price)
                    .unwrap_or(true);
                if beats_current {
                    self.best = Some(BestDeal {
                        combo: combo.clone(),
                        offer: offer.clone(),
                    });
                }
            }

            self.flights.push(FlightEntry {
                offer: offer.clone(),
                outbound: combo.outbound,
                return_date: combo.return_date,
                adults: self.adults,
            });
        }
    }

    pub fn finish(self) -> CheckOutcome {
        CheckOutcome {
            best: self.best,
            flights: self.flights,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
