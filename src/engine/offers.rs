//! Offer normalization.
//!
//! Turns one provider response into a price-ascending list of
//! `NormalizedOffer`, applying the route's airline allow-list. Pure:
//! same input, same output, safe to apply repeatedly.

use crate::providers::ProviderResponse;
use crate::types::NormalizedOffer;

/// Normalize, filter, and sort a provider response.
///
/// An offer is kept by the allow-list when its resolved display name
/// contains one of the entries (case-insensitive) OR its carrier code
/// exactly matches an entry (case-insensitive). Departure, arrival,
/// duration, and segment count are taken from the outbound (first)
/// itinerary. Offers with no segments are dropped silently. The sort is
/// stable: price ties keep provider order.
pub fn normalize(response: &ProviderResponse, allowed: Option<&[String]>) -> Vec<NormalizedOffer> {
    let mut offers: Vec<NormalizedOffer> = response
        .offers
        .iter()
        .filter_map(|offer| {
            let first_itinerary = offer.itineraries.first()?;
            let first_segment = first_itinerary.segments.first()?;

            let airline_code = first_segment.carrier_code.clone();
            let airline = response.carrier_name(&airline_code);

            if let Some(allowed) = allowed {
                if !matches_allow_list(&airline, &airline_code, allowed) {
                    return None;
                }
            }

            // Timing and stop count describe the outbound itinerary only;
            // a return leg never changes an offer's stops.
            let last_segment = first_itinerary.segments.last()?;
            let duration = first_itinerary.duration.clone();
            let segments = first_itinerary.segments.len();

            Some(NormalizedOffer {
                price: offer.price,
                airline,
                airline_code,
                departure_time: first_segment.departure_at.clone(),
                arrival_time: last_segment.arrival_at.clone(),
                duration,
                segments,
                offer_id: offer.id.clone(),
            })
        })
        .collect();

    offers.sort_by(|a, b| a.price.cmp(&b.price));
    offers
}

fn matches_allow_list(airline: &str, code: &str, allowed: &[String]) -> bool {
    let airline_lower = airline.to_lowercase();
    allowed.iter().any(|entry| {
        airline_lower.contains(&entry.to_lowercase()) || code.eq_ignore_ascii_case(entry)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
