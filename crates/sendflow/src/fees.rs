//! Route fee aggregation

use sendflow_common::{Amount, Route};

/// Cheapest and costliest total fee over the candidate routes
///
/// `None` when no routes are known. A fee of zero is a real quote and is
/// reported as such, absence of routes is not.
pub fn fee_bounds(routes: &[Route]) -> Option<(Amount, Amount)> {
    let first = routes.first()?;
    let mut min = first.total_fee;
    let mut max = first.total_fee;
    for route in &routes[1..] {
        min = min.min(route.total_fee);
        max = max.max(route.total_fee);
    }

    Some((min, max))
}

/// Fee limit to attach to a Lightning submission
///
/// The costliest candidate is used so that any of the quoted routes may be
/// taken without tripping the limit.
pub fn fee_limit(routes: &[Route]) -> Option<Amount> {
    fee_bounds(routes).map(|(_, max)| max)
}
