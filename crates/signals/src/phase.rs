//! Coarse market phase per period.

use flowphase_core::{MarketPhase, Period};

/// Price change (%) that separates a decisive move from drift.
const DECISIVE_MOVE_PCT: f64 = 2.0;

/// Phase of a period from its price change (%) and net flow.
pub fn market_phase(price_change_pct: f64, net_flow: f64) -> MarketPhase {
    let p = price_change_pct;
    let f = net_flow;

    if f > 0.0 && p < -DECISIVE_MOVE_PCT {
        MarketPhase::Absorption
    } else if f > 0.0 && p > 0.0 {
        MarketPhase::Markup
    } else if f < 0.0 && p > DECISIVE_MOVE_PCT {
        MarketPhase::Distribution
    } else if f < 0.0 && p < 0.0 {
        MarketPhase::Capitulation
    } else if f > 0.0 {
        MarketPhase::Accumulation
    } else {
        MarketPhase::Neutral
    }
}

/// Phase of a period.
pub fn period_phase(period: &Period) -> MarketPhase {
    market_phase(period.price_change_pct, period.net_flow)
}
