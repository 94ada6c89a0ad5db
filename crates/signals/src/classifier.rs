//! Period classifier.
//!
//! Maps a period's price change, net flow, open interest change and
//! long/short ratios to a [`Signal`] through an ordered cascade of rules.
//! Rules are evaluated top to bottom and the first one that matches decides
//! the signal, so boundary behaviour depends on the rule order.

use flowphase_core::{Period, Severity, Signal, SignalKind};

/// Absolute price change (%) above which a move is parabolic.
pub const PARABOLIC_PCT: f64 = 20.0;
/// Retail long/short ratio above which positioning is extreme.
pub const RETAIL_EXTREME: f64 = 3.0;
/// Retail long/short ratio above which positioning is elevated.
pub const RETAIL_ELEVATED: f64 = 2.0;
/// Retail long/short ratio below which retail has capitulated.
pub const RETAIL_CAPITULATED: f64 = 0.8;
/// Whale long/short ratio above which whales lean long.
pub const WHALE_LONG: f64 = 1.2;
/// Whale long/short ratio below which whales lean short.
pub const WHALE_SHORT: f64 = 0.8;
/// Price change (%) of a moderate move.
pub const MODERATE_MOVE_PCT: f64 = 0.5;
/// Price change (%) checked by the absorption / trap rule.
pub const TRAP_MOVE_PCT: f64 = 1.0;
/// Price change (%) of a strong move.
pub const STRONG_MOVE_PCT: f64 = 2.0;
/// Price bands (%) used under elevated retail positioning.
pub const BAND_MID_PCT: f64 = 5.0;
pub const BAND_WIDE_PCT: f64 = 10.0;
/// Net flow thresholds (quote notional).
pub const FLOW_10M: f64 = 10_000_000.0;
pub const FLOW_20M: f64 = 20_000_000.0;
pub const FLOW_50M: f64 = 50_000_000.0;

/// Ratio assumed when sentiment data is unavailable.
pub const NEUTRAL_RATIO: f64 = 1.0;

/// Inputs of one classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierInput {
    pub price_change_pct: f64,
    pub net_flow: f64,
    pub aux_change_pct: f64,
    pub whale_ratio: Option<f64>,
    pub retail_ratio: Option<f64>,
}

impl ClassifierInput {
    pub fn new(price_change_pct: f64, net_flow: f64, aux_change_pct: f64) -> Self {
        Self {
            price_change_pct,
            net_flow,
            aux_change_pct,
            whale_ratio: None,
            retail_ratio: None,
        }
    }

    pub fn with_ratios(mut self, whale_ratio: f64, retail_ratio: f64) -> Self {
        self.whale_ratio = Some(whale_ratio);
        self.retail_ratio = Some(retail_ratio);
        self
    }

    fn whale(&self) -> f64 {
        self.whale_ratio.unwrap_or(NEUTRAL_RATIO)
    }

    fn retail(&self) -> f64 {
        self.retail_ratio.unwrap_or(NEUTRAL_RATIO)
    }

    fn is_finite(&self) -> bool {
        self.price_change_pct.is_finite()
            && self.net_flow.is_finite()
            && self.aux_change_pct.is_finite()
            && self.whale().is_finite()
            && self.retail().is_finite()
    }
}

impl From<&Period> for ClassifierInput {
    fn from(period: &Period) -> Self {
        Self {
            price_change_pct: period.price_change_pct,
            net_flow: period.net_flow,
            aux_change_pct: period.aux_change_pct,
            whale_ratio: period.whale_ratio,
            retail_ratio: period.retail_ratio,
        }
    }
}

/// Every threshold comparison the cascade branches on, evaluated once.
#[derive(Debug, Clone, Copy)]
struct Conditions {
    parabolic: bool,
    price_up: bool,
    price_above_moderate: bool,
    price_below_moderate: bool,
    price_at_or_above_trap: bool,
    price_below_trap: bool,
    price_above_strong: bool,
    price_below_strong: bool,
    price_above_mid_band: bool,
    price_above_wide_band: bool,
    price_below_mid_band: bool,
    price_below_wide_band: bool,
    price_negative: bool,

    flow_positive: bool,
    flow_negative: bool,
    flow_above_10m: bool,
    flow_above_50m: bool,
    flow_below_10m: bool,
    flow_below_20m: bool,
    flow_below_50m: bool,

    retail_extreme: bool,
    retail_elevated: bool,
    retail_above_elevated: bool,
    retail_capitulated: bool,
    whale_long: bool,
    whale_short: bool,
}

impl Conditions {
    fn evaluate(input: &ClassifierInput) -> Self {
        let p = input.price_change_pct;
        let f = input.net_flow;
        let w = input.whale();
        let r = input.retail();

        Self {
            parabolic: p.abs() > PARABOLIC_PCT,
            price_up: p > 0.0,
            price_above_moderate: p > MODERATE_MOVE_PCT,
            price_below_moderate: p < -MODERATE_MOVE_PCT,
            price_at_or_above_trap: p >= TRAP_MOVE_PCT,
            price_below_trap: p < -TRAP_MOVE_PCT,
            price_above_strong: p > STRONG_MOVE_PCT,
            price_below_strong: p < -STRONG_MOVE_PCT,
            price_above_mid_band: p > BAND_MID_PCT,
            price_above_wide_band: p > BAND_WIDE_PCT,
            price_below_mid_band: p < -BAND_MID_PCT,
            price_below_wide_band: p < -BAND_WIDE_PCT,
            price_negative: p < 0.0,

            flow_positive: f > 0.0,
            flow_negative: f < 0.0,
            flow_above_10m: f > FLOW_10M,
            flow_above_50m: f > FLOW_50M,
            flow_below_10m: f < -FLOW_10M,
            flow_below_20m: f < -FLOW_20M,
            flow_below_50m: f < -FLOW_50M,

            retail_extreme: r > RETAIL_EXTREME,
            retail_elevated: r > RETAIL_ELEVATED && r <= RETAIL_EXTREME,
            retail_above_elevated: r > RETAIL_ELEVATED,
            retail_capitulated: r < RETAIL_CAPITULATED,
            whale_long: w > WHALE_LONG,
            whale_short: w < WHALE_SHORT,
        }
    }
}

/// Outcome of a matching rule, before the shared context is appended.
struct Verdict {
    kind: SignalKind,
    severity: Severity,
    detail: String,
}

impl Verdict {
    fn new(kind: SignalKind, severity: Severity, detail: String) -> Self {
        Self {
            kind,
            severity,
            detail,
        }
    }
}

type Rule = fn(&Conditions, &ClassifierInput) -> Option<Verdict>;

/// Rules in priority order.
const CASCADE: [Rule; 8] = [
    parabolic_guard,
    extreme_retail,
    elevated_retail,
    whale_divergence,
    retail_capitulation,
    strong_confirmation,
    absorption_or_trap,
    moderate_move,
];

/// Classify one set of inputs. Never fails: anything unmatched is neutral.
///
/// Non-finite inputs are not classified and yield the neutral signal.
pub fn classify(input: &ClassifierInput) -> Signal {
    if !input.is_finite() {
        return Signal {
            kind: SignalKind::Neutral,
            headline: SignalKind::Neutral.headline().to_string(),
            explanation: "Inputs contain non-finite values; not classified.".to_string(),
            severity: Severity::Neutral,
        };
    }

    let conditions = Conditions::evaluate(input);
    let verdict = CASCADE
        .iter()
        .find_map(|rule| rule(&conditions, input))
        .unwrap_or_else(|| neutral(input));

    Signal {
        kind: verdict.kind,
        headline: verdict.kind.headline().to_string(),
        explanation: format!("{} {}", verdict.detail, context(input)),
        severity: verdict.severity,
    }
}

/// Classify a period.
pub fn classify_period(period: &Period) -> Signal {
    classify(&ClassifierInput::from(period))
}

fn parabolic_guard(c: &Conditions, i: &ClassifierInput) -> Option<Verdict> {
    if !c.parabolic {
        return None;
    }
    let p = i.price_change_pct;
    let flow = fmt_flow(i.net_flow);

    if c.price_up {
        return Some(if c.flow_above_50m {
            Verdict::new(
                SignalKind::ParabolicBackedRally,
                Severity::Bullish,
                format!("Price {p:+.1}% with {flow} of net buying behind it; strong but extended."),
            )
        } else if c.flow_below_20m {
            Verdict::new(
                SignalKind::ParabolicFakePump,
                Severity::Critical,
                format!("Price {p:+.1}% while takers sold {flow}; the move is not backed by flow."),
            )
        } else {
            Verdict::new(
                SignalKind::ParabolicPump,
                Severity::Caution,
                format!("Price {p:+.1}% without decisive flow ({flow}); expect a volatile unwind."),
            )
        });
    }

    let score = count(&[c.retail_capitulated, c.flow_positive, c.whale_long]);
    Some(if score >= 2 {
        Verdict::new(
            SignalKind::ParabolicCapitulationEntry,
            Severity::Opportunity,
            format!("Price {p:+.1}% crash, capitulation confidence {score}/3; scale in gradually."),
        )
    } else {
        Verdict::new(
            SignalKind::ParabolicCapitulationWait,
            Severity::Caution,
            format!("Price {p:+.1}% crash, capitulation confidence {score}/3; no bottom signs yet."),
        )
    })
}

fn extreme_retail(c: &Conditions, i: &ClassifierInput) -> Option<Verdict> {
    if !c.retail_extreme {
        return None;
    }
    let r = i.retail();
    let flow = fmt_flow(i.net_flow);

    Some(if c.flow_below_50m {
        Verdict::new(
            SignalKind::FomoPeakFakePump,
            Severity::Critical,
            format!("Retail {r:.2}x long while takers dump {flow}; crowd is exit liquidity."),
        )
    } else if c.flow_negative {
        Verdict::new(
            SignalKind::FomoPeak,
            Severity::Bearish,
            format!("Retail {r:.2}x long and flow turning negative ({flow}); likely local top."),
        )
    } else {
        Verdict::new(
            SignalKind::FomoExtremeWarning,
            Severity::Caution,
            format!("Retail {r:.2}x long; flow still positive ({flow}) but positioning is extreme."),
        )
    })
}

fn elevated_retail(c: &Conditions, i: &ClassifierInput) -> Option<Verdict> {
    if !c.retail_elevated {
        return None;
    }
    let p = i.price_change_pct;
    let r = i.retail();
    let flow = fmt_flow(i.net_flow);

    if !c.flow_negative {
        return Some(Verdict::new(
            SignalKind::RetailLongsSupported,
            Severity::Neutral,
            format!("Retail {r:.2}x long with supportive flow ({flow}); crowded but not broken."),
        ));
    }

    let (kind, severity, note) = if c.price_above_wide_band {
        (
            SignalKind::RallyFomoTop,
            Severity::Bearish,
            "retail chasing a large rally while takers sell into it",
        )
    } else if c.price_above_mid_band {
        (
            SignalKind::RallyFomo,
            Severity::Caution,
            "retail chasing the rally while takers sell",
        )
    } else if c.price_below_wide_band {
        (
            SignalKind::BreakdownFomoLate,
            Severity::Bearish,
            "deep breakdown with longs still crowded; forced selling can extend",
        )
    } else if c.price_below_mid_band {
        (
            SignalKind::BreakdownFomoActive,
            Severity::Bearish,
            "breakdown in progress against crowded longs",
        )
    } else if c.price_negative {
        (
            SignalKind::DeclineFomo,
            Severity::Caution,
            "mild decline while retail keeps buying the dip",
        )
    } else {
        (
            SignalKind::SidewaysFomo,
            Severity::Caution,
            "range-bound with crowded longs and net selling",
        )
    };

    Some(Verdict::new(
        kind,
        severity,
        format!("Price {p:+.1}%, retail {r:.2}x long, flow {flow}: {note}."),
    ))
}

fn whale_divergence(c: &Conditions, i: &ClassifierInput) -> Option<Verdict> {
    let p = i.price_change_pct;
    let w = i.whale();
    let flow = fmt_flow(i.net_flow);

    if c.price_below_moderate && c.whale_long {
        let score = count(&[c.flow_above_10m, c.retail_capitulated]);
        let (kind, severity) = match score {
            2 => (
                SignalKind::WhaleAccumulationHighConviction,
                Severity::Opportunity,
            ),
            1 => (SignalKind::WhaleAccumulationConfirmed, Severity::Bullish),
            _ => (SignalKind::WhaleAccumulationEarly, Severity::Caution),
        };
        return Some(Verdict::new(
            kind,
            severity,
            format!("Price {p:+.1}% while whales lean {w:.2}x long (flow {flow}); confidence {score}/2."),
        ));
    }

    if c.price_above_moderate && c.whale_short {
        let escalated = c.flow_below_10m || c.retail_above_elevated;
        let severity = if escalated {
            Severity::Critical
        } else {
            Severity::Bearish
        };
        return Some(Verdict::new(
            SignalKind::WhaleDistribution,
            severity,
            format!("Price {p:+.1}% while whales lean short at {w:.2}x (flow {flow}); smart money selling into strength."),
        ));
    }

    None
}

fn retail_capitulation(c: &Conditions, i: &ClassifierInput) -> Option<Verdict> {
    if !c.retail_capitulated {
        return None;
    }
    let r = i.retail();
    let flow = fmt_flow(i.net_flow);
    let score = count(&[c.price_below_moderate, c.flow_positive, c.whale_long]);

    let (kind, severity) = if score >= 2 {
        (SignalKind::RetailCapitulationBuyZone, Severity::Opportunity)
    } else if c.flow_positive {
        (SignalKind::RetailCapitulationSupported, Severity::Bullish)
    } else {
        (SignalKind::RetailCapitulationEarly, Severity::Caution)
    };

    Some(Verdict::new(
        kind,
        severity,
        format!("Retail only {r:.2}x long (flow {flow}); contrarian confidence {score}/3."),
    ))
}

fn strong_confirmation(c: &Conditions, i: &ClassifierInput) -> Option<Verdict> {
    let p = i.price_change_pct;
    let flow = fmt_flow(i.net_flow);

    if c.price_above_strong && c.flow_above_50m {
        Some(Verdict::new(
            SignalKind::ConfirmedUptrend,
            Severity::Bullish,
            format!("Price {p:+.1}% on {flow} of net buying."),
        ))
    } else if c.price_below_strong && c.flow_below_50m {
        Some(Verdict::new(
            SignalKind::ConfirmedDump,
            Severity::Bearish,
            format!("Price {p:+.1}% on {flow} of net selling."),
        ))
    } else {
        None
    }
}

fn absorption_or_trap(c: &Conditions, i: &ClassifierInput) -> Option<Verdict> {
    let p = i.price_change_pct;
    let flow = fmt_flow(i.net_flow);

    if c.price_below_trap && c.flow_above_10m {
        Some(Verdict::new(
            SignalKind::Absorption,
            Severity::Bullish,
            format!("Price {p:+.1}% but takers bought {flow}; sellers are being absorbed."),
        ))
    } else if c.price_at_or_above_trap && c.flow_below_10m {
        Some(Verdict::new(
            SignalKind::WeakRallyTrap,
            Severity::Bearish,
            format!("Price {p:+.1}% but takers sold {flow}; the rally lacks buyers."),
        ))
    } else {
        None
    }
}

fn moderate_move(c: &Conditions, i: &ClassifierInput) -> Option<Verdict> {
    let p = i.price_change_pct;
    let flow = fmt_flow(i.net_flow);

    let (kind, severity, note) = if c.price_above_moderate {
        if c.flow_positive {
            (SignalKind::HealthyUptrend, Severity::Bullish, "buyers lead the move")
        } else {
            (SignalKind::WeakUptrend, Severity::Caution, "price rises without net buying")
        }
    } else if c.price_below_moderate {
        if c.flow_positive {
            (SignalKind::DipAbsorbed, Severity::Bullish, "buyers absorb the dip")
        } else {
            (SignalKind::AggressiveSelling, Severity::Bearish, "sellers lead the move")
        }
    } else {
        return None;
    };

    Some(Verdict::new(
        kind,
        severity,
        format!("Price {p:+.1}%, flow {flow}: {note}."),
    ))
}

fn neutral(i: &ClassifierInput) -> Verdict {
    Verdict::new(
        SignalKind::Neutral,
        Severity::Neutral,
        format!(
            "Price {:+.1}%, flow {}: no directional signal.",
            i.price_change_pct,
            fmt_flow(i.net_flow)
        ),
    )
}

/// Open interest and sentiment context shared by every explanation.
fn context(i: &ClassifierInput) -> String {
    let oi = if i.aux_change_pct == 0.0 {
        "Open interest: no data.".to_string()
    } else if i.aux_change_pct > 0.0 {
        format!("Open interest {:+.1}% (leverage building).", i.aux_change_pct)
    } else {
        format!("Open interest {:+.1}% (leverage unwinding).", i.aux_change_pct)
    };

    match (i.whale_ratio, i.retail_ratio) {
        (None, None) => format!("{oi} Sentiment: no data."),
        _ => format!(
            "{oi} Whales {:.2}x, retail {:.2}x long/short.",
            i.whale(),
            i.retail()
        ),
    }
}

fn count(flags: &[bool]) -> u8 {
    flags.iter().filter(|&&f| f).count() as u8
}

fn fmt_flow(net_flow: f64) -> String {
    format!("${:.1}M", net_flow / 1_000_000.0)
}
