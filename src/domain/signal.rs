//! Trading signal types emitted by strategies.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalAction::Buy => "BUY",
            SignalAction::Sell => "SELL",
            SignalAction::Hold => "HOLD",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalStrength::Weak => "WEAK",
            SignalStrength::Moderate => "MODERATE",
            SignalStrength::Strong => "STRONG",
        };
        write!(f, "{s}")
    }
}

/// Immutable signal record, always timestamped at an existing bar.
///
/// The field set is a stable boundary consumed by downstream collaborators
/// (dashboard, notifier, JSON persistence).
#[derive(Debug, Clone, Serialize)]
pub struct Signal {
    pub ticker: String,
    pub action: SignalAction,
    pub strength: SignalStrength,
    pub reason: String,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub metadata: HashMap<String, f64>,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ ${:.2} ({}, {}) - {}",
            self.action, self.ticker, self.price, self.strength, self.reason, self.timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_signal() -> Signal {
        Signal {
            ticker: "AAPL".into(),
            action: SignalAction::Buy,
            strength: SignalStrength::Strong,
            reason: "Golden Cross".into(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            price: 123.456,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn display_format() {
        let s = sample_signal();
        assert_eq!(
            s.to_string(),
            "BUY AAPL @ $123.46 (STRONG, Golden Cross) - 2024-01-15 09:30:00"
        );
    }

    #[test]
    fn strength_ordering() {
        assert!(SignalStrength::Weak < SignalStrength::Moderate);
        assert!(SignalStrength::Moderate < SignalStrength::Strong);
    }

    #[test]
    fn serializes_uppercase_variants() {
        let s = sample_signal();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"action\":\"BUY\""));
        assert!(json.contains("\"strength\":\"STRONG\""));
    }
}
