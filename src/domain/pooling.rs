// ============================================================
// Layer 3 — Pooling Strategy
// ============================================================
// The encoder returns one hidden vector per token. The head
// needs one vector per example, so the token axis has to be
// collapsed. Which way it is collapsed is the pooling strategy.
//
//   cls       first token's hidden state              width h
//   mean      average over non-padding tokens         width h
//   max       element-wise max over non-padding       width h
//   mean_max  mean ⧺ max                              width 2h
//
// Identifiers come from config files and CLI flags, so parsing
// is case-insensitive ("CLS", "Mean", "mean_max").
//
// The tensor maths lives in ml::pooling — this file is plain Rust.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::HeadError;

/// How encoder hidden states are reduced to one vector per example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Pooling {
    Cls,
    Mean,
    Max,
    MeanMax,
}

impl Pooling {
    /// Width of the pooled vector for an encoder of the given hidden size.
    pub fn pooled_width(&self, hidden_size: usize) -> usize {
        match self {
            Pooling::Cls | Pooling::Mean | Pooling::Max => hidden_size,
            Pooling::MeanMax => hidden_size * 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Pooling::Cls     => "cls",
            Pooling::Mean    => "mean",
            Pooling::Max     => "max",
            Pooling::MeanMax => "mean_max",
        }
    }
}

impl FromStr for Pooling {
    type Err = HeadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cls"      => Ok(Pooling::Cls),
            "mean"     => Ok(Pooling::Mean),
            "max"      => Ok(Pooling::Max),
            "mean_max" => Ok(Pooling::MeanMax),
            _          => Err(HeadError::UnknownPooling(s.to_string())),
        }
    }
}

impl TryFrom<String> for Pooling {
    type Error = HeadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pooling> for String {
    fn from(p: Pooling) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for Pooling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("CLS".parse::<Pooling>().unwrap(),      Pooling::Cls);
        assert_eq!("Mean".parse::<Pooling>().unwrap(),     Pooling::Mean);
        assert_eq!(" max ".parse::<Pooling>().unwrap(),    Pooling::Max);
        assert_eq!("MEAN_MAX".parse::<Pooling>().unwrap(), Pooling::MeanMax);
    }

    #[test]
    fn test_unknown_identifier_is_rejected() {
        let err = "attention".parse::<Pooling>().unwrap_err();
        assert!(matches!(err, HeadError::UnknownPooling(ref s) if s == "attention"));
    }

    #[test]
    fn test_pooled_width() {
        assert_eq!(Pooling::Cls.pooled_width(768),     768);
        assert_eq!(Pooling::Mean.pooled_width(768),    768);
        assert_eq!(Pooling::MeanMax.pooled_width(768), 1536);
    }

    #[test]
    fn test_serde_uses_identifier() {
        let json = serde_json::to_string(&Pooling::MeanMax).unwrap();
        assert_eq!(json, "\"mean_max\"");
        let back: Pooling = serde_json::from_str("\"Cls\"").unwrap();
        assert_eq!(back, Pooling::Cls);
    }
}
