//! Hierarchical market-data paths and wildcard patterns.
//!
//! A path has the shape `exchange/instrument/datatype` where the datatype
//! segment is one of `trades`, `candles_<duration>`, `book`, or
//! `ladder_<depth>`. Patterns permit `*` in any segment.

use crate::error::MarketError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use types::{format_duration, parse_duration, DurationMicros, Instant, Instrument};

// =============================================================================
// DataType
// =============================================================================

/// What kind of records a data set holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Trade prints.
    Trades,
    /// Fixed-interval candles at the given step.
    Candles(DurationMicros),
    /// Raw order-book deltas.
    Book,
    /// Fixed-depth ladders.
    Ladder(usize),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Trades => write!(f, "trades"),
            DataType::Candles(step) => write!(f, "candles_{}", format_duration(*step)),
            DataType::Book => write!(f, "book"),
            DataType::Ladder(depth) => write!(f, "ladder_{}", depth),
        }
    }
}

impl FromStr for DataType {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, MarketError> {
        if s == "trades" {
            return Ok(DataType::Trades);
        }
        if s == "book" {
            return Ok(DataType::Book);
        }
        if let Some(rest) = s.strip_prefix("candles_") {
            let step = parse_duration(rest)
                .ok_or_else(|| MarketError::InvalidPath(format!("bad candle duration: {s}")))?;
            return Ok(DataType::Candles(step));
        }
        if let Some(rest) = s.strip_prefix("ladder_") {
            let depth: usize = rest
                .parse()
                .map_err(|_| MarketError::InvalidPath(format!("bad ladder depth: {s}")))?;
            return Ok(DataType::Ladder(depth));
        }
        Err(MarketError::InvalidPath(format!("unknown datatype: {s}")))
    }
}

// =============================================================================
// DataPath
// =============================================================================

/// Fully-qualified address of one data set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DataPath {
    pub exchange: String,
    pub instrument: Instrument,
    pub datatype: DataType,
}

impl DataPath {
    pub fn new(
        exchange: impl Into<String>,
        instrument: impl Into<Instrument>,
        datatype: DataType,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            instrument: instrument.into(),
            datatype,
        }
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.exchange, self.instrument, self.datatype)
    }
}

impl From<DataPath> for String {
    fn from(path: DataPath) -> String {
        path.to_string()
    }
}

impl FromStr for DataPath {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, MarketError> {
        let parts: Vec<&str> = s.split('/').collect();
        let [exchange, instrument, datatype] = parts.as_slice() else {
            return Err(MarketError::InvalidPath(s.to_string()));
        };
        if exchange.is_empty() || instrument.is_empty() {
            return Err(MarketError::InvalidPath(s.to_string()));
        }
        Ok(DataPath {
            exchange: exchange.to_string(),
            instrument: instrument.to_string(),
            datatype: datatype.parse()?,
        })
    }
}

impl TryFrom<String> for DataPath {
    type Error = MarketError;

    fn try_from(s: String) -> Result<Self, MarketError> {
        s.parse()
    }
}

// =============================================================================
// PathPattern
// =============================================================================

/// A path with `*` wildcards permitted in any segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PathPattern {
    /// `None` matches any exchange.
    pub exchange: Option<String>,
    /// `None` matches any instrument.
    pub instrument: Option<String>,
    /// `None` matches any datatype; stored in rendered form.
    pub datatype: Option<String>,
}

impl PathPattern {
    /// A pattern matching everything (`*/*/*`).
    pub fn any() -> Self {
        Self {
            exchange: None,
            instrument: None,
            datatype: None,
        }
    }

    /// Whether the pattern matches the given concrete path.
    pub fn matches(&self, path: &DataPath) -> bool {
        let seg = |want: &Option<String>, have: &str| match want {
            Some(want) => want == have,
            None => true,
        };
        seg(&self.exchange, &path.exchange)
            && seg(&self.instrument, &path.instrument)
            && seg(&self.datatype, &path.datatype.to_string())
    }
}

impl From<DataPath> for PathPattern {
    fn from(path: DataPath) -> Self {
        Self {
            exchange: Some(path.exchange),
            instrument: Some(path.instrument),
            datatype: Some(path.datatype.to_string()),
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let star = |s: &Option<String>| s.clone().unwrap_or_else(|| "*".to_string());
        write!(
            f,
            "{}/{}/{}",
            star(&self.exchange),
            star(&self.instrument),
            star(&self.datatype)
        )
    }
}

impl From<PathPattern> for String {
    fn from(pattern: PathPattern) -> String {
        pattern.to_string()
    }
}

impl FromStr for PathPattern {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, MarketError> {
        let parts: Vec<&str> = s.split('/').collect();
        let [exchange, instrument, datatype] = parts.as_slice() else {
            return Err(MarketError::InvalidPath(s.to_string()));
        };
        let seg = |part: &str| {
            if part == "*" {
                None
            } else {
                Some(part.to_string())
            }
        };
        // Concrete datatype segments must at least parse.
        if *datatype != "*" {
            datatype.parse::<DataType>()?;
        }
        Ok(PathPattern {
            exchange: seg(exchange),
            instrument: seg(instrument),
            datatype: seg(datatype),
        })
    }
}

impl TryFrom<String> for PathPattern {
    type Error = MarketError;

    fn try_from(s: String) -> Result<Self, MarketError> {
        s.parse()
    }
}

// =============================================================================
// DataSelection
// =============================================================================

/// A pattern plus an instant range: `[from, to)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSelection {
    pub path: PathPattern,
    /// Inclusive lower bound; absent means epoch zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Instant>,
    /// Exclusive upper bound; absent means effectively unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Instant>,
}

impl DataSelection {
    pub fn new(path: PathPattern) -> Self {
        Self {
            path,
            from: None,
            to: None,
        }
    }

    pub fn from(mut self, from: Instant) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: Instant) -> Self {
        self.to = Some(to);
        self
    }

    /// Effective lower bound.
    pub fn from_micros(&self) -> Instant {
        self.from.unwrap_or(0)
    }

    /// Effective upper bound.
    pub fn to_micros(&self) -> Instant {
        self.to.unwrap_or(i64::MAX)
    }
}
