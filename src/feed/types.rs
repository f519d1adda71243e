//! Earthquake event model and feed window selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One earthquake record as parsed from a feed feature.
///
/// `time` is epoch milliseconds and is the authoritative ordering key.
/// Records are never mutated by the refresh pipeline; a fresher record
/// with the same `id` replaces the old one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuakeEvent {
    pub id: String,
    pub magnitude: f64,
    pub place: String,
    pub time: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub depth: f64,
    pub url: String,
    #[serde(default)]
    pub felt: Option<i64>,
    #[serde(default)]
    pub alert: Option<String>,
    /// Set only by the moderation path, which lives outside this crate.
    #[serde(default)]
    pub edited_by_admin: bool,
    #[serde(default)]
    pub original_magnitude: Option<f64>,
}

/// Time span requested from the remote feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedWindow {
    Hour,
    Day,
    Week,
    Month,
}

impl FeedWindow {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FeedWindow::Hour => "hour",
            FeedWindow::Day => "day",
            FeedWindow::Week => "week",
            FeedWindow::Month => "month",
        }
    }

    pub const fn all() -> &'static [FeedWindow] {
        &[
            FeedWindow::Hour,
            FeedWindow::Day,
            FeedWindow::Week,
            FeedWindow::Month,
        ]
    }
}

impl Default for FeedWindow {
    fn default() -> Self {
        Self::Week
    }
}

impl fmt::Display for FeedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeedWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(FeedWindow::Hour),
            "day" => Ok(FeedWindow::Day),
            "week" => Ok(FeedWindow::Week),
            "month" => Ok(FeedWindow::Month),
            _ => Err(format!("unknown feed window: {}", s)),
        }
    }
}

impl serde::Serialize for FeedWindow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for FeedWindow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FeedWindow::from_str(&s).map_err(serde::de::Error::custom)
    }
}
