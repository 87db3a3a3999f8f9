use crate::error::{MetricsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where the contraction loop stops relative to the target span.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpanBoundary {
    /// Stop once the window holds exactly `target_span` events
    Exact,
    /// Stop once the window holds `target_span + 1` events
    PlusOne,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeasonConfig {
    pub top_events: usize,
    pub target_span: usize,
    pub boundary: SpanBoundary,
}

impl SeasonConfig {
    /// Shed season: top 100 net-load hours contracted to 81 rows.
    pub const SHED: SeasonConfig = SeasonConfig {
        top_events: 100,
        target_span: 80,
        boundary: SpanBoundary::PlusOne,
    };

    /// Shift season: top 25 ramping days contracted to 21 rows.
    pub const SHIFT: SeasonConfig = SeasonConfig {
        top_events: 25,
        target_span: 21,
        boundary: SpanBoundary::Exact,
    };

    /// Number of rows the contracted window ends up with.
    pub fn terminal_len(&self) -> usize {
        match self.boundary {
            SpanBoundary::Exact => self.target_span,
            SpanBoundary::PlusOne => self.target_span + 1,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.target_span == 0 {
            return Err(MetricsError::Config(format!("{name}.target_span must be positive")));
        }
        if self.top_events < self.terminal_len() {
            return Err(MetricsError::Config(format!(
                "{name}.top_events ({}) is smaller than the terminal window ({})",
                self.top_events,
                self.terminal_len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChartOptions {
    pub width: u32,
    /// Height of a single panel; multi-panel charts stack panels vertically
    pub height: u32,
    pub font_size: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 2000,
            height: 600,
            font_size: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub shed_season: SeasonConfig,
    pub shift_season: SeasonConfig,
    pub peak_rank: usize,
    pub ramp_rank: usize,
    pub ramp_lag: usize,
    pub shed_day_rank: usize,
    pub chart: ChartOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            shed_season: SeasonConfig::SHED,
            shift_season: SeasonConfig::SHIFT,
            peak_rank: 100,
            ramp_rank: 25,
            ramp_lag: 3,
            shed_day_rank: 100,
            chart: ChartOptions::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.shed_season.validate("shed_season")?;
        self.shift_season.validate("shift_season")?;
        if self.peak_rank == 0 || self.ramp_rank == 0 || self.shed_day_rank == 0 {
            return Err(MetricsError::Config("ranks must be at least 1".to_string()));
        }
        if self.ramp_lag == 0 {
            return Err(MetricsError::Config("ramp_lag must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_season_terminals() {
        assert_eq!(SeasonConfig::SHED.terminal_len(), 81);
        assert_eq!(SeasonConfig::SHIFT.terminal_len(), 21);
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "peak_rank": 50, "chart": { "width": 800, "height": 300, "font_size": 10 } }"#)
                .unwrap();
        assert_eq!(config.peak_rank, 50);
        assert_eq!(config.ramp_rank, 25);
        assert_eq!(config.shed_season, SeasonConfig::SHED);
        assert_eq!(config.chart.width, 800);
    }

    #[test]
    fn test_rejects_window_larger_than_event_set() {
        let mut config = AnalysisConfig::default();
        config.shift_season = SeasonConfig {
            top_events: 20,
            target_span: 21,
            boundary: SpanBoundary::Exact,
        };
        assert!(matches!(config.validate(), Err(MetricsError::Config(_))));
    }
}
