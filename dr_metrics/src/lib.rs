pub mod accessor;
pub mod carriers;
pub mod chart;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod extractor;
pub mod frame;
pub mod metrics;
pub mod models;
pub mod network;
pub mod season;

pub use accessor::{Extractor, Metric, ResultsAccessor};
pub use carriers::{CarrierClass, CarrierEntry, CarrierMap, Renewable, ResolvedCarriers, Sector};
pub use chart::Chart;
pub use config::{AnalysisConfig, ChartOptions, SeasonConfig, SpanBoundary};
pub use data_loader::NetworkLoader;
pub use error::{MetricsError, Result};
pub use extractor::{ExtractorContext, MetricExtractor};
pub use metrics::PeakComponent;
pub use models::{Datapoint, EventWindow, MetricTable, MetricValue};
pub use network::{Component, ComponentKind, Network, NetworkBuilder, NetworkSource, SeriesKind, Snapshot};
