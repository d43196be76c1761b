pub mod batch_orchestrator;
pub mod point_sampler;
pub mod result_assembler;
pub mod strategy_selector;
pub mod table_validator;
pub mod temporal_aggregator;

pub use batch_orchestrator::{BatchOrchestrator, BatchStats};
pub use point_sampler::PointSampler;
pub use result_assembler::ResultAssembler;
pub use strategy_selector::{select_strategy, FetchStrategy};
pub use table_validator::{DatasetSummary, TableValidator};
pub use temporal_aggregator::{AggregationRule, TemporalAggregator};
