mod common;
mod pipeline;
mod runner;
mod sink;
mod source;

pub use common::Logged;
pub use pipeline::{
    col, lit, Column, DataSet, DataSetCreator, DuctoError, Expr, Function, Schema, StageKind,
    TransformOp, TransformStage, Validated, ValidatedDataSet, ValidationMode, Value, ValueType,
    WindowKind,
};
pub use runner::{PipelineRunner, RunResult, RunState};
pub use sink::{SinkWriter, WriteMode, WriteResult, WriteSpec};
pub use source::{Format, ReadSpec, SourceReader};
