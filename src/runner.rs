use tracing::{debug, instrument};

use crate::common::Logged;
use crate::pipeline::{
    DataSetCreator, DuctoError, StageKind, TransformOp, TransformStage, Validated, ValidationMode,
};
use crate::sink::{SinkWriter, WriteSpec};
use crate::source::{ReadSpec, SourceReader};

/// Where a run currently is. Every failure halts the machine in `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Reading,
    Transforming,
    Writing,
    Done,
    Failed,
}

#[derive(Debug)]
pub struct RunResult {
    pub status: RunState,
    pub record_count: usize,
    pub error: Option<DuctoError>,
}

/// Drives one read / transform / write cycle. The runner is stateless, so
/// concurrent runs over disjoint locations need no coordination.
pub struct PipelineRunner;

impl PipelineRunner {
    #[instrument(skip_all, fields(source = %read_spec.location, sink = %write_spec.location))]
    pub async fn run(
        read_spec: &ReadSpec,
        ops: &[TransformOp],
        write_spec: &WriteSpec,
    ) -> RunResult {
        match Self::execute(read_spec, ops, write_spec).await.log() {
            Ok(record_count) => RunResult {
                status: RunState::Done,
                record_count,
                error: None,
            },
            Err(e) => RunResult {
                status: RunState::Failed,
                record_count: 0,
                error: Some(e),
            },
        }
    }

    /// Each stage is fully drained before the next one starts, so in-band
    /// error fields surface as that stage's failure and never leak across
    /// a stage boundary.
    async fn execute(
        read_spec: &ReadSpec,
        ops: &[TransformOp],
        write_spec: &WriteSpec,
    ) -> Result<usize, DuctoError> {
        debug!("Entering state {:?}", RunState::Reading);
        let mut dataset = SourceReader::read(read_spec)
            .map_err(|e| e.in_stage(StageKind::Read))?
            .validated(ValidationMode::Strict);
        let (schema, rows) = dataset
            .try_eval()
            .await
            .map_err(|e| e.in_stage(StageKind::Read))?;
        debug!("Read {} records from '{}'", rows.len(), read_spec.location);

        debug!("Entering state {:?}", RunState::Transforming);
        let mut transformed =
            TransformStage::apply(DataSetCreator::eager(schema, rows), ops)
                .map_err(|e| e.in_stage(StageKind::Transform))?;
        let (schema, rows) = transformed
            .try_eval()
            .await
            .map_err(|e| e.in_stage(StageKind::Transform))?;
        debug!("{} records after {} transform ops", rows.len(), ops.len());

        debug!("Entering state {:?}", RunState::Writing);
        let result = SinkWriter::write(DataSetCreator::eager(schema, rows), write_spec)
            .await
            .map_err(|e| e.in_stage(StageKind::Write))?;
        debug!(
            "Wrote {} records to '{}'",
            result.record_count, write_spec.location
        );
        Ok(result.record_count)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::pipeline::{col, lit, StageKind};
    use crate::sink::WriteMode;
    use crate::source::Format;

    use super::*;

    fn csv_source(dir: &std::path::Path) -> String {
        let path = dir.join("in.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"id,age\ncliente1,25\ncliente2,30\n").unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn read_failure_is_wrapped_as_read_stage() {
        let dir = tempfile::tempdir().unwrap();
        let read_spec = ReadSpec::new("/no/such/file.csv", Format::Csv);
        let write_spec = WriteSpec::new(
            dir.path().join("out").to_string_lossy(),
            Format::Csv,
            WriteMode::Overwrite,
        );
        let result = PipelineRunner::run(&read_spec, &[], &write_spec).await;
        assert_eq!(result.status, RunState::Failed);
        assert!(matches!(
            result.error,
            Some(DuctoError::StageExecution {
                stage: StageKind::Read,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn transform_failure_is_wrapped_as_transform_stage() {
        let dir = tempfile::tempdir().unwrap();
        let source = csv_source(dir.path());
        let read_spec = ReadSpec::new(&source, Format::Csv);
        let write_spec = WriteSpec::new(
            dir.path().join("out").to_string_lossy(),
            Format::Csv,
            WriteMode::Overwrite,
        );
        let ops = vec![TransformOp::filter(col("missing").gt(lit(0)))];
        let result = PipelineRunner::run(&read_spec, &ops, &write_spec).await;
        assert_eq!(result.status, RunState::Failed);
        assert!(matches!(
            result.error,
            Some(DuctoError::StageExecution {
                stage: StageKind::Transform,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn successful_run_reports_written_count() {
        let dir = tempfile::tempdir().unwrap();
        let source = csv_source(dir.path());
        let read_spec = ReadSpec::new(&source, Format::Csv);
        let write_spec = WriteSpec::new(
            dir.path().join("out").to_string_lossy(),
            Format::Csv,
            WriteMode::Append,
        );
        let ops = vec![TransformOp::filter(col("age").gt(lit(26)))];
        let result = PipelineRunner::run(&read_spec, &ops, &write_spec).await;
        assert_eq!(result.status, RunState::Done);
        assert_eq!(result.record_count, 1);
        assert!(result.error.is_none());
    }
}
