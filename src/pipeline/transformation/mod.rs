use std::fmt::Debug;

use super::{DataSet, DuctoError, Schema};

mod coalesce_transformation;
mod derive_transformation;
mod filter_transformation;
mod window_transformation;

pub use coalesce_transformation::CoalesceTransformation;
pub use derive_transformation::DeriveTransformation;
pub use filter_transformation::FilterTransformation;
pub use window_transformation::{WindowKind, WindowTransformation};

pub trait Transformation: Sync + Send + Debug {
    fn get_output_schema(&self, input_schema: &Schema) -> Schema;
    fn transform(&self, dataset: Box<dyn DataSet>) -> Result<Box<dyn DataSet>, DuctoError>;

    fn dump(&self) -> String;
}
