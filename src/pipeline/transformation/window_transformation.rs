use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;

use crate::pipeline::{Column, DataSet, DuctoError, Schema, Value, ValueType};

use super::Transformation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowKind {
    RowNumber,
    Rank,
    Lag(usize),
    Lead(usize),
    Sum,
    Avg,
}

impl WindowKind {
    fn name(&self) -> &'static str {
        match self {
            WindowKind::RowNumber => "row_number",
            WindowKind::Rank => "rank",
            WindowKind::Lag(_) => "lag",
            WindowKind::Lead(_) => "lead",
            WindowKind::Sum => "sum",
            WindowKind::Avg => "avg",
        }
    }

    /// Ranking functions may create the target column, the others read it.
    fn creates_target(&self) -> bool {
        matches!(self, WindowKind::RowNumber | WindowKind::Rank)
    }
}

/// Partitions the input by key columns, orders every partition, then writes
/// a per-row window value into the target column. Partitions are emitted in
/// first-seen order, ties within a partition keep their input order.
#[derive(Debug)]
pub struct WindowTransformation {
    kind: WindowKind,
    partition_columns: Vec<String>,
    order_columns: Vec<String>,
    target_column: String,
    partition_indices: Vec<usize>,
    order_indices: Vec<usize>,
    target_index: usize,
    append: bool,
    output_schema: Arc<Schema>,
}

impl WindowTransformation {
    pub fn create(
        input_schema: &Schema,
        kind: WindowKind,
        partition_columns: Vec<String>,
        order_columns: Vec<String>,
        target_column: String,
    ) -> Result<Box<dyn Transformation>, DuctoError> {
        let partition_indices = partition_columns
            .iter()
            .map(|name| input_schema.require_index(name))
            .collect::<Result<Vec<_>, _>>()?;
        let order_indices = order_columns
            .iter()
            .map(|name| input_schema.require_index(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut columns = input_schema.columns.clone();
        let (target_index, append) = match input_schema.get_column_index(&target_column) {
            Some(index) => (index, false),
            None if kind.creates_target() => {
                columns.push(Column::new(target_column.clone(), ValueType::Long));
                (columns.len() - 1, true)
            }
            None => return Err(DuctoError::ColumnNotFound(target_column)),
        };
        match kind {
            WindowKind::RowNumber | WindowKind::Rank => {
                if !append {
                    columns[target_index] = Column::new(target_column.clone(), ValueType::Long);
                }
            }
            WindowKind::Sum | WindowKind::Avg => {
                let source_type = columns[target_index].column_type;
                if !source_type.is_numeric() {
                    return Err(DuctoError::InvalidOperandType(
                        kind.name().to_string(),
                        source_type,
                    ));
                }
                let output_type = match kind {
                    WindowKind::Avg => ValueType::Double,
                    _ => match source_type {
                        ValueType::Float | ValueType::Double => ValueType::Double,
                        _ => ValueType::Long,
                    },
                };
                columns[target_index] = Column::new(target_column.clone(), output_type);
            }
            // Lag and Lead keep the source column type
            WindowKind::Lag(_) | WindowKind::Lead(_) => {}
        }

        Ok(Box::new(Self {
            kind,
            partition_columns,
            order_columns,
            target_column,
            partition_indices,
            order_indices,
            target_index,
            append,
            output_schema: Arc::new(columns.into()),
        }))
    }
}

impl Transformation for WindowTransformation {
    fn get_output_schema(&self, _input_schema: &Schema) -> Schema {
        self.output_schema.as_ref().clone()
    }

    fn transform(&self, dataset: Box<dyn DataSet>) -> Result<Box<dyn DataSet>, DuctoError> {
        Ok(Box::new(WindowDataSet {
            input: dataset,
            kind: self.kind,
            partition_indices: self.partition_indices.clone(),
            order_indices: self.order_indices.clone(),
            target_index: self.target_index,
            append: self.append,
            output_schema: self.output_schema.clone(),
            rows: None,
        }))
    }

    fn dump(&self) -> String {
        format!(
            "window {}() over (partition by [{}] order by [{}]) as {}",
            self.kind.name(),
            self.partition_columns.join(", "),
            self.order_columns.join(", "),
            self.target_column
        )
    }
}

/// Hashable wrapper over the partition key fields.
#[derive(Clone, Debug)]
struct GroupKey(Vec<Value>);

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.total_cmp(b) == Ordering::Equal)
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for value in &self.0 {
            match value {
                Value::Null => 0u8.hash(state),
                Value::Bool(v) => (1u8, v).hash(state),
                // All numeric widths hash alike, matching total_cmp equality
                Value::Int(v) => (2u8, (*v as f64).to_bits()).hash(state),
                Value::Long(v) => (2u8, (*v as f64).to_bits()).hash(state),
                Value::Float(v) => (2u8, (*v as f64).to_bits()).hash(state),
                Value::Double(v) => (2u8, v.to_bits()).hash(state),
                Value::String(v) => (3u8, v).hash(state),
                Value::DateTime(v) => (4u8, v).hash(state),
                Value::Error(e) => (5u8, e.to_string()).hash(state),
            }
        }
    }
}

struct WindowDataSet {
    input: Box<dyn DataSet>,
    kind: WindowKind,
    partition_indices: Vec<usize>,
    order_indices: Vec<usize>,
    target_index: usize,
    append: bool,
    output_schema: Arc<Schema>,
    rows: Option<VecDeque<Vec<Value>>>,
}

impl WindowDataSet {
    fn process(&self, input_rows: Vec<Vec<Value>>) -> VecDeque<Vec<Value>> {
        let mut group_order: Vec<GroupKey> = Vec::new();
        let mut groups: HashMap<GroupKey, Vec<Vec<Value>>> = HashMap::new();
        for row in input_rows {
            let key = GroupKey(
                self.partition_indices
                    .iter()
                    .map(|&i| row[i].clone())
                    .collect(),
            );
            match groups.get_mut(&key) {
                Some(group) => group.push(row),
                None => {
                    group_order.push(key.clone());
                    groups.insert(key, vec![row]);
                }
            }
        }

        let mut output = VecDeque::new();
        for key in group_order {
            let mut group = match groups.remove(&key) {
                Some(group) => group,
                None => continue,
            };
            // Stable sort keeps input order for equal keys
            group.sort_by(|a, b| self.order_cmp(a, b));
            self.apply_kind(&mut group);
            output.extend(group);
        }
        output
    }

    fn order_cmp(&self, a: &[Value], b: &[Value]) -> Ordering {
        for &i in &self.order_indices {
            match a[i].total_cmp(&b[i]) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }

    fn apply_kind(&self, group: &mut Vec<Vec<Value>>) {
        let target = self.target_index;
        match self.kind {
            WindowKind::RowNumber => {
                for (pos, row) in group.iter_mut().enumerate() {
                    set_field(row, target, self.append, Value::Long(pos as i64 + 1));
                }
            }
            WindowKind::Rank => {
                let mut rank = 1i64;
                for pos in 0..group.len() {
                    if pos > 0 && self.order_cmp(&group[pos - 1], &group[pos]) != Ordering::Equal {
                        rank = pos as i64 + 1;
                    }
                    set_field(&mut group[pos], target, self.append, Value::Long(rank));
                }
            }
            WindowKind::Lag(offset) => {
                let source: Vec<Value> = group.iter().map(|row| row[target].clone()).collect();
                for (pos, row) in group.iter_mut().enumerate() {
                    row[target] = match pos.checked_sub(offset) {
                        Some(from) => source[from].clone(),
                        None => Value::Null,
                    };
                }
            }
            WindowKind::Lead(offset) => {
                let source: Vec<Value> = group.iter().map(|row| row[target].clone()).collect();
                for (pos, row) in group.iter_mut().enumerate() {
                    row[target] = source.get(pos + offset).cloned().unwrap_or(Value::Null);
                }
            }
            WindowKind::Sum | WindowKind::Avg => {
                let aggregate = self.aggregate(group);
                for row in group.iter_mut() {
                    row[target] = aggregate.clone();
                }
            }
        }
    }

    /// Null fields are skipped, an all-null partition aggregates to null.
    /// Integral sums accumulate in i64 so longs beyond 2^53 stay exact.
    fn aggregate(&self, group: &[Vec<Value>]) -> Value {
        let target = self.target_index;
        let integral = matches!(
            self.output_schema.columns[target].column_type,
            ValueType::Long
        );
        let mut long_sum = 0i64;
        let mut double_sum = 0f64;
        let mut count = 0usize;
        for row in group {
            match &row[target] {
                Value::Null => continue,
                value if integral => match value.get_long() {
                    Ok(v) => {
                        long_sum = long_sum.wrapping_add(v);
                        count += 1;
                    }
                    Err(e) => return Value::Error(e),
                },
                value => match value.get_double() {
                    Ok(v) => {
                        double_sum += v;
                        count += 1;
                    }
                    Err(e) => return Value::Error(e),
                },
            }
        }
        if count == 0 {
            return Value::Null;
        }
        match self.kind {
            WindowKind::Avg => Value::Double(double_sum / count as f64),
            _ if integral => Value::Long(long_sum),
            _ => Value::Double(double_sum),
        }
    }
}

fn set_field(row: &mut Vec<Value>, index: usize, append: bool, value: Value) {
    if append && row.len() <= index {
        row.push(value);
    } else {
        row[index] = value;
    }
}

#[async_trait]
impl DataSet for WindowDataSet {
    fn schema(&self) -> &Schema {
        &self.output_schema
    }

    /// The whole input is materialized on the first call.
    async fn next(&mut self) -> Option<Vec<Value>> {
        if self.rows.is_none() {
            let mut input_rows = Vec::new();
            while let Some(row) = self.input.next().await {
                input_rows.push(row);
            }
            self.rows = Some(self.process(input_rows));
        }
        match &mut self.rows {
            Some(rows) => rows.pop_front(),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::{
        Column, DataSetCreator, Schema, TransformOp, TransformStage, Value, ValueType, WindowKind,
    };

    fn sales_schema() -> Schema {
        Schema::from(vec![
            Column::new("region", ValueType::String),
            Column::new("amount", ValueType::Int),
        ])
    }

    #[tokio::test]
    async fn rank_gives_gaps_after_ties() {
        let ds = DataSetCreator::eager(
            sales_schema(),
            vec![
                vec![Value::from("n"), Value::Int(10)],
                vec![Value::from("n"), Value::Int(10)],
                vec![Value::from("n"), Value::Int(20)],
            ],
        );
        let mut out = TransformStage::apply(
            ds,
            &[TransformOp::window(
                WindowKind::Rank,
                vec!["region"],
                vec!["amount"],
                "rk",
            )],
        )
        .unwrap();
        let (schema, rows) = out.eval().await;
        assert_eq!(schema.columns[2].name, "rk");
        let ranks: Vec<Value> = rows.iter().map(|r| r[2].clone()).collect();
        assert_eq!(ranks, vec![Value::Long(1), Value::Long(1), Value::Long(3)]);
    }

    #[tokio::test]
    async fn rank_sorts_nan_above_finite_doubles() {
        let schema = Schema::from(vec![
            Column::new("region", ValueType::String),
            Column::new("amount", ValueType::Double),
        ]);
        let ds = DataSetCreator::eager(
            schema,
            vec![
                vec![Value::from("n"), Value::Double(f64::NAN)],
                vec![Value::from("n"), Value::Double(10.0)],
                vec![Value::from("n"), Value::Double(20.0)],
            ],
        );
        let mut out = TransformStage::apply(
            ds,
            &[TransformOp::window(
                WindowKind::Rank,
                vec!["region"],
                vec!["amount"],
                "rk",
            )],
        )
        .unwrap();
        let (_, rows) = out.eval().await;
        assert_eq!(rows[0][1], Value::Double(10.0));
        assert_eq!(rows[0][2], Value::Long(1));
        assert_eq!(rows[1][1], Value::Double(20.0));
        assert_eq!(rows[1][2], Value::Long(2));
        assert!(matches!(rows[2][1], Value::Double(v) if v.is_nan()));
        assert_eq!(rows[2][2], Value::Long(3));
    }

    #[tokio::test]
    async fn row_number_restarts_per_partition() {
        let ds = DataSetCreator::eager(
            sales_schema(),
            vec![
                vec![Value::from("n"), Value::Int(5)],
                vec![Value::from("s"), Value::Int(7)],
                vec![Value::from("n"), Value::Int(3)],
            ],
        );
        let mut out = TransformStage::apply(
            ds,
            &[TransformOp::window(
                WindowKind::RowNumber,
                vec!["region"],
                vec!["amount"],
                "rn",
            )],
        )
        .unwrap();
        let (_, rows) = out.eval().await;
        // Partition "n" first (first seen), ordered by amount ascending
        assert_eq!(rows[0], vec![Value::from("n"), Value::Int(3), Value::Long(1)]);
        assert_eq!(rows[1], vec![Value::from("n"), Value::Int(5), Value::Long(2)]);
        assert_eq!(rows[2], vec![Value::from("s"), Value::Int(7), Value::Long(1)]);
    }

    #[tokio::test]
    async fn lag_shifts_within_partition() {
        let ds = DataSetCreator::eager(
            sales_schema(),
            vec![
                vec![Value::from("n"), Value::Int(1)],
                vec![Value::from("n"), Value::Int(2)],
                vec![Value::from("n"), Value::Int(3)],
            ],
        );
        let mut out = TransformStage::apply(
            ds,
            &[TransformOp::window(
                WindowKind::Lag(1),
                vec!["region"],
                vec!["amount"],
                "amount",
            )],
        )
        .unwrap();
        let (_, rows) = out.eval().await;
        let shifted: Vec<Value> = rows.iter().map(|r| r[1].clone()).collect();
        assert_eq!(shifted, vec![Value::Null, Value::Int(1), Value::Int(2)]);
    }

    #[tokio::test]
    async fn avg_skips_nulls() {
        let ds = DataSetCreator::eager(
            sales_schema(),
            vec![
                vec![Value::from("n"), Value::Int(10)],
                vec![Value::from("n"), Value::Null],
                vec![Value::from("n"), Value::Int(20)],
            ],
        );
        let mut out = TransformStage::apply(
            ds,
            &[TransformOp::window(
                WindowKind::Avg,
                vec!["region"],
                vec![],
                "amount",
            )],
        )
        .unwrap();
        let (_, rows) = out.eval().await;
        for row in rows {
            assert_eq!(row[1], Value::Double(15.0));
        }
    }

    #[tokio::test]
    async fn long_sum_is_exact_beyond_double_precision() {
        let schema = Schema::from(vec![
            Column::new("region", ValueType::String),
            Column::new("amount", ValueType::Long),
        ]);
        // 2^53 + 1 is not representable as f64
        let big = (1i64 << 53) + 1;
        let ds = DataSetCreator::eager(
            schema,
            vec![
                vec![Value::from("n"), Value::Long(big)],
                vec![Value::from("n"), Value::Long(2)],
            ],
        );
        let mut out = TransformStage::apply(
            ds,
            &[TransformOp::window(
                WindowKind::Sum,
                vec!["region"],
                vec![],
                "amount",
            )],
        )
        .unwrap();
        let (_, rows) = out.eval().await;
        assert_eq!(rows[0][1], Value::Long(big + 2));
    }

    #[tokio::test]
    async fn sum_of_all_null_partition_is_null() {
        let ds = DataSetCreator::eager(
            sales_schema(),
            vec![vec![Value::from("n"), Value::Null]],
        );
        let mut out = TransformStage::apply(
            ds,
            &[TransformOp::window(
                WindowKind::Sum,
                vec!["region"],
                vec![],
                "amount",
            )],
        )
        .unwrap();
        let (_, rows) = out.eval().await;
        assert_eq!(rows[0][1], Value::Null);
    }
}
