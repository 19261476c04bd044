//! Column-major copy of a binary problem for the L1-regularized solvers

use crate::solver::BinaryProblem;

/// One stored entry of a feature column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnEntry {
    /// 0-based instance index
    pub row: usize,
    pub value: f64,
}

/// Owned transpose of the training rows.
///
/// The shared problem is never modified; solvers that want label-scaled
/// values ask for them at construction time.
#[derive(Debug, Clone)]
pub struct ColumnMajor {
    columns: Vec<Vec<ColumnEntry>>,
    y: Vec<i8>,
}

impl ColumnMajor {
    /// Transpose `prob`, multiplying every value by its row label when
    /// `scale_by_label` is set
    pub fn from_rows(prob: &BinaryProblem<'_>, scale_by_label: bool) -> Self {
        let mut counts = vec![0usize; prob.n];
        for row in prob.x {
            for node in row.iter() {
                counts[node.index - 1] += 1;
            }
        }

        let mut columns: Vec<Vec<ColumnEntry>> =
            counts.into_iter().map(Vec::with_capacity).collect();
        for (i, row) in prob.x.iter().enumerate() {
            let scale = if scale_by_label { f64::from(prob.y[i]) } else { 1.0 };
            for node in row.iter() {
                columns[node.index - 1].push(ColumnEntry {
                    row: i,
                    value: node.value * scale,
                });
            }
        }

        Self {
            columns,
            y: prob.y.to_vec(),
        }
    }

    /// Number of instances
    pub fn n_rows(&self) -> usize {
        self.y.len()
    }

    /// Number of features
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, j: usize) -> &[ColumnEntry] {
        &self.columns[j]
    }

    pub fn labels(&self) -> &[i8] {
        &self.y
    }

    /// Total number of stored entries
    pub fn nnz(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FeatureNode;

    fn sample() -> Vec<Vec<FeatureNode>> {
        vec![
            vec![FeatureNode::new(1, 1.0), FeatureNode::new(3, 2.0)],
            vec![FeatureNode::new(2, 4.0), FeatureNode::new(3, -1.0)],
        ]
    }

    #[test]
    fn test_transpose_layout() {
        let data = sample();
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, -1];
        let prob = BinaryProblem::new(3, &x, &y);
        let columns = ColumnMajor::from_rows(&prob, false);

        assert_eq!(columns.n_rows(), 2);
        assert_eq!(columns.n_columns(), 3);
        assert_eq!(columns.nnz(), 4);
        assert_eq!(columns.column(0), &[ColumnEntry { row: 0, value: 1.0 }]);
        assert_eq!(
            columns.column(2),
            &[ColumnEntry { row: 0, value: 2.0 }, ColumnEntry { row: 1, value: -1.0 }]
        );
    }

    #[test]
    fn test_label_scaling_leaves_rows_untouched() {
        let data = sample();
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, -1];
        let prob = BinaryProblem::new(3, &x, &y);
        let columns = ColumnMajor::from_rows(&prob, true);

        assert_eq!(columns.column(1), &[ColumnEntry { row: 1, value: -4.0 }]);
        assert_eq!(columns.column(2)[1].value, 1.0);
        assert_eq!(data[1][0].value, 4.0);
    }

    #[test]
    fn test_empty_columns_are_kept() {
        let data = vec![vec![FeatureNode::new(3, 1.0)]];
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [-1];
        let prob = BinaryProblem::new(4, &x, &y);
        let columns = ColumnMajor::from_rows(&prob, false);

        assert_eq!(columns.n_columns(), 4);
        assert!(columns.column(0).is_empty());
        assert!(columns.column(3).is_empty());
    }
}
