//! Sparse text format reader
//!
//! One instance per line:
//!
//! ```text
//! <label> <index>:<value> <index>:<value> ...
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1
//! ```
//!
//! Indices are 1-based and strictly ascending. Blank lines and lines starting
//! with `#` are skipped. Bytes are decoded as ISO-8859-1.

use crate::core::{FeatureNode, LinearError, Problem, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read a training or test set from `path`.
///
/// With `bias >= 0` the node `(max_index + 1, bias)` is appended to every
/// instance.
pub fn read_problem<P: AsRef<Path>>(path: P, bias: f64) -> Result<Problem> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_problem_from_reader(BufReader::new(file), bias, &path.display().to_string())
}

/// Read a problem from any buffered reader; `source` names it in errors
pub fn read_problem_from_reader<R: BufRead>(mut reader: R, bias: f64, source: &str) -> Result<Problem> {
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut buf = Vec::new();
    let mut line_num = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_num += 1;

        let line: String = buf.iter().map(|&b| char::from(b)).collect();
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (label, nodes) = parse_line(line).map_err(|message| LinearError::InvalidInputData {
            file: source.to_string(),
            line: line_num,
            message,
        })?;
        y.push(label);
        x.push(nodes);
    }

    if y.is_empty() {
        return Err(LinearError::EmptyDataset);
    }

    Problem::new(x, y, bias)
}

/// Parse one non-empty line into its label and feature nodes
pub fn parse_line(line: &str) -> std::result::Result<(i32, Vec<FeatureNode>), String> {
    let mut parts = line.split_whitespace();
    let label_token = parts.next().ok_or_else(|| "empty line".to_string())?;
    let label = parse_label(label_token)?;

    let mut nodes = Vec::new();
    let mut previous = 0;
    for token in parts {
        let (index, value) = token
            .split_once(':')
            .ok_or_else(|| format!("invalid feature format: {token}"))?;

        let index: usize = index
            .parse()
            .map_err(|_| format!("invalid feature index: {index}"))?;
        if index == 0 {
            return Err("feature index must be positive: 0".to_string());
        }
        if index <= previous {
            return Err(format!(
                "indices must be sorted in ascending order: {index} after {previous}"
            ));
        }

        let value: f64 = value
            .parse()
            .map_err(|_| format!("invalid feature value: {value}"))?;
        if !value.is_finite() {
            return Err(format!("feature value must be finite: {value}"));
        }

        nodes.push(FeatureNode::new(index, value));
        previous = index;
    }

    Ok((label, nodes))
}

/// Integer label; integral decimals such as `1.0` are accepted too
fn parse_label(token: &str) -> std::result::Result<i32, String> {
    if let Ok(label) = token.parse::<i32>() {
        return Ok(label);
    }
    match token.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 => Ok(v as i32),
        _ => Err(format!("invalid label: {token}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_line_basic() {
        let (label, nodes) = parse_line("+1 1:0.5 3:1.2").unwrap();
        assert_eq!(label, 1);
        assert_eq!(nodes, vec![FeatureNode::new(1, 0.5), FeatureNode::new(3, 1.2)]);
    }

    #[test]
    fn test_parse_line_label_only() {
        let (label, nodes) = parse_line("-3").unwrap();
        assert_eq!(label, -3);
        assert!(nodes.is_empty());
        assert_eq!(parse_line("2.0 1:1").unwrap().0, 2);
    }

    #[test]
    fn test_parse_line_invalid_input() {
        assert!(parse_line("+1 1").is_err());
        assert!(parse_line("+1 0:1.0").is_err());
        assert!(parse_line("+1 a:1.0").is_err());
        assert!(parse_line("+1 1:abc").is_err());
        assert!(parse_line("+1 1:inf").is_err());
        assert!(parse_line("1.5 1:1.0").is_err());
        assert!(parse_line("yes 1:1.0").is_err());
    }

    #[test]
    fn test_parse_line_rejects_unsorted_and_duplicate() {
        assert!(parse_line("1 2:0.1 1:0.2").unwrap_err().contains("ascending"));
        assert!(parse_line("1 2:0.1 2:0.2").is_err());
    }

    #[test]
    fn test_reader_with_bias() {
        let data = "+1 1:0.5 3:1.2\n\n# comment\n-1 2:0.3\n";
        let problem = read_problem_from_reader(Cursor::new(data), 1.0, "mem").unwrap();

        assert_eq!(problem.len(), 2);
        assert_eq!(problem.labels(), &[1, -1]);
        assert_eq!(problem.n_features(), 4);
        assert_eq!(problem.instance(1), &[FeatureNode::new(2, 0.3), FeatureNode::new(4, 1.0)]);
    }

    #[test]
    fn test_reader_reports_line() {
        let data = "+1 1:0.5\n-1 3:0.1 2:0.2\n";
        let err = read_problem_from_reader(Cursor::new(data), -1.0, "train.txt").unwrap_err();
        match err {
            LinearError::InvalidInputData { file, line, .. } => {
                assert_eq!(file, "train.txt");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reader_empty_input() {
        let result = read_problem_from_reader(Cursor::new("\n# nothing\n"), -1.0, "mem");
        assert!(matches!(result, Err(LinearError::EmptyDataset)));
    }

    #[test]
    fn test_reader_latin1_bytes() {
        let bytes: &[u8] = &[b'1', b' ', b'1', b':', 0xB5, b'\n'];
        let err = read_problem_from_reader(bytes, -1.0, "mem").unwrap_err();
        assert!(err.to_string().contains("mem:1"));
    }
}
