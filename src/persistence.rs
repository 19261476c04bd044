//! Model serialization and persistence
//!
//! The text format is line oriented:
//!
//! ```text
//! solver_type L2R_LR
//! nr_class 2
//! label 1 -1
//! nr_feature 3
//! bias -1
//! w
//! 0.5 
//! -1.25 
//! 0 
//! ```
//!
//! followed by `w_size` rows of `nr_w` values, each value followed by a
//! space. Numbers are written like C's `%.16g`, except that zero weights are
//! written as a bare `0`. Files are read as ISO-8859-1. A JSON export of the
//! same model is available through `serde_json`.

use crate::core::{LinearError, Result, SolverType};
use crate::model::{weight_count, Model};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Significant digits of every written floating-point number
const PRECISION: usize = 16;

/// Format `v` like C's `printf("%.16g", v)`
///
/// Trailing zeros of the fraction are stripped (`0.5`, not
/// `0.5000000000000000` as a fixed-width formatter would print). Both forms
/// parse to the same value, so files from either writer load identically.
pub fn format_g16(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // the exponent after rounding to PRECISION digits decides the style
    let sci = format!("{:.*e}", PRECISION - 1, v);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exp: i32 = exponent.parse().unwrap_or(0);

    if exp < -4 || exp >= PRECISION as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (PRECISION as i32 - 1 - exp) as usize;
        trim_fraction(&format!("{:.*}", decimals, v)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Write `model` in the text format
pub fn save_model<W: Write>(model: &Model, mut writer: W) -> Result<()> {
    writeln!(writer, "solver_type {}", model.solver_type().name())?;
    writeln!(writer, "nr_class {}", model.nr_class())?;

    write!(writer, "label")?;
    for label in model.labels() {
        write!(writer, " {label}")?;
    }
    writeln!(writer)?;

    writeln!(writer, "nr_feature {}", model.nr_feature())?;
    writeln!(writer, "bias {}", format_g16(model.bias()))?;

    writeln!(writer, "w")?;
    let nr_w = model.nr_w();
    for row in model.feature_weights().chunks(nr_w) {
        for &value in row {
            if value == 0.0 {
                write!(writer, "0 ")?;
            } else {
                write!(writer, "{} ", format_g16(value))?;
            }
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write `model` to `path` in the text format
pub fn save_model_file<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let file = File::create(path)?;
    save_model(model, BufWriter::new(file))
}

/// Header fields collected before the `w` marker
#[derive(Default)]
struct Header {
    solver_type: Option<SolverType>,
    nr_class: Option<usize>,
    label: Option<Vec<i32>>,
    nr_feature: Option<usize>,
    bias: Option<f64>,
}

fn missing(field: &str) -> LinearError {
    LinearError::ModelFormat(format!("missing header field: {field}"))
}

fn parse_single<T: std::str::FromStr>(
    parts: &mut std::str::SplitWhitespace<'_>,
    line_num: usize,
    field: &str,
) -> Result<T> {
    let token = parts.next().ok_or_else(|| {
        LinearError::ModelFormat(format!("line {line_num}: missing {field} value"))
    })?;
    token.parse().map_err(|_| {
        LinearError::ModelFormat(format!("line {line_num}: invalid {field} value: {token}"))
    })
}

fn parse_weight(token: &str) -> Result<f64> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(LinearError::ModelFormat(format!("invalid weight value: {token}"))),
    }
}

/// Read a model in the text format
pub fn load_model<R: Read>(mut reader: R) -> Result<Model> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    // ISO-8859-1: every byte is the code point of the same value
    let text: String = bytes.iter().map(|&b| char::from(b)).collect();

    let mut header = Header::default();
    let mut rest = None;
    let mut offset = 0;
    for (line_idx, line) in text.split_inclusive('\n').enumerate() {
        offset += line.len();
        let line_num = line_idx + 1;

        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            continue;
        };
        match cmd {
            "solver_type" => {
                let name: String = parse_single(&mut parts, line_num, "solver_type")?;
                let solver_type = SolverType::ALL
                    .iter()
                    .copied()
                    .find(|s| s.name() == name)
                    .ok_or(LinearError::UnknownSolverType(name))?;
                header.solver_type = Some(solver_type);
            }
            "nr_class" => header.nr_class = Some(parse_single(&mut parts, line_num, "nr_class")?),
            "nr_feature" => {
                header.nr_feature = Some(parse_single(&mut parts, line_num, "nr_feature")?)
            }
            "bias" => {
                let bias: f64 = parse_single(&mut parts, line_num, "bias")?;
                if bias.is_nan() {
                    return Err(LinearError::ModelFormat(format!(
                        "line {line_num}: invalid bias value"
                    )));
                }
                header.bias = Some(bias);
            }
            "label" => {
                let labels = parts
                    .map(|token| {
                        token.parse::<i32>().map_err(|_| {
                            LinearError::ModelFormat(format!(
                                "line {line_num}: invalid label value: {token}"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                header.label = Some(labels);
            }
            "w" => {
                rest = Some(&text[offset..]);
                break;
            }
            _ => {
                return Err(LinearError::ModelFormat(format!(
                    "line {line_num}: unknown text in model file: [{}]",
                    line.trim_end()
                )))
            }
        }
    }

    let rest = rest.ok_or_else(|| missing("w"))?;
    let solver_type = header.solver_type.ok_or_else(|| missing("solver_type"))?;
    let nr_class = header.nr_class.ok_or_else(|| missing("nr_class"))?;
    let label = header.label.ok_or_else(|| missing("label"))?;
    let nr_feature = header.nr_feature.ok_or_else(|| missing("nr_feature"))?;
    let bias = header.bias.ok_or_else(|| missing("bias"))?;

    if label.len() != nr_class {
        return Err(LinearError::ModelFormat(format!(
            "nr_class is {} but {} labels are listed",
            nr_class,
            label.len()
        )));
    }

    let expected = weight_count(nr_feature, bias, nr_class, solver_type).ok_or_else(|| {
        LinearError::ModelFormat(format!(
            "weight matrix size overflows: nr_feature {nr_feature}, nr_class {nr_class}"
        ))
    })?;
    // grows with the tokens actually present, never with the header alone
    let mut tokens = rest.split_whitespace();
    let mut w = Vec::new();
    for _ in 0..expected {
        let token = tokens
            .next()
            .ok_or_else(|| LinearError::ModelFormat("unexpected EOF in weight matrix".to_string()))?;
        w.push(parse_weight(token)?);
    }

    let model = Model::from_parts(solver_type, label, nr_feature, bias, w);
    model.check_shape()?;
    Ok(model)
}

/// Read a model in the text format from `path`
pub fn load_model_file<P: AsRef<Path>>(path: P) -> Result<Model> {
    let file = File::open(path)?;
    load_model(BufReader::new(file))
}

/// Export `model` as pretty-printed JSON
pub fn save_model_json<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, model)
        .map_err(|e| LinearError::SerializationError(e.to_string()))?;
    writer.flush()?;
    Ok(())
}

/// Import a model written by [`save_model_json`]
pub fn load_model_json<P: AsRef<Path>>(path: P) -> Result<Model> {
    let file = File::open(path)?;
    let model: Model = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| LinearError::SerializationError(e.to_string()))?;
    model.check_shape()?;
    Ok(model)
}
