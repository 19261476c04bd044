//! rlinear Command Line Interface
//!
//! Train, cross-validate, apply and inspect linear classifiers on data in
//! the sparse `<label> <index>:<value> ...` text format.

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info, warn};
use rlinear::api::{Evaluation, LinearClassifier, TrainedModel};
use rlinear::core::{LinearError, Result, SolverType};
use rlinear::read_problem;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "rlinear")]
#[command(about = "Regularized sparse linear classifiers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "rlinear contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model, or report cross-validation accuracy with -v
    Train(TrainArgs),
    /// Predict a data file with a trained model
    Predict(PredictArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file
    #[arg(long)]
    data: PathBuf,

    /// Output model file (`.json` selects the JSON export); defaults to <data>.model
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Solver type, by id (0-6) or name
    #[arg(short, long, default_value = "1", value_parser = parse_solver)]
    solver: SolverType,

    /// Regularization parameter C
    #[arg(short = 'C', long, default_value = "1.0")]
    c: f64,

    /// Stopping tolerance (solver default if omitted)
    #[arg(short, long)]
    epsilon: Option<f64>,

    /// Bias feature value; negative disables it
    #[arg(short = 'B', long, default_value = "-1", allow_hyphen_values = true)]
    bias: f64,

    /// Per-class penalty multiplier as label:weight (repeatable)
    #[arg(short = 'w', long = "weight", value_parser = parse_weight, allow_hyphen_values = true)]
    weights: Vec<(i32, f64)>,

    /// Seed for solver shuffles and fold assignment
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Run n-fold cross-validation instead of saving a model
    #[arg(short = 'v', long)]
    folds: Option<usize>,
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Test data file
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output class probabilities (logistic regression models only)
    #[arg(short = 'b', long)]
    probability: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn parse_solver(s: &str) -> std::result::Result<SolverType, String> {
    s.parse::<SolverType>().map_err(|e| e.to_string())
}

fn parse_weight(s: &str) -> std::result::Result<(i32, f64), String> {
    let (label, weight) = s
        .split_once(':')
        .ok_or_else(|| format!("expected label:weight, got '{s}'"))?;
    let label = label
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid weight label '{label}': {e}"))?;
    let weight = weight
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid weight '{weight}': {e}"))?;
    Ok((label, weight))
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("json")
}

fn default_model_path(data: &Path) -> PathBuf {
    let name = data
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    PathBuf::from(format!("{name}.model"))
}

fn load_model(path: &Path) -> Result<TrainedModel> {
    if is_json(path) {
        TrainedModel::load_json(path)
    } else {
        TrainedModel::load(path)
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    info!("Training {} model...", args.solver);
    info!("Data file: {:?}", args.data);

    let mut classifier = LinearClassifier::new()
        .with_solver(args.solver)
        .with_c(args.c)
        .with_bias(args.bias)
        .with_seed(args.seed);
    if let Some(epsilon) = args.epsilon {
        classifier = classifier.with_epsilon(epsilon);
    }
    for &(label, weight) in &args.weights {
        classifier = classifier.with_class_weight(label, weight);
    }

    let param = classifier.parameter()?;
    info!(
        "Parameters: C={}, epsilon={}, bias={}",
        param.c(),
        param.eps(),
        args.bias
    );

    let problem = read_problem(&args.data, args.bias)?;
    info!(
        "Loaded {} instances with {} features",
        problem.len(),
        problem.n_features()
    );

    if let Some(folds) = args.folds {
        if args.output.is_some() {
            warn!("Cross-validation does not save a model; ignoring --output");
        }
        let evaluation = classifier.cross_validate(&problem, folds)?;
        println!(
            "Cross Validation Accuracy = {:.4}%",
            evaluation.accuracy() * 100.0
        );
        return Ok(());
    }

    let model = classifier.train(&problem)?;
    info!("Training completed successfully");

    let output = args
        .output
        .unwrap_or_else(|| default_model_path(&args.data));
    if is_json(&output) {
        model.save_json(&output)?;
    } else {
        model.save(&output)?;
    }
    info!("Model saved to: {output:?}");

    let evaluation = model.evaluate(&problem);
    info!("Training accuracy: {:.2}%", evaluation.accuracy() * 100.0);

    Ok(())
}

fn predict_command(args: PredictArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let model = load_model(&args.model)?;

    if args.probability && !model.inner().solver_type().supports_probability() {
        return Err(LinearError::ProbabilityNotSupported(
            model.inner().solver_type(),
        ));
    }

    info!("Loading test data from: {:?}", args.data);
    let problem = read_problem(&args.data, -1.0)?;

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    let predicted = write_predictions(&model, &problem, args.probability, writer)?;

    if let Some(path) = &args.output {
        info!("Predictions saved to: {path:?}");
    }

    let evaluation = Evaluation::from_predictions(problem.labels(), &predicted);
    println!(
        "Accuracy = {:.4}% ({}/{})",
        evaluation.accuracy() * 100.0,
        evaluation.correct,
        evaluation.total
    );

    Ok(())
}

fn write_predictions<W: Write>(
    model: &TrainedModel,
    problem: &rlinear::Problem,
    probability: bool,
    mut writer: W,
) -> Result<Vec<i32>> {
    let mut predicted = Vec::with_capacity(problem.len());

    if probability {
        write!(writer, "labels")?;
        for label in model.inner().labels() {
            write!(writer, " {label}")?;
        }
        writeln!(writer)?;
    }

    for x in problem.instances() {
        if probability {
            let (label, prob) = model.predict_probability(x)?;
            write!(writer, "{label}")?;
            for p in prob {
                write!(writer, " {p}")?;
            }
            writeln!(writer)?;
            predicted.push(label);
        } else {
            let label = model.predict(x);
            writeln!(writer, "{label}")?;
            predicted.push(label);
        }
    }

    writer.flush()?;
    Ok(predicted)
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let model = load_model(&args.model)?.into_inner();

    let nonzero = model
        .feature_weights()
        .iter()
        .filter(|&&w| w != 0.0)
        .count();

    println!("=== Model Information ===");
    println!("Solver type: {}", model.solver_type());
    println!("Classes: {}", model.nr_class());
    let labels: Vec<String> = model.labels().iter().map(i32::to_string).collect();
    println!("Labels: {}", labels.join(" "));
    println!("Features: {}", model.nr_feature());
    if model.bias() >= 0.0 {
        println!("Bias: {}", model.bias());
    } else {
        println!("Bias: disabled");
    }
    println!("Weight columns: {}", model.nr_w());
    println!(
        "Non-zero weights: {nonzero} of {}",
        model.feature_weights().len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weight() {
        assert_eq!(parse_weight("1:2.5"), Ok((1, 2.5)));
        assert_eq!(parse_weight("-1:0.5"), Ok((-1, 0.5)));
        assert!(parse_weight("1").is_err());
        assert!(parse_weight("a:1").is_err());
    }

    #[test]
    fn test_parse_solver() {
        assert_eq!(parse_solver("0"), Ok(SolverType::L2R_LR));
        assert_eq!(parse_solver("MCSVM_CS"), Ok(SolverType::MCSVM_CS));
        assert!(parse_solver("7").is_err());
    }

    #[test]
    fn test_default_model_path() {
        assert_eq!(
            default_model_path(Path::new("/tmp/heart_scale")),
            PathBuf::from("heart_scale.model")
        );
        assert!(is_json(Path::new("model.json")));
        assert!(!is_json(Path::new("model.txt")));
    }
}
