use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use log::{debug, info};

use geobow::classifier::{ClassifierKind, ClassifierOptions, LogisticRegressionOptions};
use geobow::get_version;
use geobow::pipeline::{Pipeline, PipelineConfig, DEFAULT_NUM_FEATURES};
use geobow::report::save_predictions;

#[derive(Debug, Args)]
struct InputArgs {
    /// Vocabulary file with one `term<TAB>id` pair per line
    #[arg(short, long)]
    vocab: PathBuf,

    /// Training count file
    #[arg(short, long)]
    train: PathBuf,

    /// Number of terms kept by chi-squared feature selection
    #[arg(short = 'k', long, default_value_t = DEFAULT_NUM_FEATURES)]
    num_features: usize,

    #[arg(short = 'n', long, default_value = "0")]
    num_threads: usize,
}

#[derive(Debug, Args)]
struct TrainingArgs {
    /// Additive smoothing for Naive Bayes
    #[arg(long, default_value = "1.0")]
    alpha: f64,

    #[arg(short = 'i', long, default_value = "200")]
    num_iterations: usize,

    #[arg(long, default_value = "0.5")]
    learning_rate: f64,

    #[arg(long, default_value = "0.0001")]
    l2: f64,
}

#[derive(Debug, Args)]
#[clap(
    author,
    about = "Select features and save them as JSON",
    version = get_version(),
)]
struct SelectArgs {
    #[command(flatten)]
    input: InputArgs,

    features_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Compare classifiers on the dev set",
    version = get_version(),
)]
struct EvaluateArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    training: TrainingArgs,

    /// Dev count file
    #[arg(short, long)]
    dev: PathBuf,

    /// Only evaluate these classifiers (default: all)
    #[arg(short, long)]
    classifier: Vec<String>,

    /// Write the evaluation report as JSON
    #[arg(short, long)]
    report_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Predict the regions of the test set",
    version = get_version(),
)]
struct PredictArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    training: TrainingArgs,

    /// Test count file
    #[arg(short = 'x', long)]
    test: PathBuf,

    #[arg(short, long, default_value = "logistic-regression")]
    classifier: String,

    predictions_file: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Select(SelectArgs),
    Evaluate(EvaluateArgs),
    Predict(PredictArgs),
}

#[derive(Debug, Parser)]
#[clap(
    name = "geobow",
    author,
    about = "Predict census regions from bag-of-words counts",
    version = get_version(),
)]
struct CommandArgs {
    #[clap(subcommand)]
    command: Commands,
}

fn config(input: &InputArgs, training: Option<&TrainingArgs>) -> PipelineConfig {
    let mut config = PipelineConfig::new(input.vocab.clone(), input.train.clone());
    config.num_features = input.num_features;
    if let Some(training) = training {
        config.classifier_options = ClassifierOptions {
            alpha: training.alpha,
            logistic: LogisticRegressionOptions {
                num_iterations: training.num_iterations,
                learning_rate: training.learning_rate,
                l2_regularization: training.l2,
                ..Default::default()
            },
        };
    }
    config
}

fn init_thread_pool(num_threads: usize) -> Result<(), Box<dyn Error>> {
    if num_threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()?;
    }
    Ok(())
}

fn running_flag() -> Result<Arc<AtomicBool>, Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        if r.load(Ordering::SeqCst) {
            r.store(false, Ordering::SeqCst);
        } else {
            std::process::exit(0);
        }
    })?;

    Ok(running)
}

fn select(args: SelectArgs) -> Result<(), Box<dyn Error>> {
    init_thread_pool(args.input.num_threads)?;
    let pipeline = Pipeline::new(config(&args.input, None));
    let prepared = pipeline.prepare()?;

    prepared.selected.save(args.features_file.as_path())?;
    info!("top terms: {}", prepared.top_terms(20).join(", "));
    for (term, score) in prepared.scored_terms() {
        match score {
            Some(score) => debug!("{}\t{:.4}", term, score),
            None => debug!("{}\t-", term),
        }
    }

    println!("Feature selection completed successfully.");
    Ok(())
}

fn evaluate(args: EvaluateArgs) -> Result<(), Box<dyn Error>> {
    init_thread_pool(args.input.num_threads)?;
    let running = running_flag()?;

    let kinds = if args.classifier.is_empty() {
        ClassifierKind::ALL.to_vec()
    } else {
        args.classifier
            .iter()
            .map(|name| name.parse::<ClassifierKind>())
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut config = config(&args.input, Some(&args.training));
    config.dev_path = Some(args.dev);
    let pipeline = Pipeline::new(config);
    let prepared = pipeline.prepare()?;
    let report = pipeline.evaluate(&prepared, &kinds, running)?;

    for evaluation in &report.classifiers {
        println!(
            "{}\taccuracy: {:.4}\tmacro F1: {:.4}",
            evaluation.classifier, evaluation.report.accuracy, evaluation.report.macro_f1
        );
    }
    if let Some(best) = report.best() {
        println!("Best classifier: {}", best.classifier);
    }
    if let Some(report_file) = &args.report_file {
        report.save(report_file.as_path())?;
    }

    Ok(())
}

fn predict(args: PredictArgs) -> Result<(), Box<dyn Error>> {
    init_thread_pool(args.input.num_threads)?;
    let running = running_flag()?;
    let kind = args.classifier.parse::<ClassifierKind>()?;

    let mut config = config(&args.input, Some(&args.training));
    config.test_path = Some(args.test);
    let pipeline = Pipeline::new(config);
    let prepared = pipeline.prepare()?;
    let predictions = pipeline.predict(&prepared, kind, running)?;

    save_predictions(args.predictions_file.as_path(), &predictions)?;

    println!("Prediction completed successfully.");
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = CommandArgs::parse();

    match args.command {
        Commands::Select(args) => select(args),
        Commands::Evaluate(args) => evaluate(args),
        Commands::Predict(args) => predict(args),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
