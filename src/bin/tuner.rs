use std::path::PathBuf;

use clap::Parser;

use classifier_tuner_rs::artifacts::save_trial;
use classifier_tuner_rs::cli::{init_tracing, DataArgs};
use classifier_tuner_rs::constants::{DEFAULT_CV_FOLDS, DEFAULT_SAMPLER_SEED, DEFAULT_TRIALS};
use classifier_tuner_rs::error::Result;
use classifier_tuner_rs::models::ModelFamily;
use classifier_tuner_rs::tuner::{
    contour_params, print_summary, print_topk, run_tuner, write_csv, Diagnostics, Domain,
    FailurePolicy, TunerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "tuner")]
#[command(about = "Random-search hyperparameter tuner for RF, LGR and XGB classifiers")]
struct Args {
    /// Model family to tune: RF, LGR or XGB
    #[arg(long, default_value = "RF")]
    family: ModelFamily,

    /// Number of trials
    #[arg(long, default_value_t = DEFAULT_TRIALS)]
    trials: usize,

    /// Cross-validation folds
    #[arg(long, default_value_t = DEFAULT_CV_FOLDS)]
    folds: usize,

    /// Sampler seed for reproducibility
    #[arg(long, default_value_t = DEFAULT_SAMPLER_SEED)]
    seed: u64,

    #[command(flatten)]
    data: DataArgs,

    /// Override the n_estimators range, e.g. 50,300
    #[arg(long)]
    n_estimators: Option<String>,

    /// Output CSV file for all trials
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Output path for the best trial (default: <family>_trial.json)
    #[arg(long)]
    trial_out: Option<PathBuf>,

    /// Directory to write diagnostic tables into
    #[arg(long)]
    diagnostics_dir: Option<PathBuf>,

    /// Record failing trials and continue instead of aborting
    #[arg(long)]
    skip_failed_trials: bool,

    /// Number of top trials to display
    #[arg(long, default_value = "10")]
    topk: usize,
}

fn parse_range(s: &str) -> Option<(i64, i64)> {
    let (low, high) = s.split_once(',')?;
    Some((low.trim().parse().ok()?, high.trim().parse().ok()?))
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let ctx = args.data.context()?;

    println!(
        "Loaded {} training rows and {} test rows from {:?}",
        ctx.split.train.n_samples(),
        ctx.split.test.n_samples(),
        args.data.data
    );

    let mut config = TunerConfig::new(args.family)?;
    config.n_trials = args.trials;
    config.cv_folds = args.folds;
    config.sampler_seed = args.seed;
    if args.skip_failed_trials {
        config.failure_policy = FailurePolicy::Skip;
    }
    if let Some(range) = &args.n_estimators {
        let Some((low, high)) = parse_range(range) else {
            eprintln!("Error: --n-estimators expects LOW,HIGH, got '{}'", range);
            std::process::exit(1);
        };
        config.space = config.space.with_domain("n_estimators", Domain::int(low, high))?;
    }

    let results = run_tuner(&config, &ctx)?;

    print_topk(results.study.trials(), args.topk);
    print_summary(&results);

    let trial_out = args
        .trial_out
        .clone()
        .unwrap_or_else(|| PathBuf::from(args.family.trial_file()));
    save_trial(&trial_out, args.family, &results.best, &ctx.split.train)?;
    println!("Wrote best trial to {:?}", trial_out);

    if let Some(csv) = &args.csv {
        write_csv(results.study.trials(), &config.space, csv)?;
        println!("Wrote all trials to {:?}", csv);
    }

    let diagnostics = Diagnostics::compute(
        &results.study,
        &config.space,
        &contour_params(args.family, &config.space),
    );
    diagnostics.print();
    if let Some(dir) = &args.diagnostics_dir {
        diagnostics.write_csv_dir(dir)?;
        println!("Wrote diagnostics to {:?}", dir);
    }

    Ok(())
}
