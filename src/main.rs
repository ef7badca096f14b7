use std::path::PathBuf;

use clap::Parser;

use classifier_tuner_rs::cli::{init_tracing, Cli, Command};
use classifier_tuner_rs::data::RunContext;
use classifier_tuner_rs::error::Result;
use classifier_tuner_rs::models::{parse_families, ModelFamily};
use classifier_tuner_rs::report::Deliverables;
use classifier_tuner_rs::train::train_and_save;

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or_default();
    let ctx = cli.data.context()?;

    println!(
        "Loaded {} training rows and {} test rows ({} features) from {:?}",
        ctx.split.train.n_samples(),
        ctx.split.test.n_samples(),
        ctx.split.train.n_features(),
        cli.data.data
    );

    match command {
        Command::Report {
            importance,
            evaluate,
            models_dir,
            rf_model,
            lgr_model,
            xgb_model,
        } => {
            let overrides = [rf_model, lgr_model, xgb_model];
            let paths: Vec<(ModelFamily, PathBuf)> = Deliverables::default_paths(&models_dir)
                .into_iter()
                .zip(overrides)
                .map(|((family, default), path)| (family, path.unwrap_or(default)))
                .collect();
            cmd_report(&ctx, &paths, &importance, &evaluate)
        }
        Command::Train {
            family,
            from_trial,
            output,
        } => cmd_train(&ctx, family, from_trial, output),
    }
}

/// Load every model, then print the requested reports.
fn cmd_report(
    ctx: &RunContext,
    paths: &[(ModelFamily, PathBuf)],
    importance: &str,
    evaluate: &str,
) -> Result<()> {
    let importance = parse_families(importance)?;
    let evaluate = parse_families(evaluate)?;

    let deliverables = Deliverables::load(paths, ctx)?;
    deliverables.run(ctx, &importance, &evaluate)
}

/// Train one family and save its artifact.
fn cmd_train(
    ctx: &RunContext,
    family: ModelFamily,
    from_trial: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let output = output.unwrap_or_else(|| PathBuf::from(family.model_file()));

    match &from_trial {
        Some(path) => println!("Training {} with parameters from {:?}...", family.display_name(), path),
        None => println!("Training {} with default parameters...", family.display_name()),
    }

    train_and_save(family, ctx, from_trial.as_deref(), &output)?;
    println!("Saved {} model to {:?}", family, output);
    Ok(())
}
