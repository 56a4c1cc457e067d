use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

use fnirs_workload_ci::input::chunks::{ChunkLoader, subject_csv_path};
use fnirs_workload_ci::input::lookup::LookupTable;
use fnirs_workload_ci::input::predictions::LookupStore;
use fnirs_workload_ci::input::splits::PartitionTable;
use fnirs_workload_ci::input::{InputError, SubjectId, parse_subject_list};
use fnirs_workload_ci::model::features::{FeatureError, featurize};
use fnirs_workload_ci::model::task::ClassificationTask;
use fnirs_workload_ci::pipeline::stage1_select::run_stage1;
use fnirs_workload_ci::pipeline::stage2_bootstrap::{
    BootstrapError, BootstrapParams, DEFAULT_BOOTSTRAP_SAMPLES, DEFAULT_LOWER_PERCENTILE,
    DEFAULT_SEED, DEFAULT_UPPER_PERCENTILE, load_subjects, run_stage2,
};
use fnirs_workload_ci::pipeline::stage3_report::{ReportError, Stage3Input, write_reports};
use fnirs_workload_ci::report::features::write_feature_tsv;

const LOOKUP_FILE: &str = "lookup.tsv";
const DEFAULT_WINDOW_SIZE: usize = 10;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error("{0}")]
    Usage(String),
}

#[derive(Parser, Debug)]
#[command(
    name = "fnirs-workload-ci",
    version,
    about = "Nested-bootstrap confidence intervals and windowed features for fNIRS workload classification"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List partition scenarios or print one of them
    Splits(SplitsArgs),
    /// Extract per-chunk window features from one subject recording
    Featurize(FeaturizeArgs),
    /// Pick the best hyperparameter setting per subject and write a lookup table
    Select(SelectArgs),
    /// Estimate a percentile confidence interval on mean subject accuracy
    Bootstrap(BootstrapArgs),
}

#[derive(Args, Debug)]
struct SplitsArgs {
    /// Partition table JSON (defaults to the built-in table)
    #[arg(long)]
    splits: Option<PathBuf>,

    #[arg(long)]
    setting: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Portion {
    All,
    /// First half of the chunks (adaptation portion)
    Train,
    /// Second half of the chunks (held-out portion)
    Test,
}

#[derive(Args, Debug)]
struct FeaturizeArgs {
    /// Subject recording CSV (or use --data-dir with --subject)
    #[arg(long, conflicts_with_all = ["data_dir", "subject"])]
    input: Option<PathBuf>,

    #[arg(long, requires = "subject")]
    data_dir: Option<PathBuf>,

    #[arg(long, requires = "data_dir")]
    subject: Option<String>,

    #[arg(long, value_enum, default_value_t = ClassificationTask::Binary)]
    task: ClassificationTask,

    /// Time steps per chunk
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    window_size: usize,

    #[arg(long, value_enum, default_value_t = Portion::All)]
    portion: Portion,

    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct CandidateArgs {
    /// Comma-separated subject ids
    #[arg(long, conflicts_with_all = ["settings", "test_group"])]
    subjects: Option<String>,

    /// Partition settings whose test subjects form the candidate population
    #[arg(long, value_delimiter = ',')]
    settings: Vec<String>,

    /// Named test group of a single setting
    #[arg(long, requires = "settings")]
    test_group: Option<String>,

    /// Partition table JSON (defaults to the built-in table)
    #[arg(long)]
    splits: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SelectArgs {
    /// Results tree laid out as <root>/<subject>/<experiment>/predictions/
    #[arg(long)]
    results_root: PathBuf,

    #[command(flatten)]
    candidates: CandidateArgs,

    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct BootstrapArgs {
    /// Lookup table (subject_id, experiment_folder)
    #[arg(long, required_unless_present = "results_root", conflicts_with = "results_root")]
    lookup: Option<PathBuf>,

    /// Results tree to select experiments from instead of a lookup table
    #[arg(long)]
    results_root: Option<PathBuf>,

    #[command(flatten)]
    candidates: CandidateArgs,

    #[arg(long, default_value_t = DEFAULT_BOOTSTRAP_SAMPLES)]
    samples: usize,

    #[arg(long, default_value_t = DEFAULT_UPPER_PERCENTILE)]
    upper: f64,

    #[arg(long, default_value_t = DEFAULT_LOWER_PERCENTILE)]
    lower: f64,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = ClassificationTask::Binary)]
    task: ClassificationTask,

    /// Also write every bootstrap sample accuracy
    #[arg(long)]
    keep_samples: bool,

    #[arg(long)]
    out: PathBuf,
}

fn main() {
    fnirs_workload_ci::logging::init_logging();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    match cli.cmd {
        Command::Splits(args) => run_splits(&args),
        Command::Featurize(args) => run_featurize(&args),
        Command::Select(args) => run_select(&args),
        Command::Bootstrap(args) => run_bootstrap(&args),
    }
}

fn run_splits(args: &SplitsArgs) -> Result<(), AppError> {
    let table = load_partition_table(args.splits.as_deref())?;
    match &args.setting {
        Some(setting) => {
            let p = table.get(setting)?;
            println!("setting: {setting}");
            println!("train ({}): {}", p.train.len(), join_ids(&p.train));
            println!("val ({}): {}", p.val.len(), join_ids(&p.val));
            println!("test ({}): {}", p.test.len(), join_ids(&p.test));
            for (group, members) in &p.test_groups {
                println!("test group {group} ({}): {}", members.len(), join_ids(members));
            }
        }
        None => {
            for (name, p) in &table.scenarios {
                println!(
                    "{name}\ttrain={}\tval={}\ttest={}",
                    p.train.len(),
                    p.val.len(),
                    p.test.len()
                );
            }
        }
    }
    Ok(())
}

fn run_featurize(args: &FeaturizeArgs) -> Result<(), AppError> {
    let path = match (&args.input, &args.data_dir, &args.subject) {
        (Some(input), _, _) => input.clone(),
        (None, Some(dir), Some(subject)) => {
            let subject: SubjectId = subject.parse()?;
            subject_csv_path(dir, &subject)
        }
        _ => {
            return Err(AppError::Usage(
                "featurize needs --input or --data-dir with --subject".to_string(),
            ));
        }
    };

    let loader = ChunkLoader::for_task(args.task, args.window_size);
    let chunks = loader.load(&path)?;
    let chunks = match args.portion {
        Portion::All => chunks,
        Portion::Train => chunks.split_halves().0,
        Portion::Test => chunks.split_halves().1,
    };
    let matrix = featurize(&chunks)?;
    write_feature_tsv(&matrix, &args.out)?;
    tracing::info!(
        input = %path.display(),
        task = loader.task().name(),
        chunks = matrix.rows.len(),
        features = matrix.columns.len(),
        out = %args.out.display(),
        "features written"
    );
    Ok(())
}

fn run_select(args: &SelectArgs) -> Result<(), AppError> {
    let candidates = resolve_candidates(&args.candidates, None)?;
    let stage1 = run_stage1(&args.results_root, &candidates)?;
    stage1.lookup.write_tsv(&args.out)?;
    tracing::info!(
        subjects = stage1.selections.len(),
        out = %args.out.display(),
        "lookup table written"
    );
    Ok(())
}

fn run_bootstrap(args: &BootstrapArgs) -> Result<(), AppError> {
    let start = Instant::now();
    let params = BootstrapParams {
        num_samples: args.samples,
        upper_percentile: args.upper,
        lower_percentile: args.lower,
    };
    params.validate()?;

    let (candidates, store) = match (&args.lookup, &args.results_root) {
        (Some(path), _) => {
            let table = LookupTable::read_tsv(path)?;
            let candidates = resolve_candidates(&args.candidates, Some(&table))?;
            (candidates, LookupStore::new(table))
        }
        (None, Some(root)) => {
            let candidates = resolve_candidates(&args.candidates, None)?;
            let stage1 = run_stage1(root, &candidates)?;
            stage1.lookup.write_tsv(&args.out.join(LOOKUP_FILE))?;
            (candidates, LookupStore::new(stage1.lookup))
        }
        (None, None) => {
            return Err(AppError::Usage(
                "bootstrap needs --lookup or --results-root".to_string(),
            ));
        }
    };

    let unique: BTreeSet<&SubjectId> = candidates.iter().collect();
    tracing::info!(
        candidates = candidates.len(),
        unique = unique.len(),
        samples = params.num_samples,
        seed = args.seed,
        "starting nested bootstrap"
    );

    let subjects = load_subjects(&candidates, &store)?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let stage2 = run_stage2(&subjects, &params, &mut rng)?;

    let summary = write_reports(
        &Stage3Input {
            subjects: &subjects,
            bootstrap: &stage2,
            params: &params,
            task: args.task,
            seed: args.seed,
            elapsed_secs: start.elapsed().as_secs_f64(),
            keep_samples: args.keep_samples,
        },
        &args.out,
    )?;

    println!(
        "upper={:.4} lower={:.4} observed_mean={:.4}",
        summary.interval.upper, summary.interval.lower, summary.observed_mean_accuracy
    );
    Ok(())
}

fn resolve_candidates(
    args: &CandidateArgs,
    lookup: Option<&LookupTable>,
) -> Result<Vec<SubjectId>, AppError> {
    if let Some(raw) = &args.subjects {
        return Ok(parse_subject_list(raw)?);
    }
    if !args.settings.is_empty() {
        let table = load_partition_table(args.splits.as_deref())?;
        return match &args.test_group {
            Some(group) => {
                let [setting] = args.settings.as_slice() else {
                    return Err(AppError::Usage(
                        "--test-group needs exactly one --settings entry".to_string(),
                    ));
                };
                Ok(table.test_group(setting, group)?)
            }
            None => Ok(table.test_subjects(&args.settings)?),
        };
    }
    match lookup {
        Some(table) if !table.is_empty() => Ok(table.subjects()),
        _ => Err(AppError::Usage(
            "no candidate subjects: pass --subjects or --settings".to_string(),
        )),
    }
}

fn load_partition_table(path: Option<&Path>) -> Result<PartitionTable, InputError> {
    match path {
        Some(p) => PartitionTable::load(p),
        None => PartitionTable::builtin(),
    }
}

fn join_ids(ids: &[SubjectId]) -> String {
    ids.iter()
        .map(SubjectId::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
