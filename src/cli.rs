use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::display::{print_error, print_section, profile_table, series_table, styled_value, tree_table};
use crate::error::{ChoiceError, ChoiceResult};
use crate::risk_profile::risk_profile;
use crate::sensitivity::{
    probabilistic_sensitivity, risk_sensitivity, value_sensitivity, ValueSweep, ValueTarget,
};
use crate::tree::DecisionTree;
use crate::tree_file::load_tree_file;
use crate::utility::{UtilityFn, View};

#[derive(Parser)]
#[command(
    name = "choice",
    version = "1.0.0",
    about = "Decision tree analysis: rollback, sensitivity sweeps and risk profiles."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    Ev,
    Eu,
    Ce,
}

impl From<ViewArg> for View {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::Ev => View::Ev,
            ViewArg::Eu => View::Eu,
            ViewArg::Ce => View::Ce,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum UtilityArg {
    Exp,
    Log,
}

impl From<UtilityArg> for UtilityFn {
    fn from(arg: UtilityArg) -> Self {
        match arg {
            UtilityArg::Exp => UtilityFn::Exponential,
            UtilityArg::Log => UtilityFn::Logarithmic,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Roll back a tree and print every node
    Rollback {
        /// Tree definition (JSON)
        tree: PathBuf,
        /// Quantity reported for the root
        #[arg(long, default_value = "ev")]
        view: ViewArg,
        /// Utility function applied to terminal values
        #[arg(short, long)]
        utility: Option<UtilityArg>,
        /// Risk tolerance of the decision maker
        #[arg(short = 'r', long)]
        risk_tolerance: Option<f64>,
    },
    /// Sweep the probability of a chance variable between its extreme branches
    ProbSensitivity {
        tree: PathBuf,
        /// Chance variable to sweep
        #[arg(long)]
        var: String,
        /// Node at which results are read
        #[arg(long, default_value_t = 0)]
        idx: usize,
    },
    /// Sweep the value of one branch of a variable
    ValueSensitivity {
        tree: PathBuf,
        #[arg(long)]
        var: String,
        #[arg(long)]
        branch: String,
        #[arg(long, allow_hyphen_values = true)]
        min: f64,
        #[arg(long, allow_hyphen_values = true)]
        max: f64,
        /// Number of grid points
        #[arg(long, default_value_t = 11)]
        points: usize,
        /// Report the node value instead of one series per branch
        #[arg(long)]
        single: bool,
        #[arg(long, default_value_t = 0)]
        idx: usize,
    },
    /// Certainty equivalents from risk neutral down to the given risk tolerance
    RiskSensitivity {
        tree: PathBuf,
        #[arg(short, long)]
        utility: UtilityArg,
        #[arg(short = 'r', long)]
        risk_tolerance: f64,
        #[arg(long, default_value_t = 0)]
        idx: usize,
    },
    /// Distribution of outcomes under the optimal strategy
    RiskProfile {
        tree: PathBuf,
        #[arg(long, default_value_t = 0)]
        idx: usize,
        /// Profile every branch of the node instead of the node itself
        #[arg(long)]
        multiple: bool,
        /// Include cumulative probabilities
        #[arg(long)]
        cumulative: bool,
    },
}

pub fn run() {
    let cli = Cli::parse();
    dispatch(cli);
}

/// Parses `args` (program name first) and runs the command, returning its
/// error instead of exiting.
pub fn try_run_with_args(args: Vec<String>) -> ChoiceResult<()> {
    let cli = Cli::try_parse_from(args).map_err(|e| ChoiceError::Configuration(e.to_string()))?;
    execute(cli)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A second init (e.g. repeated try_run_with_args in one process) is a no-op.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn dispatch(cli: Cli) {
    if let Err(e) = execute(cli) {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> ChoiceResult<()> {
    init_logging(cli.verbose);

    match cli.command {
        Commands::Rollback {
            tree,
            view,
            utility,
            risk_tolerance,
        } => cmd_rollback(&tree, view, utility, risk_tolerance),
        Commands::ProbSensitivity { tree, var, idx } => cmd_prob_sensitivity(&tree, &var, idx),
        Commands::ValueSensitivity {
            tree,
            var,
            branch,
            min,
            max,
            points,
            single,
            idx,
        } => cmd_value_sensitivity(
            &tree,
            ValueTarget::new(var, branch),
            ValueSweep::new(min, max).with_points(points),
            single,
            idx,
        ),
        Commands::RiskSensitivity {
            tree,
            utility,
            risk_tolerance,
            idx,
        } => cmd_risk_sensitivity(&tree, utility, risk_tolerance, idx),
        Commands::RiskProfile {
            tree,
            idx,
            multiple,
            cumulative,
        } => cmd_risk_profile(&tree, idx, multiple, cumulative),
    }
}

/// Loads, evaluates and rolls back (EV) a tree file.
fn load_rolled_back(path: &Path) -> ChoiceResult<DecisionTree> {
    let bag = load_tree_file(path)?;
    let mut tree = DecisionTree::new(&bag)?;
    tree.evaluate()?;
    tree.rollback_ev()?;
    debug!(path = %path.display(), nodes = tree.len(), "tree ready");
    Ok(tree)
}

fn cmd_rollback(
    path: &Path,
    view: ViewArg,
    utility: Option<UtilityArg>,
    risk_tolerance: Option<f64>,
) -> ChoiceResult<()> {
    let mut tree = load_rolled_back(path)?;
    let view = View::from(view);
    let utility = utility.map(UtilityFn::from);
    let result = tree.rollback(view, utility, risk_tolerance.unwrap_or(0.0))?;

    println!("{}", tree_table(&tree));
    let label = match utility {
        Some(u) => format!("Root {} ({} utility):", view.label(), u),
        None => format!("Root {}:", view.label()),
    };
    println!("\n{}", styled_value(&label, result));
    Ok(())
}

fn cmd_prob_sensitivity(path: &Path, var: &str, idx: usize) -> ChoiceResult<()> {
    let tree = load_rolled_back(path)?;
    let sens = probabilistic_sensitivity(&tree, var, idx)?;
    let title = format!(
        "Probabilistic sensitivity of {} ({} -> {})",
        sens.varname, sens.top_branch, sens.bottom_branch
    );
    print_section(&title, &series_table("Probability", &sens.result));
    Ok(())
}

fn cmd_value_sensitivity(
    path: &Path,
    target: ValueTarget,
    sweep: ValueSweep,
    single: bool,
    idx: usize,
) -> ChoiceResult<()> {
    let tree = load_rolled_back(path)?;
    let sens = value_sensitivity(&tree, &target, &sweep, single, idx)?;
    let title = format!(
        "Value sensitivity of {} (base value {:.2})",
        sens.target.key(),
        sens.base_value
    );
    print_section(&title, &series_table("Branch value", &sens.result));
    Ok(())
}

fn cmd_risk_sensitivity(path: &Path, utility: UtilityArg, risk_tolerance: f64, idx: usize) -> ChoiceResult<()> {
    let tree = load_rolled_back(path)?;
    let sens = risk_sensitivity(&tree, utility.into(), risk_tolerance, idx)?;
    let tolerances = sens
        .risk_tolerances
        .iter()
        .map(|t| match t {
            Some(t) => format!("{:.0}", t),
            None => "Infinity".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let title = format!("Risk attitude sensitivity ({} utility)", sens.utility);
    print_section(&title, &series_table("Risk aversion", &sens.result));
    println!("{} {}", "Risk tolerances:".bold(), tolerances);
    Ok(())
}

fn cmd_risk_profile(path: &Path, idx: usize, multiple: bool, cumulative: bool) -> ChoiceResult<()> {
    let tree = load_rolled_back(path)?;
    let profiles = risk_profile(&tree, idx, !multiple)?;
    println!("\n{}", format!("Risk profile at node {}", idx).cyan().bold());
    for profile in &profiles {
        println!("{}", profile_table(profile, cumulative));
    }
    Ok(())
}
