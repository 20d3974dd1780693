use clap::{Parser, Subcommand};
use log::{error, info, warn};
use parallel_jacobi::error::{JacobiError, Result};
use parallel_jacobi::gaussian::gaussian_elimination;
use parallel_jacobi::io::{generate_random_symmetric, read_matrix_from_stdin};
use parallel_jacobi::monitor::ConvergenceMonitor;
use parallel_jacobi::pairing::MusicPairing;
use parallel_jacobi::sweep::{SweepEngine, SweepStatus};
use parallel_jacobi::timer::TimerNode;
use std::fs;
use std::path::Path;

const BASELINE_SEED: u64 = 0;

/// Parallel block Jacobi eigensolver for dense real symmetric matrices
#[derive(Parser)]
#[command(name = "parallel_jacobi")]
#[command(about = "Parallel block Jacobi eigensolver for dense real symmetric matrices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Generate an N x N symmetric matrix instead of reading one from stdin
    #[arg(long, value_name = "N")]
    random: Option<usize>,

    /// Verify each eigenvalue by Gaussian-eliminating A - lambda*I
    #[arg(long)]
    check: bool,

    /// Suppress eigenvalue printing
    #[arg(long)]
    quiet: bool,

    /// Worker thread count (defaults to rayon's physical-core default)
    #[arg(long)]
    threads: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Absolute-threshold monitor: stop when off(A) <= T
    Threshold {
        #[arg(value_name = "T")]
        t: f64,
    },
    /// Max-iterations monitor: stop after I sweeps
    Iterations {
        #[arg(value_name = "I")]
        i: usize,
    },
    /// Relative-difference monitor: stop when |off_prev - off_cur| <= D
    Difference {
        #[arg(value_name = "D")]
        d: f64,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { log::LevelFilter::Info } else { log::LevelFilter::Warn };
    env_logger::Builder::from_default_env().filter_level(level).init();

    if let Err(e) = run(cli) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let monitor = match cli.mode {
        Mode::Threshold { t } => ConvergenceMonitor::threshold(t),
        Mode::Iterations { i } => ConvergenceMonitor::max_iterations(i),
        Mode::Difference { d } => ConvergenceMonitor::relative_difference(d),
    };

    let mut matrix = match cli.random {
        Some(n) => {
            info!("generating a {n}x{n} random symmetric matrix (seed {BASELINE_SEED})");
            generate_random_symmetric(n, BASELINE_SEED)
        }
        None => {
            info!("reading matrix from stdin");
            read_matrix_from_stdin()?
        }
    };

    let pool = match cli.threads {
        Some(t) => Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(t)
                .build()
                .map_err(|e| JacobiError::UsageError(format!("failed to build thread pool: {e}")))?,
        ),
        None => None,
    };
    let worker_count = pool.as_ref().map(|p| p.current_num_threads()).unwrap_or_else(rayon::current_num_threads);

    let header = if worker_count <= 1 { "serial" } else { "parallel" };
    println!("mode: {header}, workers: {worker_count}");

    let pairing = MusicPairing::new(matrix.actual_size());
    let mut timer = TimerNode::new("run");

    let report = match &pool {
        Some(pool) => pool.install(|| SweepEngine::run(&mut matrix, &monitor, &pairing, &mut timer)),
        None => SweepEngine::run(&mut matrix, &monitor, &pairing, &mut timer),
    };

    match report.status {
        SweepStatus::Converged => info!("converged after {} sweeps", report.sweeps),
        SweepStatus::SafetyCapReached => warn!(
            "safety cap reached after {} sweeps (off(A) = {:.3e})",
            report.sweeps, report.off_final
        ),
        SweepStatus::NonFinite => warn!("off-diagonal norm became non-finite; reporting best effort"),
    }

    println!("{}", timer.report());

    let threads_dir = Path::new("timings");
    persist_timing(threads_dir, worker_count, &timer)?;

    let mut eigenvalues = matrix.diagonal();
    eigenvalues.sort_by(|a, b| a.partial_cmp(b).unwrap());

    if !cli.quiet {
        let joined = eigenvalues
            .iter()
            .map(|v| format!("{v:.6}"))
            .collect::<Vec<_>>()
            .join("; ");
        println!("Eigenvalues are: {joined};");
    }

    if cli.check {
        for &lambda in &eigenvalues {
            let mut shifted = matrix.clone();
            for i in 0..shifted.actual_size() {
                let diag = shifted.get(i, i);
                shifted.set(i, i, diag - lambda);
            }
            let invertible = gaussian_elimination(&mut shifted);
            let verdict = if invertible { "invertible" } else { "singular" };
            println!("A - {lambda:.6}I is {verdict}");
        }
    }

    Ok(())
}

/// Persist this run's timer tree to `timings/`, and compute speedup against
/// the recorded serial baseline when this is not itself the serial run.
///
/// `threads_v_elapsed.txt` gets one row per timer node for *every* run,
/// serial included — the original's serial branch writes its elapsed table
/// too (`main.cc`'s `print_threads_v_elapsed()` call in the `n == 1` path).
/// `threads_v_speedup.txt`/`efficiency<N>.txt` only make sense relative to
/// a baseline, so they stay untouched for the serial run itself.
fn persist_timing(dir: &Path, worker_count: usize, timer: &TimerNode) -> Result<()> {
    fs::create_dir_all(dir)?;
    let baseline_path = dir.join("serial_timers.txt");
    let elapsed_path = dir.join("threads_v_elapsed.txt");

    let mut elapsed_rows = Vec::new();
    collect_elapsed(timer, &mut elapsed_rows);
    let elapsed_line: String = elapsed_rows
        .iter()
        .map(|(name, secs)| format!("{worker_count} {name} {secs:.9}\n"))
        .collect();
    append_line(&elapsed_path, &elapsed_line)?;

    if worker_count <= 1 {
        fs::write(&baseline_path, timer.serialize())?;
        return Ok(());
    }

    match fs::read_to_string(&baseline_path) {
        Ok(text) => {
            let baseline = TimerNode::parse(&text)?;
            let rows = parallel_jacobi::timer::speedup_report(timer, &baseline, worker_count);

            let speedup_path = dir.join("threads_v_speedup.txt");
            let mut speedup_line = String::new();
            for row in &rows {
                speedup_line.push_str(&format!("{} {} {:.6}\n", worker_count, row.name, row.speedup));

                if row.name == "run" {
                    let efficiency_path = dir.join(format!("efficiency{worker_count}.txt"));
                    append_line(&efficiency_path, &format!("{} {:.3}\n", worker_count, row.efficiency * 100.0))?;
                }
            }
            append_line(&speedup_path, &speedup_line)?;
        }
        Err(_) => {
            warn!("no serial baseline at {}; speedup/efficiency suppressed", baseline_path.display());
        }
    }

    Ok(())
}

/// Depth-first `(name, elapsed_secs)` pairs for every node in the tree, each
/// node's own elapsed time rather than the root's.
fn collect_elapsed<'a>(node: &'a TimerNode, out: &mut Vec<(&'a str, f64)>) {
    out.push((node.name(), node.elapsed_secs()));
    for child in node.children() {
        collect_elapsed(child, out);
    }
}

fn append_line(path: &Path, text: &str) -> Result<()> {
    use std::io::Write;
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}
