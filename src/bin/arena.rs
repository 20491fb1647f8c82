use ai_squares::expectimax::{ExpectimaxConfig, ExpectimaxParallel};
use ai_squares::game;
use ai_squares::scoring::PointSystem;
use ai_squares::trace::{self, Meta};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn main() {
    let args = Args::parse();

    // Subcommand-driven continuous generator mode
    if let Some(Cmd::Forever { out_dir, max_gb, quiet, depth, point_system, clock_secs }) = &args.cmd
    {
        let gb = max_gb.unwrap_or(10.0);
        let max_bytes: u64 = if gb.is_finite() && gb > 0.0 { (gb * 1e9) as u64 } else { 10_000_000_000 };
        let knobs = Knobs {
            depth: depth.unwrap_or(2),
            point_system: point_system.clone().unwrap_or_else(|| "british".to_string()),
            clock: Duration::from_secs(clock_secs.unwrap_or(30)),
        };
        if let Err(e) = run_generator_mode(out_dir, max_bytes, *quiet, &knobs) {
            eprintln!("Generator mode failed: {e:?}");
        }
        return;
    }

    let knobs = Knobs {
        depth: args.depth,
        point_system: args.point_system.clone(),
        clock: Duration::from_secs(args.clock_secs),
    };
    if let Err(e) = run_batch(&args, &knobs) {
        eprintln!("Arena failed: {e:?}");
    }
}

struct Knobs {
    depth: usize,
    point_system: String,
    clock: Duration,
}

fn run_batch(args: &Args, knobs: &Knobs) -> anyhow::Result<()> {
    let start = Instant::now();

    // Status line: games/sec and running average via indicatif
    let games_done = Arc::new(AtomicU64::new(0));
    let total_score = Arc::new(AtomicU64::new(0));
    let best_score = Arc::new(AtomicU64::new(0));
    let stop = Arc::new(AtomicBool::new(false));

    let mut status_handle: Option<thread::JoinHandle<()>> = None;
    let mut pb_opt: Option<ProgressBar> = None;
    if !args.quiet {
        let games_for_status = games_done.clone();
        let score_for_status = total_score.clone();
        let best_for_status = best_score.clone();
        let stop_flag = stop.clone();
        let pb = ProgressBar::new(args.games);
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} | {pos}/{len} games | {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        let pb_bg = pb.clone();
        status_handle = Some(thread::spawn(move || {
            let start = Instant::now();
            while !stop_flag.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(250));
                let g = games_for_status.load(Ordering::Relaxed);
                let elapsed = start.elapsed().as_secs_f64().max(1e-6);
                let rate = (g as f64) / elapsed;
                let avg = if g > 0 {
                    score_for_status.load(Ordering::Relaxed) as f64 / g as f64
                } else {
                    0.0
                };
                let best = best_for_status.load(Ordering::Relaxed);
                pb_bg.set_position(g);
                pb_bg.set_message(format!(
                    "games/sec: {:.2} | avg score: {:.1} | best: {}",
                    rate, avg, best
                ));
            }
        }));
        pb_opt = Some(pb);
    }

    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir)?;
    }

    let mut played = 0u64;
    while played < args.games {
        let seed = args.seed.map(|s| s.wrapping_add(played));
        let (meta, cards, cells) = run_single_game(knobs, seed)?;
        played += 1;
        games_done.store(played, Ordering::Relaxed);
        total_score.fetch_add(meta.final_score as u64, Ordering::Relaxed);
        best_score.fetch_max(meta.final_score as u64, Ordering::Relaxed);
        if let Some(dir) = &args.out_dir {
            let path = autoname(dir, meta.start_unix_s);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            trace::write_run_to_path(&path, &meta, &cards, &cells)?;
        }
        if let Some(target) = args.stop_score {
            if meta.final_score >= target {
                break;
            }
        }
    }

    // Stop status thread and print final line
    stop.store(true, Ordering::Relaxed);
    if let Some(h) = status_handle {
        let _ = h.join();
    }
    if let Some(pb) = pb_opt {
        pb.finish_and_clear();
    }
    let elapsed = start.elapsed().as_secs_f64().max(1e-6);
    let total = total_score.load(Ordering::Relaxed);
    let avg = if played > 0 { total as f64 / played as f64 } else { 0.0 };
    println!(
        "Games: {} | games/sec: {:.2} | avg score: {:.1} | best: {}",
        played,
        (played as f64) / elapsed,
        avg,
        best_score.load(Ordering::Relaxed)
    );
    Ok(())
}

fn run_single_game(knobs: &Knobs, seed: Option<u64>) -> anyhow::Result<(Meta, Vec<u8>, Vec<u8>)> {
    let start_wall = trace::now_unix_seconds();
    let oracle = make_system(&knobs.point_system)?;
    let cfg = ExpectimaxConfig { depth_limit: knobs.depth, ..Default::default() };
    let mut strategy = ExpectimaxParallel::with_config(make_system(&knobs.point_system)?, cfg);
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let result = game::play(&mut strategy, &oracle, &mut rng, knobs.clock)?;
    let cards: Vec<u8> = result.placements.iter().map(|p| u8::from(p.card)).collect();
    let cells: Vec<u8> = result
        .placements
        .iter()
        .map(|p| (p.row * 5 + p.col) as u8)
        .collect();
    let meta = Meta {
        turns: cards.len() as u32,
        start_unix_s: start_wall,
        elapsed_s: result.elapsed.as_secs_f32(),
        final_score: result.final_score as u32,
        point_system: Some(strategy.oracle().name().to_string()),
    };
    Ok((meta, cards, cells))
}

fn run_generator_mode(dir: &PathBuf, max_bytes: u64, quiet: bool, knobs: &Knobs) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;
    let mut runs_written: u64 = 0;
    let mut bytes_written: u64 = directory_size_bytes(dir)?;
    let pb = if !quiet {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} | Runs: {pos} | Size: {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    loop {
        if bytes_written >= max_bytes {
            break;
        }
        let (meta, cards, cells) = run_single_game(knobs, None)?;
        let bytes = trace::encode_run(&meta, &cards, &cells);
        let path = autoname(dir, meta.start_unix_s);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &bytes)?;
        runs_written += 1;
        bytes_written = bytes_written.saturating_add(bytes.len() as u64);
        if let Some(pb) = &pb {
            pb.set_position(runs_written);
            pb.set_message(format!("{:.2} MB", (bytes_written as f64) / 1e6));
        }
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    eprintln!(
        "Generator stopped. Runs: {}, Size: {:.2} MB",
        runs_written,
        (bytes_written as f64) / 1e6
    );
    Ok(())
}

fn make_system(name: &str) -> anyhow::Result<PointSystem> {
    match name {
        "american" => Ok(PointSystem::american()),
        "british" => Ok(PointSystem::british()),
        other => anyhow::bail!("unknown point system '{other}' (expected american or british)"),
    }
}

fn autoname(dir: &PathBuf, start_unix_s: u64) -> PathBuf {
    // shard by day number since epoch to keep dirs lighter
    let day = start_unix_s / 86_400;
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let subdir = dir.join(format!("d{:08}", day));
    subdir.join(format!("run-{}-{:09}.psqrun", start_unix_s, nanos))
}

fn directory_size_bytes(dir: &PathBuf) -> anyhow::Result<u64> {
    let mut total = 0u64;
    if !dir.exists() {
        return Ok(0);
    }
    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            if let Ok(md) = entry.metadata() {
                total = total.saturating_add(md.len());
            }
        }
    }
    Ok(total)
}

#[derive(Debug, Parser)]
#[command(name = "arena", about = "Batch Poker Squares expectimax runner")]
struct Args {
    #[command(subcommand)]
    cmd: Option<Cmd>,

    /// Number of games to play
    #[arg(long, default_value_t = 100)]
    games: u64,

    /// Search depth limit (plies before direct scoring)
    #[arg(long, default_value_t = 2)]
    depth: usize,

    /// Point system: american or british
    #[arg(long, default_value = "british")]
    point_system: String,

    /// Wall-clock budget per game, in seconds
    #[arg(long, default_value_t = 30)]
    clock_secs: u64,

    /// Base seed for reproducible deals (game i uses seed + i)
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress status line output
    #[arg(long)]
    quiet: bool,

    /// Stop once a game reaches this score
    #[arg(long)]
    stop_score: Option<u32>,

    /// Write a binary trace of every run into this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Continuously generate runs into a directory until stopped or size cap reached
    Forever {
        /// Output directory for generated runs
        #[arg(long)]
        out_dir: PathBuf,
        /// Maximum total GB allowed in out_dir (default 10.0)
        #[arg(long)]
        max_gb: Option<f64>,
        /// Suppress the spinner status line
        #[arg(long)]
        quiet: bool,
        /// Per-run: search depth limit
        #[arg(long)]
        depth: Option<usize>,
        /// Per-run: point system (american or british)
        #[arg(long)]
        point_system: Option<String>,
        /// Per-run: wall-clock budget in seconds
        #[arg(long)]
        clock_secs: Option<u64>,
    },
}
