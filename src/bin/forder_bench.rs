//! Times `order` on a generated table.
//!
//! `forder-bench --rows 10000000 --keys 2 --threads 8 --scheduler chili`

use std::time::Instant;

use argh::FromArgs;
use forder::{
    order_with, Column, KeySpec, OrderConfig, OrderOptions, PrettyDuration, Scheduler, Table,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(FromArgs)]
/// Order a random table and report timings.
struct Args {
    /// number of rows
    #[argh(option, default = "1_000_000")]
    rows: usize,

    /// number of key columns
    #[argh(option, default = "1")]
    keys: usize,

    /// distinct values per key column
    #[argh(option, default = "1_000")]
    cardinality: u32,

    /// worker threads, defaults to the process-wide setting
    #[argh(option)]
    threads: Option<usize>,

    /// scheduler: seq, rayon, raw or chili
    #[argh(option, default = "Scheduler::default()")]
    scheduler: Scheduler,

    /// use string keys instead of integers
    #[argh(switch)]
    strings: bool,

    /// emit groups in first-appearance order
    #[argh(switch)]
    first_appearance: bool,

    /// timed repetitions
    #[argh(option, default = "3")]
    runs: usize,

    /// random seed
    #[argh(option, default = "0")]
    seed: u64,
}

fn generate(args: &Args) -> Table {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let cardinality = args.cardinality.max(1);
    let columns = (0..args.keys.max(1))
        .map(|_| {
            if args.strings {
                Column::strings((0..args.rows).map(|_| {
                    let v = rng.random_range(0..cardinality);
                    (v != 0).then(|| format!("key-{v:08}"))
                }))
            } else {
                Column::Int32(
                    (0..args.rows)
                        .map(|_| {
                            let v = rng.random_range(0..cardinality);
                            (v != 0).then_some(v as i32)
                        })
                        .collect(),
                )
            }
        })
        .collect();
    Table::new(columns)
}

fn main() {
    let args: Args = argh::from_env();

    let start = Instant::now();
    let table = generate(&args);
    println!(
        "generated {} rows x {} keys in {}",
        args.rows,
        table.num_columns(),
        PrettyDuration(start.elapsed())
    );

    let mut config = OrderConfig::current().with_scheduler(args.scheduler);
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    let options = OrderOptions::default()
        .with_config(config)
        .first_appearance(args.first_appearance);
    let spec = KeySpec::ascending(0..table.num_columns());

    for run in 0..args.runs.max(1) {
        let start = Instant::now();
        match order_with(&table, &spec, &options) {
            Ok(result) => println!(
                "run {run}: {} ({} threads, {}), {} groups, max group {}, {:?}",
                PrettyDuration(start.elapsed()),
                config.effective_threads(args.rows),
                config.scheduler,
                result.groups.len(),
                result.groups.max_group_len(),
                result.stats,
            ),
            Err(err) => {
                eprintln!("order failed: {err}");
                std::process::exit(1);
            }
        }
    }
}
