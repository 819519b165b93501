use std::time::{Duration, Instant};

use lark_core::{Environment, Value};

fn bench_define(n: usize) -> Duration {
    let start = Instant::now();
    let env = Environment::new();
    for i in 0..n {
        env.define(format!("var{i}"), Value::Number(i as f64));
    }
    start.elapsed()
}

fn bench_lookup(n: usize) -> Duration {
    // Five nested scopes between the probe and the binding.
    let root = Environment::new();
    root.define("needle", Value::Number(42.0));
    let mut env = root;
    for _ in 0..5 {
        env = env.child();
    }

    let start = Instant::now();
    for _ in 0..n {
        let _ = env.lookup("needle");
    }
    start.elapsed()
}

fn main() {
    println!("Environment performance");
    println!("=======================\n");

    for size in [10, 100, 1000, 10000] {
        let duration = bench_define(size);
        let per_op = duration.as_nanos() / size as u128;
        println!("{size:5} defines:          {duration:?} ({per_op} ns/op)");
    }

    println!();

    for size in [1000, 10000, 100000] {
        let duration = bench_lookup(size);
        let per_op = duration.as_nanos() / size as u128;
        println!("{size:6} chained lookups: {duration:?} ({per_op} ns/op)");
    }
}
