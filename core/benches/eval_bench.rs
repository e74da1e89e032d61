use codspeed_criterion_compat::{Criterion, black_box, criterion_group, criterion_main};
use kern::numeric::Ops;
use kern::{NumericType, Runtime, read_all};
use std::time::Duration;

// ============================================================================
// Reading Benchmarks
// ============================================================================

fn bench_read_small(c: &mut Criterion) {
    c.bench_function("read small form", |b| {
        b.iter(|| black_box(read_all("(cons 1 [2 3])").unwrap()))
    });
}

fn bench_read_large_vector(c: &mut Criterion) {
    let items: Vec<String> = (0..1000).map(|i| i.to_string()).collect();
    let text = format!("[{}]", items.join(" "));
    c.bench_function("read vector (1000 elements)", |b| {
        b.iter(|| black_box(read_all(&text).unwrap()))
    });
}

fn bench_read_nested(c: &mut Criterion) {
    let mut text = String::from("1");
    for _ in 0..100 {
        text = format!("(+ {text} 1)");
    }
    c.bench_function("read deep nesting (100 levels)", |b| {
        b.iter(|| black_box(read_all(&text).unwrap()))
    });
}

// ============================================================================
// Evaluation Benchmarks
// ============================================================================

fn bench_startup(c: &mut Criterion) {
    c.bench_function("runtime startup with core library", |b| {
        b.iter(|| black_box(Runtime::new().unwrap()))
    });
}

fn bench_loop_recur(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    c.bench_function("loop/recur sum (10000)", |b| {
        b.iter(|| {
            black_box(
                rt.eval_str("(loop [i 0 acc 0] (if (< i 10000) (recur (inc i) (+ acc i)) acc))")
                    .unwrap(),
            )
        })
    });
}

fn bench_fibonacci(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    rt.eval_str("(defn fib [n] (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2)))))")
        .unwrap();
    c.bench_function("recursive fibonacci(15)", |b| {
        b.iter(|| black_box(rt.eval_str("(fib 15)").unwrap()))
    });
}

fn bench_lazy_pipeline(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    c.bench_function("lazy map/filter/reduce (1000)", |b| {
        b.iter(|| {
            black_box(
                rt.eval_str("(reduce + (filter even? (map inc (range 1000))))")
                    .unwrap(),
            )
        })
    });
}

// ============================================================================
// Numeric Benchmarks
// ============================================================================

fn bench_mixed_add(c: &mut Criterion) {
    let a = NumericType::Int(7);
    let b = NumericType::make_ratio(1, 3).unwrap();
    c.bench_function("add int + ratio", |bench| {
        bench.iter(|| black_box(Ops::resolve(&a, &b).add(&a, &b)))
    });
}

criterion_group!(read_benches, bench_read_small, bench_read_large_vector, bench_read_nested);

criterion_group!(numeric_benches, bench_mixed_add);

criterion_group! {
    name = eval_benches;
    config = Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(10));
    targets =
        bench_startup,
        bench_loop_recur,
        bench_fibonacci,
        bench_lazy_pipeline
}

criterion_main!(read_benches, eval_benches, numeric_benches);
