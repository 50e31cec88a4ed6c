// Standalone benchmark for the serializer (U).
//
// Run: cargo bench --bench encode_bench
//
// Compares `unparse::unparse` against a naive per-field allocate-and-join
// baseline across clean data (no quoting needed) and mixed data (some
// fields need quoting/escaping), at a few sizes.

use std::time::{Duration, Instant};

use dsvkit::config::UnparseConfig;
use dsvkit::model::{Row, Value};
use dsvkit::unparse::{unparse, UnparseInput};

/// A naive baseline: per-field `String` allocation and a `Vec<String>`
/// join, the way a reflection-heavy host language would do it. This is a
/// lower bound on that cost, since it doesn't pay for anything beyond the
/// allocations themselves.
fn encode_naive(rows: &[Vec<&[u8]>], separator: u8, quote: u8, line_sep: &[u8]) -> Vec<u8> {
    let trigger_bytes: &[u8] = &[separator, quote, b'\n', b'\r'];
    let mut parts: Vec<Vec<u8>> = Vec::with_capacity(rows.len());

    for row in rows {
        let mut field_strings: Vec<Vec<u8>> = Vec::with_capacity(row.len());
        for field in row {
            let needs_quoting = field.iter().any(|b| trigger_bytes.contains(b));
            if needs_quoting {
                let mut escaped = Vec::with_capacity(field.len() + 10);
                for &b in *field {
                    if b == quote {
                        escaped.push(quote);
                    }
                    escaped.push(b);
                }
                let mut quoted = Vec::with_capacity(escaped.len() + 2);
                quoted.push(quote);
                quoted.extend_from_slice(&escaped);
                quoted.push(quote);
                field_strings.push(quoted);
            } else {
                field_strings.push(field.to_vec());
            }
        }

        let mut row_out = Vec::new();
        for (i, f) in field_strings.iter().enumerate() {
            if i > 0 {
                row_out.push(separator);
            }
            row_out.extend_from_slice(f);
        }
        row_out.extend_from_slice(line_sep);
        parts.push(row_out);
    }

    let total_len: usize = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(total_len);
    for part in &parts {
        out.extend_from_slice(part);
    }
    out
}

fn generate_clean_rows(num_rows: usize, fields_per_row: usize) -> Vec<Row> {
    (0..num_rows)
        .map(|i| {
            Row::Positional(
                (0..fields_per_row)
                    .map(|j| Value::String(format!("field_{i}_{j}_value")))
                    .collect(),
            )
        })
        .collect()
}

fn generate_mixed_rows(num_rows: usize, fields_per_row: usize) -> Vec<Row> {
    (0..num_rows)
        .map(|i| {
            Row::Positional(
                (0..fields_per_row)
                    .map(|j| {
                        Value::String(match j % 5 {
                            0 => format!("plain_value_{i}"),
                            1 => format!("has,comma_{i}"),
                            2 => format!("has\"quote_{i}"),
                            3 => format!("has\nnewline_{i}"),
                            _ => format!("normal_field_{i}_{j}"),
                        })
                    })
                    .collect(),
            )
        })
        .collect()
}

struct BenchResult {
    name: String,
    iterations: u64,
    total_time: Duration,
    output_size: usize,
}

impl BenchResult {
    fn avg_ns(&self) -> f64 {
        self.total_time.as_nanos() as f64 / self.iterations as f64
    }

    fn throughput_mb_s(&self) -> f64 {
        let bytes_per_iter = self.output_size as f64;
        let secs_per_iter = self.avg_ns() / 1_000_000_000.0;
        bytes_per_iter / secs_per_iter / 1_000_000.0
    }
}

fn bench_fn<F: Fn() -> Vec<u8>>(name: &str, f: F, warmup_secs: f64, bench_secs: f64) -> BenchResult {
    let warmup_deadline = Instant::now() + Duration::from_secs_f64(warmup_secs);
    let mut output_size = 0;
    while Instant::now() < warmup_deadline {
        output_size = f().len();
    }

    let mut iterations: u64 = 0;
    let start = Instant::now();
    let deadline = start + Duration::from_secs_f64(bench_secs);
    while Instant::now() < deadline {
        let _ = f();
        iterations += 1;
    }
    let total_time = start.elapsed();

    BenchResult {
        name: name.to_string(),
        iterations,
        total_time,
        output_size,
    }
}

fn print_results(results: &[BenchResult]) {
    let max_name_len = results.iter().map(|r| r.name.len()).max().unwrap_or(0);
    let fastest_ns = results.iter().map(|r| r.avg_ns()).fold(f64::MAX, f64::min);

    for r in results {
        let avg = r.avg_ns();
        let speedup = avg / fastest_ns;
        let marker = if (speedup - 1.0).abs() < 0.01 { " (fastest)" } else { "" };
        println!(
            "  {:<width$}  {:>10.2} µs/iter  {:>8.1} MB/s  {:>6.2}x{}",
            r.name,
            avg / 1000.0,
            r.throughput_mb_s(),
            speedup,
            marker,
            width = max_name_len,
        );
    }
}

fn run_benchmark_suite(label: &str, rows: &[Row], warmup: f64, time: f64) {
    let field_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| match row {
            Row::Positional(values) => values.iter().map(|v| v.to_display_string()).collect(),
            Row::Named(_) => Vec::new(),
        })
        .collect();
    let byte_rows: Vec<Vec<&[u8]>> = field_rows
        .iter()
        .map(|row| row.iter().map(|f| f.as_bytes()).collect())
        .collect();

    println!("\n--- {label} ---");

    let mut cfg = UnparseConfig::new();
    cfg.header = false;

    let results = vec![
        bench_fn(
            "Naive (alloc + join)",
            || encode_naive(&byte_rows, b',', b'"', b"\r\n"),
            warmup,
            time,
        ),
        bench_fn(
            "unparse::unparse",
            || unparse(UnparseInput::Rows(rows.to_vec()), &cfg).unwrap(),
            warmup,
            time,
        ),
    ];

    let naive_out = encode_naive(&byte_rows, b',', b'"', b"\r\n");
    let unparse_out = unparse(UnparseInput::Rows(rows.to_vec()), &cfg).unwrap();
    println!(
        "  Output sizes: naive={} unparse={} bytes (newline convention differs; sizes are approximate)",
        naive_out.len(),
        unparse_out.len()
    );

    print_results(&results);
}

fn main() {
    println!("=== dsvkit serializer benchmark ===");

    let warmup = 1.0;
    let time = 3.0;

    let rows = generate_clean_rows(1_000, 10);
    run_benchmark_suite("1K rows x 10 fields (clean, no quoting)", &rows, warmup, time);

    let rows = generate_clean_rows(10_000, 10);
    run_benchmark_suite("10K rows x 10 fields (clean, no quoting)", &rows, warmup, time);

    let rows = generate_mixed_rows(10_000, 10);
    run_benchmark_suite("10K rows x 10 fields (mixed, with quoting)", &rows, warmup, time);

    let rows = generate_clean_rows(100_000, 10);
    run_benchmark_suite("100K rows x 10 fields (clean, no quoting)", &rows, warmup, time);

    let rows = generate_mixed_rows(100_000, 10);
    run_benchmark_suite("100K rows x 10 fields (mixed, with quoting)", &rows, warmup, time);

    println!("\n=== Done ===");
}
