use ratescraper::store::{load_records, RateStore};
use std::{env, path::Path, process::exit};

fn main() {
    // Expect exactly one CLI argument: a pass file, or a store directory (latest pass).
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <PARQUET_FILE | STORE_DIR>", args[0]);
        exit(1);
    }
    if let Err(e) = inspect(Path::new(&args[1])) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let file = if path.is_dir() {
        match RateStore::new(path)?.latest_pass()? {
            Some(p) => p,
            None => anyhow::bail!("no passes stored under {}", path.display()),
        }
    } else {
        path.to_path_buf()
    };

    let rows = load_records(&file)?;
    println!("=== Pass: {} ===", file.display());
    println!(
        "{:<5} {:>5}  {:<28} {:>5} {:>14} {:>14}  {:<25} {}",
        "code", "num", "country", "unit", "buy", "sell", "observed_at", "failed"
    );
    for r in &rows {
        let observed = r
            .observed_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<5} {:>5}  {:<28} {:>5} {:>14} {:>14}  {:<25} {}",
            r.code,
            r.numeric_code,
            r.country_or_region,
            r.unit_relation,
            r.buy_rate,
            r.sell_rate,
            observed,
            r.parse_failures
        );
    }
    let observed = rows.iter().filter(|r| r.observed_at.is_some()).count();
    println!();
    println!("{} rows, {} observed", rows.len(), observed);
    Ok(())
}
