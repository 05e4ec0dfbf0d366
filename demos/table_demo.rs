use clap::Parser;
use probe_table::Error;
use probe_table::ProbeTable;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "capacity", default_value_t = 16)]
    capacity: usize,

    /// Number of keys to insert; inserts beyond the capacity are expected to fail.
    #[arg(short = 'n', long = "keys", default_value_t = 20)]
    keys: usize,

    /// Remove every n-th key after filling. Zero disables removal.
    #[arg(short = 'r', long = "remove_every", default_value_t = 3)]
    remove_every: usize,

    /// Capacity to migrate to after removals. Defaults to twice the capacity.
    #[arg(short = 's', long = "resize_to")]
    resize_to: Option<usize>,
}

fn fill(table: &mut ProbeTable, keys: usize) -> usize {
    let mut failures = 0;
    for i in 0..keys {
        match table.try_upsert(&format!("key{i}"), &format!("value{i}")) {
            Ok(()) => {}
            Err(Error::TableFull { .. }) => failures += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    failures
}

fn resize_target(args: &Args) -> usize {
    args.resize_to.unwrap_or(args.capacity.saturating_mul(2))
}

fn main() {
    let args = Args::parse();

    let mut table = match ProbeTable::with_capacity(args.capacity) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let failures = fill(&mut table, args.keys);
    println!(
        "Inserted {} of {} keys ({} rejected as full)",
        table.len(),
        args.keys,
        failures
    );
    table.print();

    if args.remove_every > 0 {
        let removed = (0..args.keys)
            .step_by(args.remove_every)
            .filter(|i| table.remove(&format!("key{i}")))
            .count();
        println!("Removed {removed} keys, {} tombstones remain", table.tombstones());
        table.print();
    }

    let target = resize_target(&args);
    match table.resize(target) {
        Ok(()) => println!("Resized to {target} slots"),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }

    let failures = fill(&mut table, args.keys);
    println!(
        "Refilled: {} live, {} rejected, load {:.2}, occupancy {:.2}",
        table.len(),
        failures,
        table.load(),
        table.occupancy()
    );
    table.print();
    table.probe_stats().print();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_resize_target_saturates() {
        let max = usize::MAX.to_string();
        let args = Args::parse_from(["table_demo", "-c", max.as_str()]);
        assert_eq!(resize_target(&args), usize::MAX);

        let args = Args::parse_from(["table_demo", "-c", "8"]);
        assert_eq!(resize_target(&args), 16);

        let args = Args::parse_from(["table_demo", "-c", "8", "-s", "5"]);
        assert_eq!(resize_target(&args), 5);
    }
}
