//! The `models` subcommand: show the built-in price table.

use engine::PriceTable;

pub fn handle_models() {
    let table = PriceTable::builtin();
    let mut entries: Vec<_> = table.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    println!(
        "{:<24} {:>12} {:>12}",
        "model", "$/Mtok in", "$/Mtok out"
    );
    for (model, price) in entries {
        println!(
            "{:<24} {:>12.2} {:>12.2}",
            model, price.input_per_mtok, price.output_per_mtok
        );
    }
    println!("\nUnlisted models are billed at $0 in the running cost display.");
}
