//! Example that demonstrates the usage shown in the crate documentation.
//!
//! Races 16-byte cache line split loads and stores on every available processor and reports
//! whether any of them were torn.

use isatomic::{Mode, RunConfig, Verdict};

fn main() {
    println!("=== isatomic README Example ===");

    let mode = Mode::Width16Split;

    if !isatomic::is_supported(mode) {
        println!("Mode {mode} is not supported on this processor.");
        return;
    }

    let config = RunConfig::new(mode).with_iterations(100_000);
    let classification = isatomic::run(&config).unwrap();

    for observation in classification.observations() {
        println!("{observation}");
    }

    match classification.verdict() {
        Verdict::Atomic => println!("{} looked atomic.", mode.description()),
        Verdict::Torn => println!("{} are not atomic here.", mode.description()),
    }

    println!("README example completed successfully!");
}
