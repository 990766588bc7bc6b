//! Races on the real hardware. These verify the properties that must hold on every processor,
//! regardless of whether it actually tears wide loads/stores.

#![cfg(all(
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "aarch64")
))]

use std::thread;

use isatomic::{Mode, RunConfig, Verdict, allowed_cpus, is_supported, run};

/// Runs the race on a throwaway thread, so the test runner thread does not stay pinned.
fn run_on_fresh_thread(config: RunConfig) -> isatomic::Classification {
    thread::spawn(move || run(&config).unwrap())
        .join()
        .unwrap()
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot call platform APIs.
fn single_cpu_aligned_lines_are_zero_and_all_set() {
    let cpu = *allowed_cpus().unwrap().first();

    let classification = run_on_fresh_thread(
        RunConfig::new(Mode::Width16Aligned)
            .with_iterations(1000)
            .with_cpus(vec![cpu]),
    );

    let lines: Vec<_> = classification
        .observations()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(lines, vec!["0 500", "f 500"]);
    assert_eq!(classification.verdict(), Verdict::Atomic);
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot call platform APIs.
fn every_supported_mode_conserves_iterations() {
    // A handful of processors is enough to race, and keeps the test fast on big machines.
    let cpus: Vec<_> = allowed_cpus().unwrap().into_iter().take(4).collect();
    let expected_total = 10_000 * cpus.len() as u64;

    for mode in Mode::ALL.into_iter().filter(|mode| is_supported(*mode)) {
        let classification = run_on_fresh_thread(
            RunConfig::new(mode)
                .with_iterations(10_000)
                .with_cpus(cpus.clone()),
        );

        let total: u64 = classification.observations().iter().map(|o| o.count()).sum();
        assert_eq!(total, expected_total, "{mode}");

        let all_set = mode.width().all_set_mask();
        for observation in classification.observations() {
            let canonical = observation.mask() == 0 || observation.mask() == all_set;
            assert_eq!(observation.is_torn(), !canonical, "{mode}: {observation}");
        }
    }
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot call platform APIs.
fn zero_iterations_report_nothing() {
    let classification = run_on_fresh_thread(RunConfig::new(Mode::Width16Split).with_iterations(0));

    assert!(classification.observations().is_empty());
    assert_eq!(classification.verdict(), Verdict::Atomic);
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot call platform APIs.
fn calling_thread_stays_pinned_to_first_cpu() {
    let cpu = *allowed_cpus().unwrap().last();

    thread::spawn(move || {
        run(&RunConfig::new(Mode::Width16Aligned)
            .with_iterations(10)
            .with_cpus(vec![cpu]))
        .unwrap();

        assert_eq!(allowed_cpus().unwrap().into_iter().collect::<Vec<_>>(), vec![cpu]);
    })
    .join()
    .unwrap();
}
