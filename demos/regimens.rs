//! Reference runs of the three models, reported on the console.
//!
//! Run without arguments for the reference infant, or pass a JSON scenario file
//! to print that scenario's time series as CSV:
//!
//! ```text
//! cargo run --example regimens
//! cargo run --example regimens -- scenario.json > series.csv
//! ```

use pdsim::prelude::*;

fn main() -> Result<(), DialysisError> {
    if let Some(path) = std::env::args().nth(1) {
        let result = Scenario::from_path(path)?.run()?;
        return result.write_csv(std::io::stdout().lock());
    }

    let patient = Patient::default();
    let results = [
        SteppedSimulation::cyclic(&patient, &CyclicRegimen::default())?.run()?,
        SteppedSimulation::continuous(&patient, &ContinuousRegimen::default())?.run()?,
        PeriodicExchange::new(ExchangeParameters::default())?.run()?,
    ];

    println!("=== Final blood concentration ===");
    for result in &results {
        println!("{}", result.summary());
    }

    println!("\n=== Fractional clearance ===");
    for result in &results {
        match result.fractional_clearance() {
            Some(clearance) => println!("{:>6}: {:.1}%", result.regimen(), clearance * 100.0),
            None => println!("{:>6}: n/a", result.regimen()),
        }
    }

    println!("\n=== Cyclic regimen, cycle count sweep ===");
    let scenarios = cycle_count_scenarios(&patient, &CyclicRegimen::default(), [2, 5, 10, 20]);
    for (scenario, result) in scenarios.iter().zip(sweep(&scenarios)) {
        if let Scenario::Cyclic { regimen, .. } = scenario {
            println!("{:>3} cycles: {}", regimen.num_cycles, result?.summary());
        }
    }

    Ok(())
}
