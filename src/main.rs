use ResFlow::BlackOil::indices::{BIOFILMS_CONCENTRATION_IDX, PRESSURE_SWITCH_IDX, WATER_SATURATION_IDX};
use ResFlow::Utils::logger::init_logger;
use ResFlow::simulator::{SimulationConfig, run_simulation};
use log::{LevelFilter, error, info};
use prettytable::{Table, row};

/// `resflow [config.json]`; without a file the built-in biofilm column case is run.
pub fn main() {
    if let Err(e) = init_logger(LevelFilter::Info, None) {
        eprintln!("{}", e);
    }
    let config = match std::env::args().nth(1) {
        Some(path) => match SimulationConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        },
        None => {
            info!("no configuration file given, running the default biofilm column");
            SimulationConfig::default()
        }
    };

    match run_simulation(&config) {
        Ok(summary) => {
            summary.step_table().printstd();
            let mut table = Table::new();
            table.add_row(row!["Cell", "Pressure [bar]", "Sw", "Biofilm fraction"]);
            for (cell, pv) in summary.solution.iter().enumerate() {
                table.add_row(row![
                    cell,
                    format!("{:.4}", pv[PRESSURE_SWITCH_IDX] / 1.0e5),
                    format!("{:.4}", pv[WATER_SATURATION_IDX]),
                    format!("{:.6}", pv[BIOFILMS_CONCENTRATION_IDX])
                ]);
            }
            table.printstd();
        }
        Err(e) => {
            error!("simulation failed: {}", e);
            std::process::exit(1);
        }
    }
}
