use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use dh_app::{
    AppError, AppResult, DesignProgressEvent, DesignSummary, capacity_rows, capacity_table,
    compile_config, design_scenario, load_config, load_scenario, summarize,
};

#[derive(Parser)]
#[command(name = "dh-cli")]
#[command(about = "District heating network design from road and building layers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a design configuration file
    Validate {
        /// Path to the config file (YAML, or JSON by extension)
        config_path: PathBuf,
    },
    /// Print the nominal size to maximum heat flow table
    Capacity {
        /// Path to the config file
        config_path: PathBuf,
    },
    /// Run the full design pipeline on a scenario
    Design {
        /// Path to the config file
        config_path: PathBuf,
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
        /// Write the design summary as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Capacity { config_path } => cmd_capacity(&config_path),
        Commands::Design {
            config_path,
            scenario_path,
            json,
        } => cmd_design(&config_path, &scenario_path, json.as_deref()),
    }
}

fn cmd_validate(config_path: &Path) -> AppResult<()> {
    println!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    compile_config(&config)?;
    println!("✓ Config is valid");
    Ok(())
}

fn cmd_capacity(config_path: &Path) -> AppResult<()> {
    let config = load_config(config_path)?;
    let table = capacity_table(&config)?;

    println!("{:>6} {:>10} {:>10} {:>12}", "DN", "D [m]", "v* [m/s]", "Q max [kW]");
    for row in capacity_rows(&table) {
        println!(
            "{:>6} {:>10.4} {:>10.2} {:>12.1}",
            row.dn, row.inner_diameter_m, row.max_velocity_m_s, row.max_heat_kw
        );
    }
    Ok(())
}

fn cmd_design(config_path: &Path, scenario_path: &Path, json: Option<&Path>) -> AppResult<()> {
    let config = load_config(config_path)?;
    let scenario = load_scenario(scenario_path)?;
    println!(
        "Designing '{}' ({} roads, {} buildings)",
        scenario.name,
        scenario.roads.len(),
        scenario.buildings.len()
    );

    let mut last_emit = Instant::now();
    let (layers, response) = design_scenario(
        &config,
        &scenario,
        Some(&mut |event| {
            if event.message.is_some() || last_emit.elapsed().as_millis() >= 100 {
                render_cli_progress(&event);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    let summary = summarize(&response, &layers.network, &layers.nodes);
    print_summary(&summary);

    if let Some(path) = json {
        let content = serde_json::to_string_pretty(&summary)
            .map_err(|e| AppError::InvalidInput(format!("Failed to serialize summary: {}", e)))?;
        std::fs::write(path, content).map_err(|e| AppError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        println!("  Summary written to {}", path.display());
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &DesignProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {}", msg));
    }
    print!("{}", line);
    let _ = io::stdout().flush();
}

fn print_summary(summary: &DesignSummary) {
    println!("✓ Design completed");
    println!(
        "  Terminals: {} resolved, {} excluded",
        summary.terminals_resolved,
        summary.terminals_excluded.len()
    );
    for excluded in &summary.terminals_excluded {
        println!("    - {}", excluded);
    }
    println!(
        "  Network: {} edges, {:.1} m",
        summary.network_edges, summary.network_length_m
    );
    if summary.groups > 0 {
        println!(
            "  Junction groups: {} ({} replaced)",
            summary.groups, summary.groups_replaced
        );
    }
    println!("  Demand at source: {:.1} kW", summary.total_demand_kw);
    if summary.over_capacity > 0 {
        println!("  ! {} edges exceed the largest pipe", summary.over_capacity);
    }
    if summary.unreached > 0 {
        println!("  ! {} edges unreached from the source", summary.unreached);
    }
    println!(
        "  Heat loss: {:.2} W/m supply, {:.2} W/m return, {:.0} W total",
        summary.supply_loss_w_m, summary.return_loss_w_m, summary.total_heat_loss_w
    );
    println!("  Total:   {:.3}s", summary.total_time_s);
}
