use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::{self, Write};

use railflow_core::domain::clock::clock::SharedClock;
use railflow_core::domain::rail_system_model::conflict::conflict::Conflict;
use railflow_core::domain::rail_system_model::precedence::suggestion::SuggestedAction;
use railflow_core::domain::rail_system_model::rail_control::RailControl;
use railflow_core::domain::rail_system_model::scenario::perturbation::Perturbation;
use railflow_core::domain::rail_system_model::schedule::interval_store::IntervalStore;
use railflow_core::domain::rail_system_model::schedule::schedule_config::ScheduleConfig;
use railflow_core::domain::rail_system_model::synthetic::schedule_generator::{ScheduleGenerator, SyntheticNetwork};
use railflow_core::domain::rail_system_model::utils::time::{TimeInterval, parse_minutes};
use railflow_core::loader::parser::load_scenario;
use railflow_core::{generate_rail_control, logger};

#[derive(Debug, Parser)]
#[command(name = "railflow", version, about = "Rail resource scheduling and conflict resolution")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the conflicts of a network file together with the precedence suggestions.
    Conflicts {
        #[arg(short, long)]
        network: String,
    },

    /// Write the per-resource utilisation CSV.
    ExportResources {
        #[arg(short, long)]
        network: String,

        /// Window start, HH:MM.
        #[arg(long, default_value = "00:00")]
        from: String,

        /// Window end, HH:MM.
        #[arg(long, default_value = "24:00")]
        to: String,

        /// Output file, stdout if omitted.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Apply a scenario file to a fork of the network and report its metrics.
    Simulate {
        #[arg(short, long)]
        network: String,

        #[arg(short, long)]
        scenario: String,

        /// Commit the scenario to the live schedule when it evaluates without residual conflicts.
        #[arg(long)]
        commit: bool,

        /// Scenario results CSV, stdout if omitted.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Generate a synthetic network and run a delay scenario on it.
    Demo {
        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 24)]
        trains: usize,
    },
}

fn writer(output: &Option<String>) -> anyhow::Result<Box<dyn Write>> {
    match output {
        Some(path) => Ok(Box::new(File::create(path).with_context(|| format!("cannot create {}", path))?)),
        None => Ok(Box::new(io::stdout())),
    }
}

fn print_conflicts(control: &RailControl) {
    let conflicts = control.list_conflicts();
    println!("v{}: {} conflict(s)", control.current_version(), conflicts.len());
    for conflict in &conflicts {
        println!("  {}", conflict);
    }

    let resolution = control.suggestions();
    for suggestion in &resolution.suggestions {
        let action = match suggestion.action {
            SuggestedAction::Shift { to } => format!("shift to {}", to),
            SuggestedAction::Unresolvable => "unresolvable".to_string(),
        };
        let alternative = suggestion.alternative_resource.as_ref().map(|id| format!(", or move to {}", id)).unwrap_or_default();
        println!("  {} ({} on {}, rank {}): {}{}", suggestion.block_id, suggestion.train_id, suggestion.resource_id, suggestion.rank, action, alternative);
    }
}

async fn simulate(network: &str, scenario: &str, commit: bool, output: &Option<String>) -> anyhow::Result<()> {
    let control = generate_rail_control(network, SharedClock::wall())?;
    let scenario = load_scenario(scenario)?;
    let label = scenario.label.clone();
    let perturbations = scenario.perturbations()?;

    let handle = control.fork_scenario(control.current_version(), label.clone())?;
    let metrics = control.simulator().run(handle, perturbations)?.outcome().await?;
    let delta = control.simulator().compare(handle)?;

    println!(
        "Scenario '{}': total delay {} min ({:+}), throughput {:.2}/h ({:+.2}), {} unresolvable block(s)",
        label, metrics.total_delay_minutes, delta.total_delay_minutes, metrics.throughput_per_hour, delta.throughput_per_hour, metrics.conflict_count
    );

    control.save_scenario(handle, label)?;
    control.export_scenarios(writer(output)?)?;

    if commit {
        let version = control.commit_scenario(handle, false)?;
        println!("Committed as v{}.", version);
    } else {
        control.discard_scenario(handle)?;
    }

    Ok(())
}

fn demo(seed: u64, trains: usize) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let network = SyntheticNetwork { trains, ..SyntheticNetwork::default() };
    let state = ScheduleGenerator::new(&mut rng).generate(&network)?;

    let control = RailControl::new(IntervalStore::new(state, ScheduleConfig::default(), SharedClock::wall()));
    let overlaps = control.list_conflicts().iter().filter(|conflict| matches!(conflict, Conflict::Overlap { .. })).count();
    println!("Synthetic network (seed {}): {} block(s), {} overlap(s).", seed, control.list_blocks(&Default::default()).len(), overlaps);

    let Some(train) = control.store().snapshot().trains().iter().next().map(|train| train.id.clone()) else {
        return Ok(());
    };

    let handle = control.fork_scenario(control.current_version(), format!("delay {}", train))?;
    control.apply_perturbation(handle, Perturbation::DelayTrain { train_id: train.clone(), minutes: 15 })?;
    let result = control.save_scenario(handle, format!("Delay {} by 15 min", train))?;
    control.discard_scenario(handle)?;

    println!("{}: {} min total delay, status {}.", result.name, result.metrics.total_delay_minutes, result.status);
    control.export_timeline(io::stdout(), &network.window)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Conflicts { network } => {
            let control = generate_rail_control(&network, SharedClock::wall())?;
            print_conflicts(&control);
        }
        Command::ExportResources { network, from, to, output } => {
            let control = generate_rail_control(&network, SharedClock::wall())?;
            let window = TimeInterval::new(parse_minutes(&from)?, parse_minutes(&to)?);
            control.export_resources(writer(&output)?, &window)?;
        }
        Command::Simulate { network, scenario, commit, output } => simulate(&network, &scenario, commit, &output).await?,
        Command::Demo { seed, trains } => demo(seed, trains)?,
    }

    Ok(())
}
