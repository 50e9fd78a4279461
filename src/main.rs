use clap::{Parser, ValueEnum};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::{info, LevelFilter};
use std::fs;
use std::path::PathBuf;

use trafficsim::routing::{EarParams, MoraParams, RoutingMethod};
use trafficsim::topology::Topology;
use trafficsim::{config_loader, report, scenario};

/// Routing method names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    #[value(name = "Dijkstra", alias = "dijkstra")]
    Dijkstra,
    #[value(name = "EAR", alias = "ear")]
    Ear,
    #[value(name = "MORA", alias = "mora")]
    Mora,
    #[value(name = "HopByHop", alias = "hop-by-hop")]
    HopByHop,
}

impl MethodArg {
    /// The configured method if it is the same kind, otherwise defaults
    fn resolve(self, configured: RoutingMethod) -> RoutingMethod {
        match (self, configured) {
            (MethodArg::Dijkstra, _) => RoutingMethod::Dijkstra,
            (MethodArg::HopByHop, _) => RoutingMethod::HopByHop,
            (MethodArg::Ear, RoutingMethod::Ear(params)) => RoutingMethod::Ear(params),
            (MethodArg::Ear, _) => RoutingMethod::Ear(EarParams::default()),
            (MethodArg::Mora, RoutingMethod::Mora(params)) => RoutingMethod::Mora(params),
            (MethodArg::Mora, _) => RoutingMethod::Mora(MoraParams::default()),
        }
    }
}

/// Traffic engineering testbed: route flows over a topology and fail nodes under it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the run configuration YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory for the topology snapshot and reports
    #[arg(short, long, default_value = "trafficsim_output")]
    output: PathBuf,

    /// Routing method, overriding the configuration
    #[arg(short, long, value_enum)]
    method: Option<MethodArg>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // RUST_LOG wins; otherwise the configured level applies once the config is read
    let level_from_env = std::env::var_os("RUST_LOG").is_some();
    env_logger::Builder::from_env(Env::default().default_filter_or("trace")).init();
    if !level_from_env {
        log::set_max_level(LevelFilter::Info);
    }

    let mut config = config_loader::load_config(&args.config)?;
    if !level_from_env {
        log::set_max_level(config.log_level().parse().unwrap_or(LevelFilter::Info));
    }

    info!("Starting trafficsim");
    info!("Configuration file: {:?}", args.config);
    info!("Output directory: {:?}", args.output);

    if let Some(threads) = config.general.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .wrap_err("Failed to configure the worker thread pool")?;
        info!("Using {} worker threads", threads);
    }

    if let Some(method) = args.method {
        config.routing = method.resolve(config.routing.clone());
        info!("Routing method overridden to {}", config.routing);
    }

    let descriptor_path = config_loader::resolve_relative(&args.config, &config.topology.path);
    let descriptor = config_loader::load_topology_descriptor(&descriptor_path, config.topology.bidirectional)?;

    if let Some(flows_path) = &config.scenario.flows_path {
        let flows = config_loader::load_flows(&config_loader::resolve_relative(&args.config, flows_path))?;
        config.scenario.flows.extend(flows);
        config.validate()?;
    }

    let mut topology = Topology::from_descriptor(&config.general.name, &descriptor, config.routing_method())
        .wrap_err_with(|| format!("Failed to build topology from '{}'", descriptor_path.display()))?;

    let outcome = scenario::run(&mut topology, &config.scenario)?;

    fs::create_dir_all(&args.output)
        .wrap_err_with(|| format!("Failed to create output directory '{}'", args.output.display()))?;
    topology
        .snapshot()
        .write_to_dir(&args.output.join("snapshot"))
        .wrap_err("Failed to write topology snapshot")?;
    report::generate_json_report(&outcome, &args.output.join("report.json"))?;
    report::generate_text_report(&outcome, &args.output.join("report.txt"))?;
    report::print_summary(&outcome);

    info!("Run completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["trafficsim", "--config", "test.yaml"]);

        assert_eq!(args.config, PathBuf::from("test.yaml"));
        assert_eq!(args.output, PathBuf::from("trafficsim_output"));
        assert_eq!(args.method, None);
    }

    #[test]
    fn test_method_override() {
        let args = Args::parse_from(["trafficsim", "-c", "test.yaml", "--method", "EAR"]);
        assert_eq!(args.method, Some(MethodArg::Ear));
        assert!(Args::try_parse_from(["trafficsim", "-c", "test.yaml", "--method", "OSPF"]).is_err());
    }

    #[test]
    fn test_configured_levels_parse() {
        for level in ["off", "error", "warn", "info", "debug", "trace", "DEBUG"] {
            assert!(level.parse::<LevelFilter>().is_ok(), "{}", level);
        }
    }

    #[test]
    fn test_override_keeps_matching_params() {
        let tuned = RoutingMethod::Mora(MoraParams {
            generations: 3,
            ..MoraParams::default()
        });
        assert_eq!(MethodArg::Mora.resolve(tuned.clone()), tuned);
        assert_eq!(
            MethodArg::Ear.resolve(tuned),
            RoutingMethod::Ear(EarParams::default())
        );
    }
}
