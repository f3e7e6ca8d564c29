use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::process;

use openports::{
    config::{parse_port_list, PortMode, ScanConfig},
    output::{OutputConfig, OutputFormat, OutputManager},
    scanner::ScanEngine,
    top_ports::{get_port_list, PortListType},
    utils::{config::ConfigValidator, FdLimit, Logger},
    CancellationToken,
};

fn build_cli() -> Command {
    Command::new("openports")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Find which ip:port endpoints on this host's IPv4 interfaces accept TCP connections")
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("MODE")
                .help("Port set to probe: 'common' (curated list) or 'full' (1-65535)")
                .value_parser(["common", "full"]),
        )
        .arg(
            Arg::new("ports")
                .short('p')
                .long("ports")
                .value_name("PORTS")
                .help("Comma separated ports to probe (implies --mode common)")
                .conflicts_with("preset"),
        )
        .arg(
            Arg::new("preset")
                .long("preset")
                .value_name("NAME")
                .help("Named port list: common, web, database, mail, development (implies --mode common)"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("MS")
                .help("Per-probe connect timeout in milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("max-in-flight")
                .short('b')
                .long("max-in-flight")
                .value_name("N")
                .help("Maximum number of probes in flight at once")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file (default: ~/.openports.toml)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FORMAT")
                .help("Output format: text, json, greppable")
                .default_value("text"),
        )
        .arg(
            Arg::new("file")
                .long("file")
                .value_name("PATH")
                .help("Write results to a file instead of stdout"),
        )
        .arg(
            Arg::new("ulimit")
                .short('u')
                .long("ulimit")
                .value_name("LIMIT")
                .help("Raise the open file limit to this value before scanning")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v info, -vv debug)")
                .action(ArgAction::Count),
        )
}

/// Defaults, then config file, then environment, then flags
fn resolve_config(matches: &ArgMatches) -> anyhow::Result<ScanConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ScanConfig::from_toml_file(path)?,
        None => ScanConfig::load_default_config(),
    };
    config.apply_env();

    if let Some(mode) = matches.get_one::<String>("mode") {
        config.port_mode = mode.parse()?;
    }

    if let Some(ports) = matches.get_one::<String>("ports") {
        config.common_ports = parse_port_list(ports)?;
        config.port_mode = PortMode::Common;
    }

    if let Some(preset) = matches.get_one::<String>("preset") {
        let kind: PortListType = preset.parse()?;
        config.common_ports = get_port_list(kind);
        config.port_mode = PortMode::Common;
    }

    if let Some(&timeout) = matches.get_one::<u64>("timeout") {
        config.timeout = timeout;
    }

    if let Some(&max_in_flight) = matches.get_one::<usize>("max-in-flight") {
        config.max_in_flight = max_in_flight;
    }

    config.validate()?;
    Ok(config)
}

async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    let colored_output = !matches.get_flag("no-color");
    if !colored_output {
        colored::control::set_override(false);
    }

    let config = resolve_config(&matches)?;

    if let Some(&limit) = matches.get_one::<u64>("ulimit") {
        if let Some(effective) = FdLimit::raise(limit) {
            eprintln!(
                "{} {}",
                "[~] Open file limit is now".bright_blue(),
                effective.to_string().bright_cyan().bold()
            );
        }
    }

    for warning in ConfigValidator::system_warnings(&config) {
        eprintln!("{} {}", "[!]".bright_yellow(), warning);
    }

    let format: OutputFormat = matches
        .get_one::<String>("output")
        .map(|s| s.parse::<OutputFormat>())
        .transpose()?
        .unwrap_or_default();
    let output = OutputManager::new(OutputConfig {
        format,
        file: matches.get_one::<String>("file").cloned(),
        colored: colored_output,
    });

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "[!] Interrupted, waiting for in-flight probes".bright_yellow());
            ctrl_c_token.cancel();
        }
    });

    if format == OutputFormat::Text {
        eprintln!(
            "{} {} mode, {} in flight, {}ms timeout",
            "[~] Scanning local interfaces:".bright_blue(),
            config.port_mode.to_string().bright_cyan(),
            config.max_in_flight,
            config.timeout
        );
    }

    let engine = ScanEngine::new(config)?.with_cancellation(token);
    let result = engine.scan().await?;
    output.write_results(&result)?;

    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();
    Logger::init(Logger::level_from_verbosity(matches.get_count("verbose")));

    if let Err(e) = run(matches).await {
        eprintln!("{} {}", "[!] ERROR:".bright_red(), e);
        process::exit(1);
    }
}
