use std::path::Path;

use anyhow::{bail, Context, Result};
use lineage_device_report::logging::init_logging;
use lineage_device_report::{load_config, run_report, DirectorySource, ReportConfig, RunSummary};

fn usage() -> &'static str {
    "Usage:\n  lineage-report [run] [<config.toml>] [--verbose]\n  lineage-report check <config.toml>"
}

fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = take_flag(&mut args, "--verbose") | take_flag(&mut args, "-v");

    match args.as_slice() {
        [] => run(None, verbose),
        [run_cmd] if run_cmd == "run" => run(None, verbose),
        [run_cmd, config] if run_cmd == "run" => run(Some(Path::new(config)), verbose),
        [check, config] if check == "check" => check_config(Path::new(config)),
        [help] if help == "--help" || help == "-h" => {
            println!("{}", usage());
            Ok(())
        }
        [config] if !config.starts_with('-') => run(Some(Path::new(config)), verbose),
        _ => bail!(usage()),
    }
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|arg| arg != flag);
    args.len() != before
}

fn resolve_config(config_path: Option<&Path>) -> Result<ReportConfig> {
    match config_path {
        Some(path) => load_config(path),
        None => {
            let config = ReportConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn run(config_path: Option<&Path>, verbose: bool) -> Result<()> {
    init_logging(verbose)?;
    let config = resolve_config(config_path)?;
    let source = DirectorySource::new(&config.input_dir);

    let summary = run_report(&config, &source)
        .with_context(|| format!("generating report from '{}'", config.input_dir.display()))?;
    print_summary(&summary);
    Ok(())
}

fn check_config(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let lines = config
        .release_lines
        .iter()
        .map(|line| line.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "[report:check] {} ok: lines {}; input '{}'; output '{}'",
        config_path.display(),
        lines,
        config.input_dir.display(),
        config.output_dir.display()
    );
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    for (line, count) in &summary.included {
        println!("[report:{line}] {count} devices included");
    }
    println!(
        "[report] {} devices loaded, {} skipped pairs, {} load errors; report at {}",
        summary.devices_loaded,
        summary.skipped,
        summary.load_errors,
        summary.artifacts.dir.display()
    );
}
