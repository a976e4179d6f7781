//! loadmore - Entry Point

use clap::Parser;
use loadmore::config::loader::{parse_first_intersection, ResolvedConfig};
use loadmore::scenario::{runner, Scenario};
use loadmore::state::settings::SentinelPlacement;
use std::path::PathBuf;
use tracing::info;

/// loadmore - replay infinite-scroll scenarios against the pagination controller
#[derive(Parser, Debug)]
#[command(name = "loadmore")]
#[command(version)]
#[command(about = "Replay host events against the incremental-pagination controller")]
pub struct Args {
    /// Path to a JSON scenario file
    pub scenario: PathBuf,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the trace as JSON instead of one line per event
    #[arg(long)]
    pub json: bool,

    /// Whether the first intersection callback after mount may emit
    #[arg(long, value_parser = ["suppress", "deliver"])]
    pub first_intersection: Option<String>,

    /// Share one sentinel between result-stream containers
    #[arg(long)]
    pub shared_sentinel: bool,
}

fn resolve_config(args: &Args) -> Result<ResolvedConfig, Box<dyn std::error::Error>> {
    // Defaults → Config File → Env Vars → CLI Args
    let config_file = loadmore::config::load_config_with_precedence(args.config.clone())?;
    let merged = loadmore::config::merge_config(config_file)?;
    let with_env = loadmore::config::apply_env_overrides(merged)?;

    let policy_override = args
        .first_intersection
        .as_deref()
        .map(|raw| parse_first_intersection("--first-intersection", raw))
        .transpose()?;
    let placement_override = args.shared_sentinel.then_some(SentinelPlacement::Shared);

    Ok(loadmore::config::apply_cli_overrides(
        with_env,
        policy_override,
        placement_override,
    ))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    loadmore::logging::init(&config.log_file_path)?;

    info!(
        config = ?config,
        "Configuration loaded and resolved"
    );

    let scenario = Scenario::load(&args.scenario)?;
    info!(
        scenario = ?args.scenario,
        steps = scenario.steps.len(),
        "Replaying scenario"
    );

    let report = runner::run(&scenario, &config.controller_settings());

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_lines());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use loadmore::observer::FirstIntersectionPolicy;

    #[test]
    fn test_help_does_not_error() {
        let result = Args::try_parse_from(["loadmore", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_does_not_error() {
        let result = Args::try_parse_from(["loadmore", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_scenario_is_required() {
        let result = Args::try_parse_from(["loadmore"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["loadmore", "paging.json"]);
        assert_eq!(args.scenario, PathBuf::from("paging.json"));
        assert_eq!(args.config, None);
        assert!(!args.json);
        assert_eq!(args.first_intersection, None);
        assert!(!args.shared_sentinel);
    }

    #[test]
    fn test_combined_flags() {
        let args = Args::parse_from([
            "loadmore",
            "--json",
            "--first-intersection",
            "deliver",
            "--shared-sentinel",
            "--config",
            "/custom/config.toml",
            "paging.json",
        ]);
        assert!(args.json);
        assert_eq!(args.first_intersection.as_deref(), Some("deliver"));
        assert!(args.shared_sentinel);
        assert_eq!(args.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_first_intersection_invalid_rejects() {
        let result =
            Args::try_parse_from(["loadmore", "--first-intersection", "sometimes", "x.json"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::InvalidValue
        );
    }

    #[test]
    fn test_cli_flags_override_resolved_config() {
        use loadmore::config::{apply_cli_overrides, merge_config};

        let merged = merge_config(None).unwrap();
        let args = Args::parse_from([
            "loadmore",
            "--first-intersection",
            "deliver",
            "--shared-sentinel",
            "x.json",
        ]);
        let policy = args
            .first_intersection
            .as_deref()
            .map(|raw| parse_first_intersection("--first-intersection", raw).unwrap());

        let resolved = apply_cli_overrides(
            merged,
            policy,
            args.shared_sentinel.then_some(SentinelPlacement::Shared),
        );
        assert_eq!(resolved.first_intersection, FirstIntersectionPolicy::Deliver);
        assert_eq!(resolved.sentinel_placement, SentinelPlacement::Shared);
    }
}
