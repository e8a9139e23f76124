use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use bwstats::config::StatsConfig;
use bwstats::{MapStatsService, StatsRequest};

const USAGE: &str = "Usage: bwstats [--map-stats] [--map-csv] [--map-names] [--refresh] \
[--max-age-hours <n>] [--cache-dir <path>] [--names <path>]";

#[derive(Debug, Default)]
struct Cli {
    map_stats: bool,
    map_csv: bool,
    map_names: bool,
    refresh: bool,
    max_age: Option<Duration>,
    cache_dir: Option<PathBuf>,
    names: Option<PathBuf>,
}

fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("bwstats: error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = parse_cli(std::env::args().skip(1))?;
    if !(cli.map_stats || cli.map_csv || cli.map_names) {
        eprintln!("{USAGE}");
        return Ok(ExitCode::from(2));
    }

    let mut config = StatsConfig::from_env();
    if let Some(dir) = cli.cache_dir.clone() {
        config = config.with_cache_dir(dir);
    }
    if let Some(path) = cli.names.clone() {
        config = config.with_map_names_path(path);
    }
    if cli.refresh {
        config = config.with_use_cache(false);
    }

    let service = MapStatsService::from_config(&config)?;
    let request = StatsRequest {
        max_age: cli.max_age,
        use_cache: config.use_cache,
    };

    if cli.map_stats {
        let data = service.map_stats(request)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&data).context("serialize map stats")?
        );
    }

    if cli.map_csv || cli.map_names {
        let Some(diff) = service.map_names_diff(request)? else {
            eprintln!("bwstats: error: no map name updates are available");
            return Ok(ExitCode::FAILURE);
        };
        if cli.map_names {
            println!(
                "{}",
                serde_json::to_string_pretty(&diff).context("serialize map names")?
            );
        }
        if cli.map_csv {
            print!("{}", diff.to_csv()?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn parse_cli(mut args: impl Iterator<Item = String>) -> Result<Cli> {
    let mut cli = Cli::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--map-stats" => cli.map_stats = true,
            "--map-csv" => cli.map_csv = true,
            "--map-names" => cli.map_names = true,
            "--refresh" => cli.refresh = true,
            "--max-age-hours" => {
                let value = args.next().ok_or_else(|| anyhow!("missing value for --max-age-hours"))?;
                let hours = value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid --max-age-hours {value:?}"))?;
                let secs = hours
                    .checked_mul(60 * 60)
                    .ok_or_else(|| anyhow!("--max-age-hours {hours} is too large"))?;
                cli.max_age = Some(Duration::from_secs(secs));
            }
            "--cache-dir" => {
                let value = args.next().ok_or_else(|| anyhow!("missing value for --cache-dir"))?;
                cli.cache_dir = Some(PathBuf::from(value));
            }
            "--names" => {
                let value = args.next().ok_or_else(|| anyhow!("missing value for --names"))?;
                cli.names = Some(PathBuf::from(value));
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(anyhow!("unknown argument {other:?}\n{USAGE}")),
        }
    }
    Ok(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_flags_and_values() {
        let cli = parse_cli(args(&["--map-stats", "--max-age-hours", "6", "--cache-dir", "/tmp/c"]))
            .unwrap();
        assert!(cli.map_stats);
        assert!(!cli.map_csv);
        assert_eq!(cli.max_age, Some(Duration::from_secs(6 * 3600)));
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/c")));
    }

    #[test]
    fn rejects_unknown_and_incomplete_arguments() {
        assert!(parse_cli(args(&["--bogus"])).is_err());
        assert!(parse_cli(args(&["--names"])).is_err());
        assert!(parse_cli(args(&["--max-age-hours", "soon"])).is_err());
    }

    #[test]
    fn rejects_max_age_that_overflows() {
        let err = parse_cli(args(&["--map-stats", "--max-age-hours", "18446744073709551615"]))
            .unwrap_err();
        assert!(err.to_string().contains("too large"));
        let cli = parse_cli(args(&["--max-age-hours", "720"])).unwrap();
        assert_eq!(cli.max_age, Some(Duration::from_secs(720 * 3600)));
    }
}
