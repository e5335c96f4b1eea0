use std::net::SocketAddr;
use std::time::Duration;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::ClusterArgs;
use crate::domain::validate_region_name;
use crate::error::{AppError, AppResult, ConfigError};

use super::types::{ConfigFile, ControllerSettings, DurationValue, Intervals};

/// Applies configuration values to CLI arguments. Values given on the
/// command line win.
///
/// # Errors
///
/// Returns an error when a configured duration is invalid.
pub fn apply_config(
    args: &mut ClusterArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "region")
        && let Some(region) = config.region.clone()
    {
        args.region = Some(region);
    }

    if !is_cli(matches, "regions")
        && let Some(regions) = config.regions.clone()
    {
        args.regions = regions;
    }

    if !is_cli(matches, "database")
        && let Some(database) = config.database.clone()
    {
        args.database = database;
    }

    if !is_cli(matches, "agent_listen")
        && let Some(agent_listen) = config.agent_listen.clone()
    {
        args.agent_listen = agent_listen;
    }

    if !is_cli(matches, "max_agents_per_console")
        && let Some(max_agents) = config.max_agents_per_console
    {
        args.max_agents_per_console = max_agents;
    }

    let Some(intervals) = config.intervals.as_ref() else {
        return Ok(());
    };
    let fields: [(&'static str, &'static str, &Option<DurationValue>, &mut Duration); 9] = [
        (
            "reconcile_interval",
            "intervals.reconcile",
            &intervals.reconcile,
            &mut args.reconcile_interval,
        ),
        (
            "drain_interval",
            "intervals.drain",
            &intervals.drain,
            &mut args.drain_interval,
        ),
        (
            "poll_interval",
            "intervals.poll",
            &intervals.poll,
            &mut args.poll_interval,
        ),
        (
            "region_announce_interval",
            "intervals.region_announce",
            &intervals.region_announce,
            &mut args.region_announce_interval,
        ),
        (
            "request_ttl",
            "intervals.request_ttl",
            &intervals.request_ttl,
            &mut args.request_ttl,
        ),
        (
            "monitoring_target_ttl",
            "intervals.monitoring_target_ttl",
            &intervals.monitoring_target_ttl,
            &mut args.monitoring_target_ttl,
        ),
        (
            "snapshot_ttl",
            "intervals.snapshot_ttl",
            &intervals.snapshot_ttl,
            &mut args.snapshot_ttl,
        ),
        (
            "region_ttl",
            "intervals.region_ttl",
            &intervals.region_ttl,
            &mut args.region_ttl,
        ),
        (
            "snapshot_timeout",
            "intervals.snapshot_timeout",
            &intervals.snapshot_timeout,
            &mut args.snapshot_timeout,
        ),
    ];
    for (arg_id, field, value, target) in fields {
        if is_cli(matches, arg_id) {
            continue;
        }
        if let Some(value) = value {
            *target = value.to_duration().map_err(|err| {
                AppError::config(ConfigError::InvalidDuration { field, source: err })
            })?;
        }
    }
    Ok(())
}

/// Validates merged arguments into controller settings.
///
/// # Errors
///
/// Returns an error when the region is missing or malformed, the listen
/// address does not parse, or the request TTL would not survive a drain.
pub fn resolve_settings(args: &ClusterArgs) -> AppResult<ControllerSettings> {
    let region = args
        .region
        .as_deref()
        .map(str::trim)
        .filter(|region| !region.is_empty())
        .ok_or_else(|| AppError::config(ConfigError::MissingRegion))?
        .to_owned();

    let mut regions = Vec::with_capacity(args.regions.len().saturating_add(1));
    for candidate in args.regions.iter().chain(std::iter::once(&region)) {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            continue;
        }
        validate_region_name(candidate)
            .map_err(|err| AppError::config(ConfigError::InvalidRegion { source: err }))?;
        regions.push(candidate.to_owned());
    }
    regions.sort();
    regions.dedup();

    let agent_listen: SocketAddr = args.agent_listen.trim().parse().map_err(|err| {
        AppError::config(ConfigError::InvalidListenAddr {
            value: args.agent_listen.clone(),
            source: err,
        })
    })?;

    if args.max_agents_per_console == 0 {
        return Err(AppError::config(ConfigError::MaxAgentsPerConsoleZero));
    }

    let intervals = Intervals {
        reconcile: args.reconcile_interval,
        drain: args.drain_interval,
        poll: args.poll_interval,
        region_announce: args.region_announce_interval,
        request_ttl: args.request_ttl,
        monitoring_target_ttl: args.monitoring_target_ttl,
        snapshot_ttl: args.snapshot_ttl,
        region_ttl: args.region_ttl,
        snapshot_timeout: args.snapshot_timeout,
    };
    if intervals.request_ttl <= intervals.drain {
        return Err(AppError::config(ConfigError::RequestTtlTooShort {
            ttl_ms: intervals.request_ttl.as_millis(),
            drain_ms: intervals.drain.as_millis(),
        }));
    }
    if intervals.region_ttl <= intervals.region_announce {
        return Err(AppError::config(ConfigError::RegionTtlTooShort {
            ttl_ms: intervals.region_ttl.as_millis(),
            announce_ms: intervals.region_announce.as_millis(),
        }));
    }

    Ok(ControllerSettings {
        region,
        regions,
        database: args.database.clone(),
        agent_listen,
        max_agents_per_console: args.max_agents_per_console,
        intervals,
    })
}

/// Set on the command line or through its environment variable.
fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}
