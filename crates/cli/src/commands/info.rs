//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{DispatchBlueprint, SessionConfig};

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    scheduler: SchedulerInfo,
    session_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sessions: Vec<SessionInfo>,
}

#[derive(Serialize)]
struct SchedulerInfo {
    delay_threshold_ms: u64,
    tick_interval_ms: u64,
    /// Upper bound on enqueue-to-send latency
    max_latency_ms: u64,
    shutdown_policy: String,
}

#[derive(Serialize)]
struct SessionInfo {
    id: String,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    capabilities: Option<String>,
    #[serde(skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    params: std::collections::BTreeMap<String, String>,
}

impl SessionInfo {
    fn from_config(session: &SessionConfig) -> Self {
        let contact = session.contact.as_ref();
        Self {
            id: session.id.clone(),
            kind: format!("{:?}", session.kind),
            endpoint: contact.map(|c| c.endpoint.id.clone()),
            display_name: contact
                .map(|c| c.display_name.clone())
                .filter(|name| !name.is_empty()),
            presence: contact.map(|c| format!("{:?}", c.presence)),
            capabilities: contact.map(|c| c.endpoint.capabilities.to_string()),
            params: session
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &DispatchBlueprint, args: &InfoArgs) -> ConfigInfo {
    let scheduler = &blueprint.scheduler;
    let threshold_ms = scheduler.delay_threshold_ms;
    let tick_ms = scheduler.tick_interval().as_millis() as u64;

    let sessions = if args.sessions {
        blueprint.sessions.iter().map(SessionInfo::from_config).collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        scheduler: SchedulerInfo {
            delay_threshold_ms: threshold_ms,
            tick_interval_ms: tick_ms,
            max_latency_ms: threshold_ms + tick_ms,
            shutdown_policy: format!("{:?}", scheduler.shutdown_policy),
        },
        session_count: blueprint.sessions.len(),
        sessions,
    }
}

fn print_config_info(blueprint: &DispatchBlueprint, args: &InfoArgs) {
    let info = build_config_info(blueprint, args);

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  dispatchq Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Scheduler");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Delay threshold: {} ms", info.scheduler.delay_threshold_ms);
    println!("   ├─ Tick interval: {} ms", info.scheduler.tick_interval_ms);
    println!("   ├─ Latency bound: < {} ms", info.scheduler.max_latency_ms);
    println!("   └─ Shutdown policy: {}", info.scheduler.shutdown_policy);

    println!("\nSessions ({})", info.session_count);
    for (i, session) in blueprint.sessions.iter().enumerate() {
        let is_last = i == blueprint.sessions.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({:?})", prefix, session.id, session.kind);

        if !args.sessions {
            continue;
        }
        if let Some(contact) = &session.contact {
            println!(
                "   {}  - Endpoint: {} [{}]",
                child_prefix, contact.endpoint.id, contact.endpoint.capabilities
            );
            println!(
                "   {}  - Presence: {:?}{}",
                child_prefix,
                contact.presence,
                if contact.idle { " (idle)" } else { "" }
            );
        }
        let mut params: Vec<_> = session.params.iter().collect();
        params.sort();
        for (key, value) in params {
            println!("   {}  - {}: {}", child_prefix, key, value);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Capabilities, Contact, Endpoint, PresenceState, SessionKind};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn blueprint() -> DispatchBlueprint {
        DispatchBlueprint {
            sessions: vec![SessionConfig {
                id: "alice".to_string(),
                kind: SessionKind::Udp,
                contact: Some(Contact {
                    endpoint: Endpoint::new("alice@example.com")
                        .with_capabilities(Capabilities::P2P_AWARE),
                    display_name: "Alice".to_string(),
                    client_type: String::new(),
                    idle: false,
                    presence: PresenceState::Busy,
                }),
                params: HashMap::from([("addr".to_string(), "127.0.0.1:7000".to_string())]),
            }],
            ..Default::default()
        }
    }

    fn info_args(sessions: bool) -> InfoArgs {
        InfoArgs {
            config: PathBuf::from("dispatchq.toml"),
            json: true,
            sessions,
        }
    }

    #[test]
    fn test_build_config_info_with_sessions() {
        let info = build_config_info(&blueprint(), &info_args(true));
        assert_eq!(info.scheduler.delay_threshold_ms, 5000);
        assert_eq!(info.scheduler.max_latency_ms, 10_000);
        assert_eq!(info.sessions.len(), 1);

        let session = &info.sessions[0];
        assert_eq!(session.endpoint.as_deref(), Some("alice@example.com"));
        assert_eq!(session.presence.as_deref(), Some("Busy"));
        assert_eq!(session.capabilities.as_deref(), Some("0x00080000"));
        assert_eq!(session.params.get("addr").map(String::as_str), Some("127.0.0.1:7000"));
    }

    #[test]
    fn test_sessions_hidden_by_default() {
        let info = build_config_info(&blueprint(), &info_args(false));
        assert_eq!(info.session_count, 1);
        assert!(info.sessions.is_empty());

        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("\"sessions\""));
    }
}
