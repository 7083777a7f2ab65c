//! 配置校验模块
//!
//! 校验规则：
//! - delay_threshold_ms > 0
//! - tick_interval_ms > 0 (若设置)
//! - session id 非空且唯一
//! - udp session 必须提供合法的 addr 参数

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{ContractError, DispatchBlueprint, SessionKind};

/// 校验 DispatchBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    validate_scheduler(blueprint)?;
    validate_session_ids(blueprint)?;
    validate_session_params(blueprint)?;
    Ok(())
}

/// 非致命问题 (不阻止加载)
pub fn warnings(blueprint: &DispatchBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let scheduler = &blueprint.scheduler;

    if let Some(tick) = scheduler.tick_interval_ms {
        if tick > scheduler.delay_threshold_ms {
            warnings.push(format!(
                "scheduler.tick_interval_ms ({tick}) exceeds delay_threshold_ms ({}) - dispatch latency may exceed twice the threshold",
                scheduler.delay_threshold_ms
            ));
        }
    }

    if blueprint.sessions.is_empty() {
        warnings.push("No sessions configured - nothing to dispatch to".to_string());
    }

    warnings
}

/// 校验调度器时间参数
fn validate_scheduler(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    let scheduler = &blueprint.scheduler;

    if scheduler.delay_threshold_ms == 0 {
        return Err(ContractError::config_validation(
            "scheduler.delay_threshold_ms",
            "delay_threshold_ms must be > 0",
        ));
    }

    if scheduler.tick_interval_ms == Some(0) {
        return Err(ContractError::config_validation(
            "scheduler.tick_interval_ms",
            "tick_interval_ms must be > 0",
        ));
    }

    Ok(())
}

/// 校验 session id 唯一性
fn validate_session_ids(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, session) in blueprint.sessions.iter().enumerate() {
        if session.id.is_empty() {
            return Err(ContractError::config_validation(
                format!("sessions[{}].id", idx),
                "session id cannot be empty",
            ));
        }
        if !seen.insert(&session.id) {
            return Err(ContractError::config_validation(
                format!("sessions[id={}]", session.id),
                "duplicate session id",
            ));
        }
    }
    Ok(())
}

/// 校验各类型 session 的参数
fn validate_session_params(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    for session in &blueprint.sessions {
        if session.kind != SessionKind::Udp {
            continue;
        }

        let field = format!("sessions[{}].params.addr", session.id);
        let addr = session
            .params
            .get("addr")
            .ok_or_else(|| ContractError::config_validation(&field, "udp session requires 'addr'"))?;

        addr.parse::<SocketAddr>().map_err(|e| {
            ContractError::config_validation(&field, format!("invalid address '{addr}': {e}"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SchedulerConfig, SessionConfig};
    use std::collections::HashMap;

    fn session(id: &str, kind: SessionKind) -> SessionConfig {
        SessionConfig {
            id: id.into(),
            kind,
            contact: None,
            params: HashMap::new(),
        }
    }

    fn minimal_blueprint() -> DispatchBlueprint {
        DispatchBlueprint {
            scheduler: SchedulerConfig::default(),
            sessions: vec![session("alice", SessionKind::Log)],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
        assert!(warnings(&bp).is_empty());
    }

    #[test]
    fn test_zero_threshold() {
        let mut bp = minimal_blueprint();
        bp.scheduler.delay_threshold_ms = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("delay_threshold_ms must be > 0"), "got: {err}");
    }

    #[test]
    fn test_zero_tick() {
        let mut bp = minimal_blueprint();
        bp.scheduler.tick_interval_ms = Some(0);
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("tick_interval_ms must be > 0"), "got: {err}");
    }

    #[test]
    fn test_duplicate_session_id() {
        let mut bp = minimal_blueprint();
        bp.sessions.push(session("alice", SessionKind::Log));
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate session id"), "got: {err}");
    }

    #[test]
    fn test_empty_session_id() {
        let mut bp = minimal_blueprint();
        bp.sessions[0].id = String::new();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_udp_session_requires_addr() {
        let mut bp = minimal_blueprint();
        bp.sessions.push(session("relay", SessionKind::Udp));
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("requires 'addr'"), "got: {err}");

        bp.sessions[1]
            .params
            .insert("addr".into(), "not-an-address".into());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("invalid address"), "got: {err}");

        bp.sessions[1]
            .params
            .insert("addr".into(), "127.0.0.1:9100".into());
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_slow_tick_is_only_a_warning() {
        let mut bp = minimal_blueprint();
        bp.scheduler.delay_threshold_ms = 100;
        bp.scheduler.tick_interval_ms = Some(300);
        assert!(validate(&bp).is_ok());
        let warnings = warnings(&bp);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("exceeds delay_threshold_ms"));
    }
}
