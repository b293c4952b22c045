/// Build version, overridable at compile time with `STATUSBOARD_VERSION`.
pub const VERSION: &str = match option_env!("STATUSBOARD_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// User-Agent sent with every outbound health probe.
pub fn probe_user_agent() -> String {
    format!("statusboard-probe/{VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_carries_version() {
        let agent = probe_user_agent();
        assert!(agent.starts_with("statusboard-probe/"));
        assert!(agent.ends_with(VERSION));
    }
}
