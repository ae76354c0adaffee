use std::path::PathBuf;

/// Server-wide configuration, assembled once at startup from environment
/// variables. There is no config file — the donor's layered `Config`
/// aggregate (TOML + env + defaults) is overkill for the handful of knobs
/// this server exposes, so env vars with defaults stand alone.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    pub port: u16,
    pub base_paths: Vec<PathBuf>,
    pub static_dir: Option<PathBuf>,
}

const DEFAULT_PORT: u16 = 3000;

impl FleetConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let port = std::env::var("FLEET_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let base_paths = std::env::var("FLEET_BASE_PATHS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(expand_tilde)
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| vec![default_base_path()]);

        let static_dir = std::env::var("FLEET_STATIC_DIR").ok().map(PathBuf::from);

        Self {
            port,
            base_paths,
            static_dir,
        }
    }
}

fn default_base_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("projects")
}

fn expand_tilde(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_when_unset() {
        std::env::remove_var("FLEET_PORT");
        let cfg = FleetConfig::from_env();
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn expands_tilde_in_base_paths() {
        let expanded = expand_tilde("~/foo/bar");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("foo/bar"));
        }
    }

    #[test]
    fn literal_path_untouched() {
        let expanded = expand_tilde("/abs/path");
        assert_eq!(expanded, PathBuf::from("/abs/path"));
    }
}
