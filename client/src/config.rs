use std::{env, path::PathBuf};

pub const DEFAULT_SIGNIN_URL: &str = "https://learn.zone01oujda.ma/api/auth/signin";
pub const DEFAULT_GRAPHQL_URL: &str = "https://learn.zone01oujda.ma/api/graphql-engine/v1/graphql";

#[derive(Debug, Clone)]
pub struct Config {
    pub signin_url: String,
    pub graphql_url: String,
    pub session_file: PathBuf,
}

impl Config {
    /// Reads `XP_SIGNIN_URL`, `XP_GRAPHQL_URL` and `XP_SESSION_FILE`, after
    /// loading a `.env` file when one is present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let session_file = match non_empty("XP_SESSION_FILE") {
            Some(path) => PathBuf::from(path),
            None => match non_empty("HOME") {
                Some(home) => PathBuf::from(home).join(".xp-dashboard").join("session.json"),
                None => PathBuf::from(".xp-session.json"),
            },
        };
        Self {
            signin_url: non_empty("XP_SIGNIN_URL").unwrap_or_else(|| DEFAULT_SIGNIN_URL.to_string()),
            graphql_url: non_empty("XP_GRAPHQL_URL")
                .unwrap_or_else(|| DEFAULT_GRAPHQL_URL.to_string()),
            session_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_the_zone01_endpoints() {
        let cfg = Config::from_lookup(|key| (key == "HOME").then(|| "/home/dev".to_string()));
        assert_eq!(cfg.signin_url, DEFAULT_SIGNIN_URL);
        assert_eq!(cfg.graphql_url, DEFAULT_GRAPHQL_URL);
        assert_eq!(cfg.session_file, PathBuf::from("/home/dev/.xp-dashboard/session.json"));
    }

    #[test]
    fn overrides_win_and_blanks_are_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("XP_SIGNIN_URL", "http://localhost:9000/signin"),
            ("XP_GRAPHQL_URL", "  "),
            ("XP_SESSION_FILE", "/tmp/s.json"),
        ]);
        let cfg = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.signin_url, "http://localhost:9000/signin");
        assert_eq!(cfg.graphql_url, DEFAULT_GRAPHQL_URL);
        assert_eq!(cfg.session_file, PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn no_home_falls_back_to_working_directory() {
        let cfg = Config::from_lookup(|_| None);
        assert_eq!(cfg.session_file, PathBuf::from(".xp-session.json"));
    }
}
