//! Shared helpers.

pub mod testing;

/// Expand environment variables in a path string.
///
/// Supports `$VAR`, `${VAR}`, and `~`. Returns the input unchanged when a
/// referenced variable is not set.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_tilde_when_expanding_then_home_dir() {
        let home = std::env::var("HOME").expect("HOME should be set");
        assert_eq!(expand_env_vars("~/logs"), format!("{}/logs", home));
    }

    #[test]
    fn given_unset_variable_when_expanding_then_unchanged() {
        assert_eq!(
            expand_env_vars("$LOGSMITH_SURELY_UNSET_VAR/x"),
            "$LOGSMITH_SURELY_UNSET_VAR/x"
        );
    }
}
