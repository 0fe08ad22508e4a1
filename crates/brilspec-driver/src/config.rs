use std::env;

use brilspec_passes::{EffectPolicy, InjectOptions, NamingMode};

use crate::BrilspecError;

pub const INLINE_NAMING_VAR: &str = "BRILSPEC_INLINE_NAMING";
pub const SPECULATIVE_EFFECTS_VAR: &str = "BRILSPEC_SPECULATIVE_EFFECTS";
pub const TRACE_TIMING_VAR: &str = "BRILSPEC_TRACE_TIMING";

/// Run configuration, read once from the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub inject: InjectOptions,
    /// Print per-phase wall time to stderr.
    pub trace_timing: bool,
}

impl Options {
    pub fn from_env() -> Result<Self, BrilspecError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BrilspecError> {
        let naming = match lookup(INLINE_NAMING_VAR).as_deref().map(str::trim) {
            None | Some("") | Some("hygienic") => NamingMode::Hygienic,
            Some("verbatim") => NamingMode::Verbatim,
            Some(other) => return Err(invalid(INLINE_NAMING_VAR, other, "hygienic|verbatim")),
        };
        let effects = match lookup(SPECULATIVE_EFFECTS_VAR).as_deref().map(str::trim) {
            None | Some("") | Some("allow") => EffectPolicy::Allow,
            Some("reject") => EffectPolicy::Reject,
            Some(other) => return Err(invalid(SPECULATIVE_EFFECTS_VAR, other, "allow|reject")),
        };
        let trace_timing = lookup(TRACE_TIMING_VAR).is_some_and(|v| v == "1");
        Ok(Self {
            inject: InjectOptions { naming, effects },
            trace_timing,
        })
    }
}

fn invalid(var: &str, value: &str, expected: &str) -> BrilspecError {
    BrilspecError::Config(format!("{var}={value:?} is not one of {expected}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(vars: &[(&str, &str)]) -> Result<Options, BrilspecError> {
        Options::from_lookup(|key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        })
    }

    #[test]
    fn unset_environment_gives_defaults() {
        let opts = options(&[]).expect("defaults");
        assert_eq!(opts, Options::default());
        assert_eq!(opts.inject.naming, NamingMode::Hygienic);
        assert_eq!(opts.inject.effects, EffectPolicy::Allow);
        assert!(!opts.trace_timing);
    }

    #[test]
    fn variables_select_modes() {
        let opts = options(&[
            (INLINE_NAMING_VAR, "verbatim"),
            (SPECULATIVE_EFFECTS_VAR, " reject "),
            (TRACE_TIMING_VAR, "1"),
        ])
        .expect("options");
        assert_eq!(opts.inject.naming, NamingMode::Verbatim);
        assert_eq!(opts.inject.effects, EffectPolicy::Reject);
        assert!(opts.trace_timing);
    }

    #[test]
    fn timing_needs_exactly_one() {
        let opts = options(&[(TRACE_TIMING_VAR, "yes")]).expect("options");
        assert!(!opts.trace_timing);
    }

    #[test]
    fn unknown_value_is_a_config_error() {
        let err = options(&[(INLINE_NAMING_VAR, "fresh")]).expect_err("bad naming");
        assert!(matches!(err, BrilspecError::Config(_)));
        assert_eq!(
            err.to_string(),
            "Config error: BRILSPEC_INLINE_NAMING=\"fresh\" is not one of hygienic|verbatim"
        );
    }
}
