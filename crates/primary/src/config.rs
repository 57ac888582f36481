use core_types::ReportPolicy;

pub const REPORT_BEFORE_ENV: &str = "DOM_MIRROR_REPORT_BEFORE";

/// Install-time options for the interceptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InterceptConfig {
    pub policy: ReportPolicy,
}

impl InterceptConfig {
    pub fn with_policy(policy: ReportPolicy) -> Self {
        Self { policy }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unrecognised values keep the default and are logged.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(REPORT_BEFORE_ENV) {
            match parse_flag(&raw) {
                Some(true) => config.policy = ReportPolicy::ReportBefore,
                Some(false) => config.policy = ReportPolicy::ReportAfter,
                None => log::warn!(
                    target: "mirror.intercept",
                    "ignoring {REPORT_BEFORE_ENV}={raw:?}: expected a boolean"
                ),
            }
        }
        config
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
