use std::time::Duration;

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub retry_backoff_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 0,
            retry_backoff_ms: 250,
        }
    }
}

/// Deadline and sample interval for the `CREATE DATABASE` status poll.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PollSettings {
    /// Wall-clock budget measured from the first sample.
    pub deadline: Duration,
    /// Pause between two samples.
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(5 * 60),
            interval: Duration::from_secs(5),
        }
    }
}

/// Controls how test databases are named and how long creation may take.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionOptions {
    /// Leading component of generated database names.
    pub product: String,
    /// Host identifier embedded in generated names. Falls back to the
    /// connection's `host` option, then to the machine hostname.
    pub host: Option<String>,
    pub poll: PollSettings,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            product: "mssqlcli".to_owned(),
            host: None,
            poll: PollSettings::default(),
        }
    }
}

impl ProvisionOptions {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub(crate) fn resolved_host(&self, configured: Option<&str>) -> String {
        [self.host.as_deref(), configured]
            .into_iter()
            .flatten()
            .map(str::to_owned)
            .find(|host| !host.trim().is_empty())
            .or_else(machine_hostname)
            .unwrap_or_else(|| "localhost".to_owned())
    }
}

fn machine_hostname() -> Option<String> {
    gethostname::gethostname()
        .into_string()
        .ok()
        .filter(|host| !host.trim().is_empty())
}
