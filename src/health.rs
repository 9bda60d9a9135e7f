use serde::Serialize;
use std::time::Duration;

/// Point-in-time view of the process, sampled on the health timer and sent
/// to the admin chat. Transient; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
    pub threads: u64,
    pub uptime_secs: u64,
}

impl HealthSnapshot {
    /// Sample memory and thread figures from `/proc/self/status`. Fields
    /// missing on non-Linux hosts read as zero; the report still goes out.
    pub fn capture(uptime: Duration) -> Self {
        let status = std::fs::read_to_string("/proc/self/status").unwrap_or_default();
        Self::from_proc_status(&status, uptime)
    }

    fn from_proc_status(status: &str, uptime: Duration) -> Self {
        HealthSnapshot {
            rss_bytes: read_kib_field(status, "VmRSS:") * 1024,
            virtual_bytes: read_kib_field(status, "VmSize:") * 1024,
            threads: read_kib_field(status, "Threads:"),
            uptime_secs: uptime.as_secs(),
        }
    }

    pub fn report(&self) -> String {
        format!(
            "Bot instance stats:\n\tRSS = {} MiB\n\tVirtual = {} MiB\n\tThreads = {}\n\tUptime = {}",
            to_mib(self.rss_bytes),
            to_mib(self.virtual_bytes),
            self.threads,
            format_uptime(self.uptime_secs)
        )
    }
}

/// Read the numeric value of a `Key:  12345 kB`-style line. Also works for
/// unitless fields like `Threads:`.
fn read_kib_field(status: &str, key: &str) -> u64 {
    status
        .lines()
        .find(|line| line.starts_with(key))
        .and_then(|line| line[key.len()..].split_whitespace().next())
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

fn to_mib(bytes: u64) -> u64 {
    bytes / 1024 / 1024
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    format!("{}h {}m", hours, minutes)
}
