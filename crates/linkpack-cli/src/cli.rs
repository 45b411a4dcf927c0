//! Command-line flags, each with an environment fallback.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use linkpack_core::BundleConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "linkpack", version, about = "Collect links into tasks and serve them back as zip archives")]
pub struct Args {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    #[arg(
        long,
        env = "LOG_LEVEL",
        default_value = "info",
        value_parser = ["debug", "info", "warn", "error"]
    )]
    pub log_level: String,

    /// Tasks that may be in flight at once.
    #[arg(long, env = "TASKS_BUFFER_SIZE", default_value_t = 3)]
    pub tasks_buffer_size: usize,

    /// Links per task; reaching it starts processing.
    #[arg(long, env = "LINKS_IN_TASK", default_value_t = 3)]
    pub links_in_task: usize,

    #[arg(
        long,
        env = "ALLOWED_EXTENSIONS",
        value_delimiter = ',',
        default_value = "jpg,png,pdf"
    )]
    pub allowed_extensions: Vec<String>,

    #[arg(long, env = "ARCHIVES_DIR", default_value = "archives")]
    pub archives_dir: PathBuf,

    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Time a client gets to send the body of a request.
    #[arg(long, env = "READ_TIMEOUT", default_value = "5s", value_parser = parse_duration)]
    pub read_timeout: Duration,

    /// Time the server gets to produce a response.
    #[arg(long, env = "WRITE_TIMEOUT", default_value = "5s", value_parser = parse_duration)]
    pub write_timeout: Duration,

    /// How long a connection may sit without sending a request.
    #[arg(long, env = "IDLE_TIMEOUT", default_value = "10s", value_parser = parse_duration)]
    pub idle_timeout: Duration,
}

/// `500ms`, `5s`, `2m`, `1h`, or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    let (num_str, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => (&s[..pos], s[pos..].trim()),
        None => (s, "s"),
    };
    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid duration number: {num_str:?}"))?;

    let duration = match unit.to_lowercase().as_str() {
        "ms" => Duration::from_millis(num),
        "s" | "sec" | "secs" => Duration::from_secs(num),
        "m" | "min" | "mins" => Duration::from_secs(num.saturating_mul(60)),
        "h" | "hr" | "hours" => Duration::from_secs(num.saturating_mul(3600)),
        other => {
            return Err(format!(
                "invalid duration unit {other:?}, expected ms, s, m or h"
            ));
        }
    };
    if duration.is_zero() {
        return Err("duration must be greater than zero".to_string());
    }
    Ok(duration)
}

impl Args {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Deadline for one request, from its head being read to its response.
    pub fn request_timeout(&self) -> Duration {
        self.read_timeout + self.write_timeout
    }

    pub fn bundle_config(&self) -> BundleConfig {
        BundleConfig {
            max_in_flight_tasks: self.tasks_buffer_size,
            links_per_task: self.links_in_task,
            allowed_extensions: self.allowed_extensions.clone(),
            archive_dir: self.archives_dir.clone(),
            fetch_timeout_secs: self.fetch_timeout_secs,
            ..Default::default()
        }
    }
}
