//! Command-line interface for the provider bridge
//!
//! Provides argument parsing and subcommand handling for the binary.

use crate::config::Config;
use crate::error::AppResult;
use crate::router::RoutingMode;
use clap::{Parser, Subcommand};

/// Adaptive router for chat-completion providers
#[derive(Parser)]
#[command(name = "provider-bridge")]
#[command(version)]
#[command(about = "Adaptive router for chat-completion providers")]
#[command(
    long_about = "Provider Bridge routes chat-completion requests across interchangeable \
    providers by task category and live performance, cooling down failing providers and \
    escalating to a multi-provider committee when a single answer is not trusted."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    /// Routing mode override (adaptive, hybrid or committee)
    #[arg(long, env = "BRIDGE_MODE")]
    pub mode: Option<String>,

    /// Listen port override
    #[arg(long, env = "BRIDGE_PORT")]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    /// Apply `--mode` and `--port` on top of the loaded configuration
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidMode` for an unrecognized mode.
    pub fn apply_overrides(&self, config: &mut Config) -> AppResult<()> {
        if let Some(mode) = &self.mode {
            config.routing.mode = mode.parse::<RoutingMode>()?;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        Ok(())
    }
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Provider Bridge Configuration
# =============================
#
# Configures the HTTP server, providers, routing policy, performance tracking,
# deduplication cache, insight distributor and logging.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on (overridden by --port / BRIDGE_PORT)
port = 7010

# Timeout for every outbound provider call, in seconds
request_timeout_seconds = 60

# ─────────────────────────────────────────────────────────────────────────────
# ROUTING
# ─────────────────────────────────────────────────────────────────────────────

[routing]
# "adaptive" / "hybrid": weighted selection with committee escalation
# "committee": every request goes to all providers
# Overridden by --mode / BRIDGE_MODE
mode = "adaptive"

# Category used when no keyword matches
default_category = "analysis"

# Provider serving /v1/anthropic/messages
anthropic_provider = "claude"

# Marker terms (matched against task_id + prompt) that force a committee
sensitive_tasks = ["legal", "medical", "financial"]

# Base weights for categories that declare none
default_weights = { llama = 0.4, mistral = 0.3, openai = 0.2, claude = 0.1 }

# Categories are matched in order; the first keyword hit wins
[[routing.categories]]
name = "analysis"
keywords = ["analyze", "analysis", "impact", "compare"]
weights = { claude = 0.4, openai = 0.3, llama = 0.2, mistral = 0.1 }

[[routing.categories]]
name = "conversation"
keywords = ["hello", "hi ", "how are you", "thanks"]
weights = { llama = 0.5, mistral = 0.3, openai = 0.2 }

[[routing.categories]]
name = "summarization"
keywords = ["summarize", "summary", "tl;dr"]
weights = { mistral = 0.4, llama = 0.3, openai = 0.2, claude = 0.1 }

[[routing.categories]]
name = "planning"
keywords = ["plan", "strategy", "roadmap"]
weights = { claude = 0.4, openai = 0.4, llama = 0.2 }

[[routing.categories]]
name = "coding"
keywords = ["code", "function", "python", "rust", "bug"]
weights = { openai = 0.5, claude = 0.3, llama = 0.2 }

# ─────────────────────────────────────────────────────────────────────────────
# PROVIDERS
# ─────────────────────────────────────────────────────────────────────────────
#
# type: "openai", "openai-compatible" or "anthropic"
# api_key_env: environment variable holding the credential (optional)

[[providers]]
id = "llama"
type = "openai-compatible"
base_url = "http://127.0.0.1:11434/v1"
model = "llama3.1"

[[providers]]
id = "mistral"
type = "openai-compatible"
base_url = "https://api.mistral.ai/v1"
model = "mistral-small-latest"
api_key_env = "MISTRAL_API_KEY"

[[providers]]
id = "openai"
type = "openai"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"

[[providers]]
id = "claude"
type = "anthropic"
base_url = "https://api.anthropic.com/v1"
model = "claude-3-5-sonnet-latest"
api_key_env = "ANTHROPIC_API_KEY"

# ─────────────────────────────────────────────────────────────────────────────
# PERFORMANCE TRACKING
# ─────────────────────────────────────────────────────────────────────────────

[tracking]
# Consecutive failures before a provider cools down
failure_threshold = 3
# Cooldown length in seconds
cooldown_seconds = 300
# Latency samples kept per provider
latency_window = 100

# ─────────────────────────────────────────────────────────────────────────────
# DEDUPLICATION CACHE
# ─────────────────────────────────────────────────────────────────────────────

[cache]
ttl_seconds = 3600
# Prompt characters that participate in the fingerprint
prompt_prefix_chars = 500

# ─────────────────────────────────────────────────────────────────────────────
# INSIGHT DISTRIBUTOR
# ─────────────────────────────────────────────────────────────────────────────

[distributor]
enabled = false
broadcast_url = "http://127.0.0.1:7020/broadcast"
timeout_seconds = 3
topic = "ai_bridge.insight"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}
