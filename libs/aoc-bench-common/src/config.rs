use std::env;
use std::str::FromStr;

/// Harness configuration
/// Provides defaults with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    pub default_timeout_ms: u64,
    pub install_timeout_cap_ms: u64,
    pub build_timeout_floor_ms: u64,
    pub compile_timeout_cap_ms: u64,
    /// Captured stdout/stderr are truncated beyond this many characters
    pub output_budget_chars: usize,
    pub python_bin: String,
    pub node_bin: String,
    pub bun_bin: String,
    pub npm_bin: String,
    pub cargo_bin: String,
    pub rustc_bin: String,
    /// Fall back to source sniffing for JS solutions that do not declare a module flavor
    pub sniff_commonjs: bool,
    pub json_logs: bool,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            default_timeout_ms: env_or("AOC_BENCH_TIMEOUT_MS", 60_000),
            install_timeout_cap_ms: env_or("AOC_BENCH_INSTALL_TIMEOUT_CAP_MS", 120_000),
            build_timeout_floor_ms: env_or("AOC_BENCH_BUILD_TIMEOUT_FLOOR_MS", 180_000),
            compile_timeout_cap_ms: env_or("AOC_BENCH_COMPILE_TIMEOUT_CAP_MS", 60_000),
            output_budget_chars: env_or("AOC_BENCH_OUTPUT_BUDGET", 20_000),
            python_bin: env_string("AOC_BENCH_PYTHON", "python3"),
            node_bin: env_string("AOC_BENCH_NODE", "node"),
            bun_bin: env_string("AOC_BENCH_BUN", "bun"),
            npm_bin: env_string("AOC_BENCH_NPM", "npm"),
            cargo_bin: env_string("AOC_BENCH_CARGO", "cargo"),
            rustc_bin: env_string("AOC_BENCH_RUSTC", "rustc"),
            sniff_commonjs: env_or("AOC_BENCH_SNIFF_COMMONJS", true),
            json_logs: env_string("AOC_BENCH_LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
        }
    }

    pub fn new() -> Self {
        Self::from_env()
    }

    /// Dependency installs are capped independently of the solution timeout
    pub fn install_timeout_ms(&self, timeout_ms: u64) -> u64 {
        timeout_ms.min(self.install_timeout_cap_ms)
    }

    /// Project builds get at least as long as the solution itself
    pub fn build_timeout_ms(&self, timeout_ms: u64) -> u64 {
        timeout_ms.max(self.build_timeout_floor_ms)
    }

    pub fn compile_timeout_ms(&self, timeout_ms: u64) -> u64 {
        timeout_ms.min(self.compile_timeout_cap_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
