//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use http_fetch::{AuthConfig, FetchOptions};

/// Fetch URLs and write their bodies to standard output.
///
/// Options can be read from a JSON file with `--config`; flags given on the
/// command line override the file.
#[derive(Parser)]
#[command(name = "http-fetch")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to fetch
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// JSON file with fetch options (camelCase keys)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// HTTP method
    #[arg(short = 'X', long)]
    pub method: Option<String>,

    /// Request header as "key: value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "KEY: VALUE")]
    pub headers: Vec<String>,

    /// Accepted status code or half-open range such as 200-300 (repeatable)
    #[arg(long = "accept-status", value_name = "RULE")]
    pub accept_status: Vec<String>,

    /// Per-request deadline in milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,

    /// Cron expression; the URLs are fetched on every tick until Ctrl-C
    #[arg(long, value_name = "EXPR")]
    pub cron: Option<String>,

    /// With --cron, also fetch once right away
    #[arg(long, requires = "cron")]
    pub run_on_init: bool,

    /// Do not close the output when a run ends
    #[arg(long)]
    pub keep_open: bool,

    /// Treat a response without a body as success
    #[arg(long)]
    pub body_can_be_empty: bool,

    /// Log failed requests and continue instead of aborting
    #[arg(long)]
    pub non_fatal: bool,

    /// Write bodies as raw bytes instead of UTF-8 text
    #[arg(long)]
    pub binary: bool,

    /// Authentication strategy
    #[arg(long, value_name = "TYPE", value_parser = ["basic", "oauth2"])]
    pub auth_type: Option<String>,

    /// Username for authentication
    #[arg(long)]
    pub username: Option<String>,

    /// Password for authentication
    #[arg(long)]
    pub password: Option<String>,

    /// OAuth2 token endpoint
    #[arg(long, value_name = "URL")]
    pub token_endpoint: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Applies command-line overrides on top of `options`.
    pub fn apply(&self, options: &mut FetchOptions) {
        if let Some(method) = &self.method {
            options.method.clone_from(method);
        }
        options.headers.extend(self.headers.iter().cloned());
        if !self.accept_status.is_empty() {
            options.accept_status_codes.clone_from(&self.accept_status);
        }
        if self.timeout_ms.is_some() {
            options.timeout_milliseconds = self.timeout_ms;
        }
        if self.cron.is_some() {
            options.cron.clone_from(&self.cron);
        }
        options.run_on_init |= self.run_on_init;
        if self.keep_open {
            options.close_on_end = Some(false);
        }
        options.body_can_be_empty |= self.body_can_be_empty;
        if self.non_fatal {
            options.errors_are_fatal = false;
        }
        options.output_as_buffer |= self.binary;

        if let Some(kind) = &self.auth_type {
            options.auth = Some(AuthConfig {
                kind: kind.clone(),
                ..AuthConfig::default()
            });
        }
        if let Some(auth) = options.auth.as_mut() {
            if self.username.is_some() {
                auth.username.clone_from(&self.username);
            }
            if self.password.is_some() {
                auth.password.clone_from(&self.password);
            }
            if self.token_endpoint.is_some() {
                auth.endpoint.clone_from(&self.token_endpoint);
            }
        }
    }
}
