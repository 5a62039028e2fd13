//! Process-backed [`ExternalChecker`].

use std::fmt;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use deduct_core::{CheckRequest, CheckerFault, ExternalChecker, Verdict};
use tokio::process::Command;
use tokio::runtime::{Builder, Runtime};
use tokio::time;

use crate::codec::{FrameReader, FrameWriter};
use crate::protocol::{self, Request};
use crate::types::CheckerConfig;

/// Runs one checker process per request.
///
/// `check` blocks on a private runtime, so it must not be called from inside
/// an async task; a debounce timer calls it from the blocking pool.
pub struct ProcessChecker {
    config: CheckerConfig,
    runtime: Runtime,
    next_id: AtomicU64,
}

impl ProcessChecker {
    pub fn new(config: CheckerConfig) -> anyhow::Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()
            .context("building checker runtime")?;
        Ok(Self {
            config,
            runtime,
            next_id: AtomicU64::new(1),
        })
    }

    #[must_use]
    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    async fn exchange(&self, request: &CheckRequest) -> Result<Verdict, CheckerFault> {
        let program = which::which(&self.config.command).map_err(|err| {
            CheckerFault::Unavailable(format!("{} not found in PATH: {err}", self.config.command))
        })?;
        let mut child = Command::new(&program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                CheckerFault::Unavailable(format!("spawning {}: {err}", program.display()))
            })?;
        tracing::info!("started checker {} for {}", program.display(), request.target);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = serde_json::to_value(Request::check(id, request))
            .map_err(|err| CheckerFault::Transport(format!("encoding request: {err}")))?;

        let transport = async {
            let stdin = child.stdin.take().context("no stdin from checker")?;
            let stdout = child.stdout.take().context("no stdout from checker")?;
            let mut writer = FrameWriter::new(stdin);
            writer.write_frame(&frame).await?;
            // Closing stdin tells the server no further requests follow.
            drop(writer);
            FrameReader::new(stdout).read_frame().await
        };
        let response = transport
            .await
            .map_err(|err| CheckerFault::Transport(format!("{err:#}")))?
            .ok_or_else(|| {
                CheckerFault::Transport("checker exited without answering".to_string())
            })?;
        protocol::decode_response(id, response)
    }
}

impl ExternalChecker for ProcessChecker {
    fn check(&self, request: &CheckRequest) -> Result<Verdict, CheckerFault> {
        let limit = self.config.timeout();
        self.runtime.block_on(async {
            time::timeout(limit, self.exchange(request))
                .await
                .unwrap_or(Err(CheckerFault::Timeout(limit)))
        })
    }
}

impl fmt::Debug for ProcessChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessChecker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
