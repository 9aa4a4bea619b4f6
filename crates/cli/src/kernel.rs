//! Out-of-process simulation kernel.
//!
//! Drives an external simulator over newline-delimited JSON on its standard streams. Each
//! request is one line on the child's stdin; the child answers each with one line on its
//! stdout:
//!
//! ```text
//! -> {"op":"instantiate","topology":{...},"restore":null}
//! <- {"status":"ok"}
//! -> {"op":"simulate"}
//! <- {"status":"event","cause":"checkpoint","code":0,"tick":1000}
//! -> {"op":"checkpoint","dir":"m5out/cpt.1000"}
//! <- {"status":"ok"}
//! ```

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

use fsbricks_core::common::error::KernelError;
use fsbricks_core::sim::{SimulationEvent, SimulationKernel};
use fsbricks_core::soc::SystemTopology;

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Instantiate {
        topology: &'a SystemTopology,
        restore: Option<&'a Path>,
    },
    Simulate,
    Checkpoint {
        dir: &'a Path,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Response {
    Ok,
    Event(SimulationEvent),
    Error { message: String },
}

/// A simulator child process speaking JSON lines.
#[derive(Debug)]
pub struct ProcessKernel {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl ProcessKernel {
    /// Spawns `program` with `args`; its stderr is inherited.
    ///
    /// # Errors
    ///
    /// Returns a [`KernelError`] if the process cannot be started.
    pub fn spawn(program: &Path, args: &[String]) -> Result<Self, KernelError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| KernelError::new(format!("failed to start {}: {e}", program.display())))?;
        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| KernelError::new("kernel stdout is not piped"))?;
        debug!(program = %program.display(), pid = child.id(), "kernel process started");
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn execute(&mut self, request: &Request<'_>) -> Result<Response, KernelError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| KernelError::new("kernel stdin is closed"))?;
        let mut payload = serde_json::to_vec(request)
            .map_err(|e| KernelError::new(format!("encode request: {e}")))?;
        payload.push(b'\n');
        stdin
            .write_all(&payload)
            .and_then(|()| stdin.flush())
            .map_err(|e| KernelError::new(format!("write request: {e}")))?;
        self.read_response()
    }

    fn read_response(&mut self) -> Result<Response, KernelError> {
        let mut line = String::new();
        let n = self
            .stdout
            .read_line(&mut line)
            .map_err(|e| KernelError::new(format!("read response: {e}")))?;
        if n == 0 {
            return Err(KernelError::new("unexpected EOF from kernel"));
        }
        match serde_json::from_str(&line) {
            Ok(Response::Error { message }) => Err(KernelError::new(message)),
            Ok(response) => Ok(response),
            Err(e) => Err(KernelError::new(format!(
                "parse response {:?}: {e}",
                line.trim_end()
            ))),
        }
    }

    fn expect_ok(&mut self, request: &Request<'_>) -> Result<(), KernelError> {
        match self.execute(request)? {
            Response::Ok => Ok(()),
            other => Err(KernelError::new(format!("expected ok, got {other:?}"))),
        }
    }
}

impl SimulationKernel for ProcessKernel {
    fn instantiate(
        &mut self,
        topology: SystemTopology,
        restore: Option<PathBuf>,
    ) -> Result<(), KernelError> {
        self.expect_ok(&Request::Instantiate {
            topology: &topology,
            restore: restore.as_deref(),
        })
    }

    fn simulate(&mut self) -> Result<SimulationEvent, KernelError> {
        match self.execute(&Request::Simulate)? {
            Response::Event(event) => Ok(event),
            other => Err(KernelError::new(format!("expected event, got {other:?}"))),
        }
    }

    fn checkpoint(&mut self, dir: &Path) -> Result<(), KernelError> {
        self.expect_ok(&Request::Checkpoint { dir })
    }
}

impl Drop for ProcessKernel {
    fn drop(&mut self) {
        drop(self.stdin.take());
        let _ = self.child.wait();
    }
}
