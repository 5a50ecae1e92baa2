use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

use crate::models::{PredictionRequest, PredictionResponse, PredictionResult};
use crate::services::prediction::{accept_response, PredictionError, PredictionTransport};

/// Runs the predictor script as a one-shot subprocess.
///
/// Protocol: `{interpreter} {script} {model_dir}`, one JSON document on stdin
/// followed by EOF, exactly one JSON document on stdout.
pub struct SpawnTransport {
    interpreter: String,
    script: PathBuf,
    timeout: Duration,
    kill_grace: Duration,
}

/// Everything the child produced before it exited
struct ProcessOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl SpawnTransport {
    pub fn new(interpreter: String, script: PathBuf, timeout: Duration, kill_grace: Duration) -> Self {
        Self {
            interpreter,
            script,
            timeout,
            kill_grace,
        }
    }

    async fn exchange(child: &mut Child, input: &[u8]) -> io::Result<ProcessOutput> {
        let missing = |stream: &str| io::Error::new(io::ErrorKind::BrokenPipe, format!("{} not captured", stream));
        let mut stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let mut stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let mut stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let write = async move {
            match stdin.write_all(input).await {
                Ok(()) => stdin.shutdown().await,
                // The child may exit without reading its input
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    tracing::debug!("Predictor closed stdin early");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        };

        let mut out = Vec::new();
        let mut err = Vec::new();
        let (_, _, _) = tokio::try_join!(write, stdout.read_to_end(&mut out), stderr.read_to_end(&mut err))?;
        let status = child.wait().await?;

        Ok(ProcessOutput {
            status,
            stdout: out,
            stderr: err,
        })
    }

    /// SIGTERM, then SIGKILL once the grace period runs out
    async fn terminate(&self, child: &mut Child) {
        if send_sigterm(child)
            && matches!(tokio::time::timeout(self.kill_grace, child.wait()).await, Ok(Ok(_)))
        {
            return;
        }

        if let Err(e) = child.kill().await {
            tracing::warn!("Failed to kill predictor process: {}", e);
        }
    }

    fn interpret(output: ProcessOutput) -> Result<PredictionResult, PredictionError> {
        let Some(code) = output.status.code() else {
            return Err(PredictionError::Terminated);
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !stdout.is_empty() {
            // Strict: a second document or trailing text is rejected
            match serde_json::from_str::<PredictionResponse>(stdout) {
                Ok(response) => {
                    if code != 0 {
                        tracing::debug!(code, "Predictor exited non-zero but produced a result");
                    }
                    return accept_response(response);
                }
                Err(e) if code == 0 => {
                    return Err(PredictionError::InvalidResponse(format!(
                        "Failed to parse predictor output: {}",
                        e
                    )));
                }
                Err(e) => {
                    tracing::debug!("Unparseable predictor output: {}", e);
                }
            }
        }

        if code != 0 {
            let stderr = if stderr.is_empty() {
                format!("Process exited with code {}", code)
            } else {
                stderr
            };
            return Err(PredictionError::ProcessExit { code, stderr });
        }

        Err(PredictionError::InvalidResponse("Predictor produced no output".into()))
    }
}

#[cfg(unix)]
fn send_sigterm(child: &Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok(),
        None => false,
    }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) -> bool {
    false
}

#[async_trait]
impl PredictionTransport for SpawnTransport {
    fn name(&self) -> &'static str {
        "spawn"
    }

    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictionError> {
        let input = serde_json::to_vec(&request.payload)
            .map_err(|e| PredictionError::InvalidResponse(format!("Failed to encode features: {}", e)))?;

        tracing::debug!(
            "Spawning predictor: {} {} {}",
            self.interpreter,
            self.script.display(),
            request.model_dir
        );

        let mut child = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg(&request.model_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(PredictionError::Spawn)?;

        let outcome = tokio::time::timeout(self.timeout, Self::exchange(&mut child, &input)).await;
        match outcome {
            Ok(output) => Self::interpret(output?),
            Err(_) => {
                tracing::warn!("Predictor timed out after {:?}, terminating", self.timeout);
                self.terminate(&mut child).await;
                Err(PredictionError::ProcessTimeout(self.timeout.as_secs()))
            }
        }
    }
}
