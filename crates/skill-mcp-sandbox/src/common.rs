//! Shared subprocess helpers: output truncation, timed waits and process
//! tree termination.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default execution timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = skill_mcp_core::config::schema::DEFAULT_TIMEOUT_SECS;

/// Maximum captured bytes per stream
pub const MAX_OUTPUT_BYTES: usize = skill_mcp_core::config::schema::DEFAULT_MAX_OUTPUT_BYTES;

/// Appended to a stream that was cut at the byte budget.
pub const TRUNCATION_MARKER: &str = "\n... (output truncated)";

/// Decode captured output, keeping at most `max_bytes` bytes of it.
///
/// Output of exactly `max_bytes` is returned whole. Longer output is cut at
/// `max_bytes` (moved back to the previous UTF-8 boundary if the cut falls
/// inside a character) and [`TRUNCATION_MARKER`] is appended.
pub fn truncate_output(bytes: &[u8], max_bytes: usize) -> String {
    if bytes.len() <= max_bytes {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let mut cut = max_bytes;
    while cut > 0 && is_continuation_byte(bytes[cut]) {
        cut -= 1;
    }
    let mut out = String::from_utf8_lossy(&bytes[..cut]).into_owned();
    out.push_str(TRUNCATION_MARKER);
    out
}

fn is_continuation_byte(b: u8) -> bool {
    b & 0xC0 == 0x80
}

/// How a waited-on child finished.
#[derive(Debug)]
pub enum WaitOutcome {
    Exited {
        code: i32,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    TimedOut,
}

/// Wait for `child` while draining its piped stdout/stderr concurrently.
///
/// On timeout the child's whole process group is killed and reaped. If the
/// child exits but a descendant keeps the pipes open past the deadline, the
/// group is killed too and whatever was captured is returned.
pub async fn wait_with_timeout(mut child: Child, timeout: Duration) -> std::io::Result<WaitOutcome> {
    let deadline = deadline_after(timeout);
    let pgid = child.id();
    let mut stdout_task = spawn_reader(child.stdout.take());
    let mut stderr_task = spawn_reader(child.stderr.take());

    let status = match tokio::time::timeout_at(deadline, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            kill_process_tree(&mut child).await;
            stdout_task.abort();
            stderr_task.abort();
            return Ok(WaitOutcome::TimedOut);
        }
    };

    let streams = tokio::time::timeout_at(deadline, async {
        ((&mut stdout_task).await, (&mut stderr_task).await)
    })
    .await;
    let (stdout, stderr) = match streams {
        Ok((out, err)) => (out.unwrap_or_default(), err.unwrap_or_default()),
        Err(_) => {
            tracing::debug!("Descendant held output pipes past the deadline; killing group");
            kill_group(pgid);
            (
                stdout_task.await.unwrap_or_default(),
                stderr_task.await.unwrap_or_default(),
            )
        }
    };

    Ok(WaitOutcome::Exited {
        code: exit_code(status),
        stdout,
        stderr,
    })
}

/// `now + timeout`, saturating at roughly thirty years out.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30))
}

fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    })
}

/// Exit code, or the negated signal number for a signal-terminated child.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return -sig;
        }
    }
    -1
}

/// Kill `child` and every process in its group, then reap it.
pub async fn kill_process_tree(child: &mut Child) {
    kill_group(child.id());
    if let Err(e) = child.kill().await {
        tracing::debug!("kill after timeout: {}", e);
    }
}

#[cfg(unix)]
fn kill_group(pgid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = pgid {
        // ESRCH just means the group is already gone.
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;

    #[test]
    fn test_truncate_at_exact_limit_is_untouched() {
        let data = vec![b'a'; MAX_OUTPUT_BYTES];
        let out = truncate_output(&data, MAX_OUTPUT_BYTES);
        assert_eq!(out.len(), MAX_OUTPUT_BYTES);
        assert!(!out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncate_one_byte_over_limit() {
        let data = vec![b'a'; MAX_OUTPUT_BYTES + 1];
        let out = truncate_output(&data, MAX_OUTPUT_BYTES);
        assert!(out.ends_with("... (output truncated)"));
        assert_eq!(out.len(), MAX_OUTPUT_BYTES + TRUNCATION_MARKER.len());
        assert!(out[..MAX_OUTPUT_BYTES].bytes().all(|b| b == b'a'));
    }

    #[test]
    fn test_truncate_backs_off_to_char_boundary() {
        // "é" is two bytes; a 3-byte budget would split the second one.
        let out = truncate_output("éé!".as_bytes(), 3);
        assert_eq!(out, format!("é{}", TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_deadline_saturates_on_huge_timeout() {
        let deadline = deadline_after(Duration::MAX);
        assert!(deadline > Instant::now() + Duration::from_secs(86400 * 365));
    }

    #[tokio::test]
    async fn test_wait_captures_both_streams() {
        let child = tokio::process::Command::new("sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        match wait_with_timeout(child, Duration::from_secs(10)).await.unwrap() {
            WaitOutcome::Exited { code, stdout, stderr } => {
                assert_eq!(code, 3);
                assert_eq!(stdout, b"out\n");
                assert_eq!(stderr, b"err\n");
            }
            WaitOutcome::TimedOut => panic!("unexpected timeout"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_wait_times_out_and_kills() {
        let child = tokio::process::Command::new("sh")
            .args(["-c", "sleep 5"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let started = std::time::Instant::now();
        let outcome = wait_with_timeout(child, Duration::from_millis(200)).await.unwrap();
        assert!(matches!(outcome, WaitOutcome::TimedOut));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
