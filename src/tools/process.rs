//! 外部进程执行：逐行读取 stdout，带超时与取消
//!
//! 无 shell，直接 exec program + args；超时或取消时立即 kill 子进程，已读到的行照常返回，
//! 由调用方决定如何解析部分输出。stderr 在后台任务中读取，避免管道写满阻塞子进程。

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// 进程结束方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEnd {
    Exited {
        success: bool,
        code: Option<i32>,
        stderr: String,
    },
    TimedOut,
    Cancelled,
}

/// 进程输出：按行收集的 stdout（非 UTF-8 字节做有损转换）+ 结束方式
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub lines: Vec<String>,
    pub end: ProcessEnd,
}

/// 运行进程直至退出 / 超时 / 取消
pub async fn run_streaming(
    program: &Path,
    args: &[String],
    timeout: Duration,
    cancel: &CancellationToken,
) -> std::io::Result<ProcessOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "stdout not captured"))?;
    let stderr = child.stderr.take();
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(mut err) = stderr {
            let _ = err.read_to_string(&mut buf).await;
        }
        buf
    });

    let mut reader = BufReader::new(stdout);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        buf.clear();
        tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => {
                if read? == 0 {
                    break;
                }
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']);
                if !line.is_empty() {
                    lines.push(line.to_string());
                }
            }
            _ = &mut deadline => {
                let _ = child.kill().await;
                stderr_task.abort();
                return Ok(ProcessOutput { lines, end: ProcessEnd::TimedOut });
            }
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                stderr_task.abort();
                return Ok(ProcessOutput { lines, end: ProcessEnd::Cancelled });
            }
        }
    }

    // stdout 已关闭，但进程可能仍在运行
    let status = tokio::select! {
        status = child.wait() => status?,
        _ = &mut deadline => {
            let _ = child.kill().await;
            stderr_task.abort();
            return Ok(ProcessOutput { lines, end: ProcessEnd::TimedOut });
        }
        _ = cancel.cancelled() => {
            let _ = child.kill().await;
            stderr_task.abort();
            return Ok(ProcessOutput { lines, end: ProcessEnd::Cancelled });
        }
    };
    let stderr = stderr_task.await.unwrap_or_default();

    Ok(ProcessOutput {
        lines,
        end: ProcessEnd::Exited {
            success: status.success(),
            code: status.code(),
            stderr,
        },
    })
}
