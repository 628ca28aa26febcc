//! Server-side rendering through an external worker process.
//!
//! The worker reads one JSON request per line on stdin and answers each
//! with one JSON line on stdout:
//!
//! ```text
//! > {"format":"inline-TeX","math":"x^2"}
//! < {"html":"<span class=\"mjx-chtml\">…</span>"}
//! ```
//!
//! A worker serves exactly one pass and is closed at its end.

use super::MathRenderer;
use crate::ast::MathMode;
use crate::config::{MathSettings, WorkerConfig};
use crate::error::RenderError;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

const EXIT_POLL: Duration = Duration::from_millis(10);

#[derive(Serialize)]
struct Request<'a> {
    format: &'static str,
    math: &'a str,
}

#[derive(Deserialize)]
struct Reply {
    html: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

/// The worker's name for a display mode.
pub fn format_token(mode: MathMode) -> &'static str {
    match mode {
        MathMode::Inline => "inline-TeX",
        MathMode::Block => "TeX",
    }
}

/// A running rendering worker.
pub struct WorkerProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    replies: Receiver<io::Result<String>>,
    timeout: Duration,
    closed: bool,
}

impl WorkerProcess {
    /// Start the worker described by `config`.
    pub fn spawn(config: &WorkerConfig) -> Result<Self, RenderError> {
        let spawn_error = |source| RenderError::Spawn {
            command: config.command.clone(),
            source,
        };

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(spawn_error)?;
        let stdin = child.stdin.take();
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RenderError::WorkerExited);
        };

        // Replies are read on their own thread so a silent worker can time out.
        let (sender, replies) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("math-worker-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    if sender.send(line).is_err() {
                        break;
                    }
                }
            });
        if let Err(source) = reader {
            let _ = child.kill();
            let _ = child.wait();
            return Err(spawn_error(source));
        }

        tracing::debug!(command = %config.command, pid = child.id(), "rendering worker started");

        Ok(Self {
            child,
            stdin,
            replies,
            timeout: config.timeout(),
            closed: false,
        })
    }

    /// Send one span and wait for its markup.
    pub fn render(&mut self, math: &str, mode: MathMode) -> Result<String, RenderError> {
        let request = serde_json::to_string(&Request {
            format: format_token(mode),
            math,
        })
        .map_err(io::Error::from)?;

        let stdin = self.stdin.as_mut().ok_or(RenderError::WorkerExited)?;
        writeln!(stdin, "{}", request)?;
        stdin.flush()?;

        let line = match self.replies.recv_timeout(self.timeout) {
            Ok(line) => line?,
            Err(RecvTimeoutError::Timeout) => {
                self.kill();
                return Err(RenderError::Timeout(self.timeout));
            }
            Err(RecvTimeoutError::Disconnected) => return Err(RenderError::WorkerExited),
        };

        parse_reply(&line)
    }

    /// Close stdin and wait for the worker to exit.
    ///
    /// A worker still running after the reply timeout is killed.
    pub fn close(&mut self) -> Result<ExitStatus, RenderError> {
        drop(self.stdin.take());
        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = self.child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                tracing::warn!(timeout = ?self.timeout, "rendering worker ignored end of input");
                self.kill();
                break self.child.wait()?;
            }
            thread::sleep(EXIT_POLL);
        };
        self.closed = true;
        tracing::debug!(%status, "rendering worker exited");
        Ok(status)
    }

    fn kill(&mut self) {
        drop(self.stdin.take());
        if let Err(err) = self.child.kill() {
            tracing::debug!(%err, "failed to kill rendering worker");
        }
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn parse_reply(line: &str) -> Result<String, RenderError> {
    let reply: Reply = serde_json::from_str(line)
        .map_err(|e| RenderError::MalformedReply(format!("{}: {}", e, line)))?;

    match reply.html {
        Some(html) => Ok(html),
        None if !reply.errors.is_empty() => Err(RenderError::Typeset(reply.errors.join("; "))),
        None => Err(RenderError::MalformedReply(format!("missing `html` in {}", line))),
    }
}

/// Renderer that typesets spans before display, one worker per pass.
pub struct ServerRenderer {
    config: WorkerConfig,
    engine_class: &'static str,
    worker: Option<WorkerProcess>,
}

impl ServerRenderer {
    pub fn new(settings: &MathSettings) -> Self {
        Self::with_worker(settings.worker.clone(), settings.provider.engine_class())
    }

    pub fn with_worker(config: WorkerConfig, engine_class: &'static str) -> Self {
        Self {
            config,
            engine_class,
            worker: None,
        }
    }

    /// Whether a worker is currently attached.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl MathRenderer for ServerRenderer {
    fn engine_class(&self) -> &'static str {
        self.engine_class
    }

    fn begin_pass(&mut self) -> Result<(), RenderError> {
        self.end_pass()?;
        self.worker = Some(WorkerProcess::spawn(&self.config)?);
        Ok(())
    }

    fn render(&mut self, content: &str, mode: MathMode) -> Result<String, RenderError> {
        self.worker
            .as_mut()
            .ok_or(RenderError::WorkerExited)?
            .render(content, mode)
    }

    fn end_pass(&mut self) -> Result<(), RenderError> {
        let Some(mut worker) = self.worker.take() else {
            return Ok(());
        };
        let status = worker.close()?;
        if !status.success() {
            tracing::warn!(%status, "rendering worker exited with failure");
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::parser::{extract_spans, parse};
    use crate::render::{dispatch, render_html};
    use pretty_assertions::assert_eq;

    const ECHO_WORKER: &str = r#"while IFS= read -r line; do
  case "$line" in
    *inline-TeX*) echo '{"html":"<i>inline</i>"}' ;;
    *) echo '{"html":"<b>display</b>"}' ;;
  esac
done"#;

    fn sh(script: &str) -> WorkerConfig {
        WorkerConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            working_dir: None,
            timeout_ms: 5_000,
        }
    }

    #[test]
    fn test_format_tokens() {
        assert_eq!(format_token(MathMode::Inline), "inline-TeX");
        assert_eq!(format_token(MathMode::Block), "TeX");
    }

    #[test]
    fn test_request_line() {
        let line = serde_json::to_string(&Request {
            format: "TeX",
            math: "a\nb \"q\"",
        })
        .unwrap();
        assert_eq!(line, r#"{"format":"TeX","math":"a\nb \"q\""}"#);
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(parse_reply(r#"{"html":"<b>x</b>"}"#).unwrap(), "<b>x</b>");
        assert!(matches!(
            parse_reply(r#"{"errors":["TeX parse error"]}"#),
            Err(RenderError::Typeset(msg)) if msg == "TeX parse error"
        ));
        assert!(matches!(parse_reply("{}"), Err(RenderError::MalformedReply(_))));
        assert!(matches!(parse_reply("<html>"), Err(RenderError::MalformedReply(_))));
    }

    #[test]
    fn test_worker_round_trip() {
        let mut worker = WorkerProcess::spawn(&sh(ECHO_WORKER)).unwrap();
        assert_eq!(worker.render("x", MathMode::Inline).unwrap(), "<i>inline</i>");
        assert_eq!(worker.render("y", MathMode::Block).unwrap(), "<b>display</b>");
        assert!(worker.close().unwrap().success());
    }

    #[test]
    fn test_spawn_failure() {
        let config = WorkerConfig {
            command: "/nonexistent/math-worker".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            WorkerProcess::spawn(&config),
            Err(RenderError::Spawn { .. })
        ));
    }

    #[test]
    fn test_worker_crash() {
        let mut worker = WorkerProcess::spawn(&sh("read line; exit 3")).unwrap();
        let err = worker.render("x", MathMode::Inline).unwrap_err();
        assert!(err.abandons_pass());
        assert_eq!(worker.close().unwrap().code(), Some(3));
    }

    #[test]
    fn test_worker_timeout() {
        let mut config = sh("read line; sleep 5");
        config.timeout_ms = 100;
        let mut worker = WorkerProcess::spawn(&config).unwrap();
        assert!(matches!(
            worker.render("x", MathMode::Inline),
            Err(RenderError::Timeout(_))
        ));
        assert!(!worker.close().unwrap().success());
    }

    #[test]
    fn test_close_kills_lingering_worker() {
        let mut config = sh("exec sleep 30");
        config.timeout_ms = 100;
        let mut worker = WorkerProcess::spawn(&config).unwrap();

        let started = Instant::now();
        let status = worker.close().unwrap();
        assert!(!status.success());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_server_pass() {
        let mut renderer = ServerRenderer::with_worker(sh(ECHO_WORKER), "mathjax-math");
        let mut doc = parse("Let $x$ be\n\n$$\nx^2\n$$");
        extract_spans(&mut doc);

        let report = dispatch(&mut doc, &mut renderer);
        assert_eq!(report.rendered, 2);
        assert!(!renderer.is_running());
        assert_eq!(
            render_html(&doc),
            "<p>Let <span class=\"math math-container inline-math mathjax-math\"><i>inline</i></span> be</p>\n\
             <div class=\"math math-container block-math mathjax-math\"><b>display</b></div>"
        );
    }

    #[test]
    fn test_server_pass_abandoned_on_crash() {
        let script = r#"read line; echo '{"html":"ok"}'; read line; exit 1"#;
        let mut renderer = ServerRenderer::with_worker(sh(script), "mathjax-math");
        let mut doc = parse("$a$ $b$ $c$");
        extract_spans(&mut doc);

        let report = dispatch(&mut doc, &mut renderer);
        assert_eq!(report.rendered, 1);
        assert_eq!(report.skipped, 1);
        assert!(report.abandoned);
        assert!(!renderer.is_running());
        assert_eq!(
            render_html(&doc),
            "<p><span class=\"math math-container inline-math mathjax-math\">ok</span> \
             <span class=\"math\">b</span> <span class=\"math\">c</span></p>"
        );
    }

    #[test]
    fn test_server_pass_without_worker() {
        let config = WorkerConfig {
            command: "/nonexistent/math-worker".to_string(),
            ..Default::default()
        };
        let mut renderer = ServerRenderer::with_worker(config, "mathjax-math");
        let mut doc = parse("$a$");
        extract_spans(&mut doc);

        let report = dispatch(&mut doc, &mut renderer);
        assert!(report.abandoned);
        assert_eq!(render_html(&doc), "<p><span class=\"math\">a</span></p>");
    }

    #[test]
    fn test_typeset_error_keeps_worker() {
        let script = r#"read line; echo '{"errors":["bad"]}'; read line; echo '{"html":"ok"}'; cat >/dev/null"#;
        let mut renderer = ServerRenderer::with_worker(sh(script), "mathjax-math");
        let mut doc = parse("$a$ $b$");
        extract_spans(&mut doc);

        let report = dispatch(&mut doc, &mut renderer);
        assert_eq!(report.rendered, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.abandoned);
    }
}
