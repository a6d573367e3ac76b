//! Extern call gateway
//!
//! A function declared `extern` runs as a child process: arguments travel
//! as an escaped JSON array on the command line, and the result comes back
//! on a stdout line tagged with a per-call token. The whole transport lives
//! behind [`invoke`] so a different one could replace it without touching
//! the interpreter.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::RuntimeError;
use crate::program::{ExternFunction, ValueType};
use crate::value::Value;

/// Wall-clock bound on a single extern call.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Invocation is `<path> <name> <json-args-escaped> <token-or-"null">`.
/// Uncorrelated stdout lines are forwarded to `output`; a non-Void result
/// is decoded from the correlated line and returned.
pub fn invoke(
    func: &ExternFunction,
    args: Vec<Value>,
    output: &mut dyn Write,
) -> Result<Option<Value>, RuntimeError> {
    let token = if func.return_type == ValueType::Void {
        None
    } else {
        Some(result_token())
    };

    let mut child = Command::new(&func.path)
        .arg(&func.name)
        .arg(escape_arg(&encode_args(&args)))
        .arg(token.as_deref().unwrap_or("null"))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| RuntimeError::ExternSpawn {
            path: func.path.clone(),
            reason: e.to_string(),
        })?;

    let stdout_lines = drain_stdout(&mut child);
    let stderr_text = drain_stderr(&mut child);

    let marker = token.as_ref().map(|t| format!("<{}>", t));
    let mut result_line: Option<String> = None;
    let started = Instant::now();

    // Poll for exit while draining stdout, so the child can never block on
    // a full pipe.
    let status = loop {
        while let Ok(line) = stdout_lines.try_recv() {
            take_line(&mut result_line, &marker, line, output)?;
        }

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => return Err(RuntimeError::ExternFailed(e.to_string())),
        }

        if started.elapsed() >= CALL_TIMEOUT {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RuntimeError::ExternTimeout);
        }

        thread::sleep(POLL_INTERVAL);
    };

    // Collect whatever the reader still held when the child exited.
    while let Ok(line) = stdout_lines.recv_timeout(Duration::from_millis(50)) {
        take_line(&mut result_line, &marker, line, output)?;
    }

    let stderr = stderr_text
        .recv_timeout(Duration::from_secs(1))
        .unwrap_or_default();

    if !status.success() {
        return Err(RuntimeError::ExternFailed(stderr.trim().to_string()));
    }

    match (func.return_type, result_line) {
        (ValueType::Void, _) => Ok(None),
        (_, None) => Err(RuntimeError::ExternNoResult),
        (ty, Some(json)) => decode_result(ty, &json).map(Some),
    }
}

/// Forward a stdout line, or capture it if it carries the result token.
fn take_line(
    result: &mut Option<String>,
    marker: &Option<String>,
    line: String,
    output: &mut dyn Write,
) -> Result<(), RuntimeError> {
    if result.is_none() {
        if let Some(marker) = marker {
            if let Some(rest) = line.strip_prefix(marker.as_str()) {
                *result = Some(rest.to_string());
                return Ok(());
            }
        }
    }
    writeln!(output, "{}", line).map_err(|e| RuntimeError::Output(e.to_string()))
}

/// Encode call arguments, in declaration order, as a JSON array.
fn encode_args(args: &[Value]) -> String {
    let values: Vec<serde_json::Value> = args
        .iter()
        .map(|arg| match arg {
            Value::Number(n) => serde_json::Value::from(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
        })
        .collect();
    serde_json::Value::Array(values).to_string()
}

/// Decode the correlated result line per the declared return type.
fn decode_result(ty: ValueType, json: &str) -> Result<Value, RuntimeError> {
    let parsed: serde_json::Value =
        serde_json::from_str(json).map_err(|e| RuntimeError::ExternBadResult(e.to_string()))?;

    let value = match ty {
        ValueType::Number => parsed.as_f64().map(Value::Number),
        ValueType::String => parsed.as_str().map(|s| Value::String(s.to_string())),
        ValueType::Bool => parsed.as_bool().map(Value::Bool),
        ValueType::Void => None,
    };

    value.ok_or_else(|| {
        RuntimeError::ExternBadResult(format!("expected {}, got {}", ty.name(), json))
    })
}

/// Escape the JSON argv slot; the child reverses this with [`unescape_arg`].
pub fn escape_arg(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Inverse of [`escape_arg`].
pub fn unescape_arg(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Fresh correlation token for one call.
fn result_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

fn drain_stdout(child: &mut Child) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    }
    rx
}

fn drain_stderr(child: &mut Child) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    if let Some(stderr) = child.stderr.take() {
        thread::spawn(move || {
            let mut text = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut text);
            let _ = tx.send(text);
        });
    }
    rx
}
