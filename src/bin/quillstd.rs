//! Standard extern process for Quill
//!
//! Speaks the extern protocol: argv is `<function> <json-args-escaped>
//! <result-token|"null">`, and a result goes back to the interpreter as a
//! single `<{token}>{json}` line on stdout. Failures exit non-zero with a
//! diagnostic on stderr.

use std::env;
use std::process;

use rand::Rng;

use quill::externs::unescape_arg;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("EXTERNAL_ERROR: expected <function> <args> <token>");
        process::exit(1);
    }

    if let Err(message) = dispatch(&args[1], &args[2], &args[3]) {
        eprintln!("EXTERNAL_ERROR: {}", message);
        process::exit(1);
    }
}

fn dispatch(function: &str, escaped_args: &str, token: &str) -> Result<(), String> {
    let args: Vec<serde_json::Value> = serde_json::from_str(&unescape_arg(escaped_args))
        .map_err(|e| format!("bad argument payload: {}", e))?;

    match function {
        "console_print" => {
            let text = args
                .first()
                .and_then(|v| v.as_str())
                .ok_or_else(|| "console_print requires a string".to_string())?;
            println!("{}", text);
            Ok(())
        }

        "random_int" => {
            let lo = number_arg(&args, 0)? as i64;
            let hi = number_arg(&args, 1)? as i64;
            if lo >= hi {
                return Err(format!("random_int requires lo < hi, got {} and {}", lo, hi));
            }
            let value = rand::thread_rng().gen_range(lo..hi);
            send_result(token, serde_json::Value::from(value));
            Ok(())
        }

        _ => Err(format!("unknown function '{}'", function)),
    }
}

fn number_arg(args: &[serde_json::Value], index: usize) -> Result<f64, String> {
    args.get(index)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| format!("argument {} must be a number", index))
}

fn send_result(token: &str, value: serde_json::Value) {
    println!("<{}>{}", token, value);
}
