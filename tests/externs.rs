//! Extern-protocol tests against real child processes.

use quill::{run_with_output, QuillError, RuntimeError};

/// Path of the compiled standard extern process.
fn quillstd() -> &'static str {
    env!("CARGO_BIN_EXE_quillstd")
}

#[test]
fn test_extern_void_forwards_output() {
    let source = format!(
        r#"
        extern "{path}" console_print(text: string) -> void;

        fun main() -> void {{
            console_print("from the child");
            print("from the parent");
        }}
        "#,
        path = quillstd()
    );
    assert_eq!(
        run_with_output(&source).expect("execution failed"),
        "from the child\nfrom the parent\n"
    );
}

#[test]
fn test_extern_result_is_pushed() {
    // random_int(5, 6) has exactly one possible answer.
    let source = format!(
        r#"
        extern "{path}" random_int(lo: num, hi: num) -> num;

        fun main() -> void {{
            print(random_int(5, 6));
        }}
        "#,
        path = quillstd()
    );
    assert_eq!(run_with_output(&source).expect("execution failed"), "5\n");
}

#[test]
fn test_extern_result_in_range() {
    let source = format!(
        r#"
        extern "{path}" random_int(lo: num, hi: num) -> num;

        fun main() -> void {{
            let r: num = random_int(1, 10);
            if (r < 1) {{
                print("too small");
            }}
            if (r > 9) {{
                print("too big");
            }}
            print("done");
        }}
        "#,
        path = quillstd()
    );
    assert_eq!(run_with_output(&source).expect("execution failed"), "done\n");
}

#[test]
fn test_extern_unknown_function_fails() {
    let source = format!(
        r#"
        extern "{path}" no_such_function() -> void;

        fun main() -> void {{
            no_such_function();
        }}
        "#,
        path = quillstd()
    );
    match run_with_output(&source) {
        Err(QuillError::Runtime(RuntimeError::ExternFailed(stderr))) => {
            assert!(stderr.contains("unknown function"), "stderr: {}", stderr);
        }
        other => panic!("expected extern failure, got {:?}", other),
    }
}

#[test]
fn test_extern_missing_executable() {
    let source = r#"
        extern "./no/such/binary" f() -> void;

        fun main() -> void {
            f();
        }
    "#;
    match run_with_output(source) {
        Err(QuillError::Runtime(RuntimeError::ExternSpawn { .. })) => {}
        other => panic!("expected spawn failure, got {:?}", other),
    }
}

#[cfg(unix)]
mod unix {
    use super::*;

    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Instant;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn test_extern_nonzero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "fail.sh",
            "#!/bin/sh\necho \"boom\" >&2\nexit 3\n",
        );

        let source = format!(
            r#"
            extern "{path}" fail() -> void;

            fun main() -> void {{
                fail();
            }}
            "#,
            path = script.display()
        );
        match run_with_output(&source) {
            Err(QuillError::Runtime(RuntimeError::ExternFailed(stderr))) => {
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected extern failure, got {:?}", other),
        }
    }

    #[test]
    fn test_extern_without_result_line_fails() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "silent.sh",
            "#!/bin/sh\necho \"just chatter\"\nexit 0\n",
        );

        let source = format!(
            r#"
            extern "{path}" silent() -> num;

            fun main() -> void {{
                let x: num = silent();
            }}
            "#,
            path = script.display()
        );
        match run_with_output(&source) {
            Err(QuillError::Runtime(RuntimeError::ExternNoResult)) => {}
            other => panic!("expected missing result error, got {:?}", other),
        }
    }

    #[test]
    fn test_extern_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let done = dir.path().join("done");
        let script = write_script(
            dir.path(),
            "hang.sh",
            &format!("#!/bin/sh\nsleep 30\ntouch {}\n", done.display()),
        );

        let source = format!(
            r#"
            extern "{path}" hang() -> num;

            fun main() -> void {{
                let x: num = hang();
            }}
            "#,
            path = script.display()
        );

        let started = Instant::now();
        match run_with_output(&source) {
            Err(QuillError::Runtime(RuntimeError::ExternTimeout)) => {}
            other => panic!("expected timeout, got {:?}", other),
        }
        let elapsed = started.elapsed().as_secs_f64();
        assert!(elapsed >= 4.5 && elapsed < 8.0, "elapsed: {}s", elapsed);

        // The killed child never reached its touch.
        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(!done.exists());
    }
}
