use quill::{run_with_output, ParseError, QuillError, RuntimeError};

fn run(source: &str) -> String {
    run_with_output(source).expect("execution failed")
}

#[test]
fn test_hello_world() {
    let source = r#"
        fun main() -> void {
            print("hello, world");
        }
    "#;
    assert_eq!(run(source), "hello, world\n");
}

#[test]
fn test_arithmetic_precedence() {
    let source = r#"
        fun main() -> void {
            let x: num = 2 + 3 * 4;
            print(x);
        }
    "#;
    assert_eq!(run(source), "14\n");
}

#[test]
fn test_string_concatenation() {
    let source = r#"
        fun main() -> void {
            let greeting: string = "hello" + ", " + "quill";
            print(greeting);
        }
    "#;
    assert_eq!(run(source), "hello, quill\n");
}

#[test]
fn test_num_to_string() {
    let source = r#"
        fun main() -> void {
            print("n = " + num_to_string(7));
        }
    "#;
    assert_eq!(run(source), "n = 7\n");
}

#[test]
fn test_while_loop_reevaluates_condition() {
    let source = r#"
        fun main() -> void {
            let i: num = 0;
            while (i < 3) {
                print(i);
                i = i + 1;
            }
        }
    "#;
    assert_eq!(run(source), "0\n1\n2\n");
}

#[test]
fn test_for_loop() {
    let source = r#"
        fun main() -> void {
            let total: num = 0;
            for (let i: num = 1; i < 5; i = i + 1) {
                total = total + i;
            }
            print(total);
        }
    "#;
    assert_eq!(run(source), "10\n");
}

#[test]
fn test_if_else() {
    let source = r#"
        fun main() -> void {
            let x: num = 5;
            if (x > 3) {
                print("big");
            } else {
                print("small");
            }
            if (x < 3) {
                print("never");
            }
        }
    "#;
    assert_eq!(run(source), "big\n");
}

#[test]
fn test_unary_not_in_condition() {
    let source = r#"
        fun main() -> void {
            let done: bool = false;
            if (!done) {
                print("working");
            }
        }
    "#;
    assert_eq!(run(source), "working\n");
}

#[test]
fn test_function_call_and_return() {
    let source = r#"
        fun add(a: num, b: num) -> num {
            return a + b;
        }

        fun main() -> void {
            print(add(2, 3));
        }
    "#;
    assert_eq!(run(source), "5\n");
}

#[test]
fn test_return_skips_rest_of_function() {
    let source = r#"
        fun pick(flag: bool) -> string {
            if (flag) {
                return "yes";
            }
            return "no";
        }

        fun main() -> void {
            print(pick(true));
            print(pick(false));
        }
    "#;
    assert_eq!(run(source), "yes\nno\n");
}

#[test]
fn test_recursion() {
    let source = r#"
        fun fib(n: num) -> num {
            if (n < 2) {
                return n;
            }
            return fib(n - 1) + fib(n - 2);
        }

        fun main() -> void {
            print(fib(10));
        }
    "#;
    assert_eq!(run(source), "55\n");
}

#[test]
fn test_frame_isolation() {
    // The callee stores into its own 'x'; the caller's 'x' is untouched.
    let source = r#"
        fun shadow(x: num) -> num {
            x = 7;
            return x;
        }

        fun main() -> void {
            let x: num = 1;
            shadow(x);
            print(x);
        }
    "#;
    assert_eq!(run(source), "1\n");
}

#[test]
fn test_callee_cannot_see_caller_locals() {
    let source = r#"
        fun peek() -> num {
            return hidden;
        }

        fun main() -> void {
            let hidden: num = 42;
            print(peek());
        }
    "#;
    // 'hidden' is not declared in peek, so the reference fails at parse time.
    match run_with_output(source) {
        Err(QuillError::Parse(ParseError::UndefinedReference(name))) => {
            assert_eq!(name, "hidden")
        }
        other => panic!("expected undefined reference, got {:?}", other),
    }
}

#[test]
fn test_equality_uses_epsilon() {
    let source = r#"
        fun main() -> void {
            if (0.1 + 0.2 == 0.3) {
                print("close enough");
            }
        }
    "#;
    assert_eq!(run(source), "close enough\n");
}

#[test]
fn test_missing_main() {
    let source = "fun helper() -> void { }";
    match run_with_output(source) {
        Err(QuillError::Runtime(RuntimeError::NoMain)) => {}
        other => panic!("expected missing main error, got {:?}", other),
    }
}

#[test]
fn test_type_mismatch_in_operator() {
    let source = r#"
        fun main() -> void {
            let x: num = 1 + "one";
        }
    "#;
    match run_with_output(source) {
        Err(QuillError::Runtime(RuntimeError::InvalidOperands { op: "add", .. })) => {}
        other => panic!("expected add error, got {:?}", other),
    }
}

#[test]
fn test_comments_are_ignored() {
    let source = r#"
        // Entry point.
        fun main() -> void {
            /* prints
               a number */
            print(1);
        }
    "#;
    assert_eq!(run(source), "1\n");
}
