use quickcheck_macros::quickcheck;
use std::io::Cursor;
use tiny_basic_interpreter::{
    generate_ast, tokenize, BasicError, CapturedOutput, Interpreter, LineReader, LineWriter,
    NodeKind, RuntimeErrorKind, ScriptedInput, SyntaxErrorKind,
};

/// Helper to run a program with scripted input and collect its output
fn run_program(source: &str, input: &[&str]) -> Vec<String> {
    let mut interpreter = Interpreter::create(
        source,
        ScriptedInput::new(input.iter().copied()),
        CapturedOutput::new(),
    )
    .unwrap();
    interpreter.run().unwrap();
    interpreter.output().lines().to_vec()
}

#[test]
fn test_tokenizer_counts() {
    assert_eq!(tokenize("10 PRINT \"Hello World!\"\n20 END").len(), 6);
    assert_eq!(tokenize("10 PRINT \"Hello World!\"").len(), 3);
}

#[test]
fn test_parser_size_without_trailing_newline() {
    let program = generate_ast(&tokenize("10 PRINT \"Hello World!\"\n20 END")).unwrap();
    assert_eq!(program.size(), 6);
}

#[test]
fn test_end_stops_before_later_lines() {
    let mut interpreter = Interpreter::create(
        "10 PRINT \"Hello World!\"\n20 END\n30 PRINT \"Test\"\n",
        ScriptedInput::default(),
        CapturedOutput::new(),
    )
    .unwrap();
    interpreter.run().unwrap();

    assert!(interpreter.is_halted());
    let stopped_at = interpreter
        .program()
        .node_at(interpreter.program_counter())
        .unwrap();
    assert_eq!(stopped_at.kind, NodeKind::End);
    assert_eq!(
        interpreter.program().source_line(stopped_at.line),
        Some("20 END")
    );
    assert_eq!(interpreter.output().lines(), &["Hello World!".to_string()]);
}

#[test]
fn test_countdown_loop() {
    let source = "\
10 LET N = 3
20 PRINT N
30 LET N = N - 1
40 IF N > 0 GOTO 20
50 PRINT \"liftoff\"
60 END
";
    assert_eq!(run_program(source, &[]), vec!["3", "2", "1", "liftoff"]);
}

#[test]
fn test_subroutine_with_input() {
    let source = "\
10 INPUT NAME
20 GOSUB 100
30 INPUT NAME
40 GOSUB 100
50 END
100 PRINT \"Hello, \" + NAME
110 RETURN
";
    assert_eq!(
        run_program(source, &["Ada", "Grace"]),
        vec!["Hello, Ada", "Hello, Grace"]
    );
}

#[test]
fn test_sum_of_inputs() {
    let source = "\
10 LET TOTAL = 0
20 INPUT X
30 IF X = 0 GOTO 60
40 LET TOTAL = TOTAL + X
50 GOTO 20
60 PRINT TOTAL
";
    assert_eq!(run_program(source, &["1.5", "2", "0"]), vec!["3.5"]);
}

#[test]
fn test_runtime_error_reports_location() {
    let mut interpreter = Interpreter::create(
        "10 LET A = 1\n20 PRINT A + \"x\"",
        ScriptedInput::default(),
        CapturedOutput::new(),
    )
    .unwrap();
    let err = interpreter.run().unwrap_err();
    assert!(matches!(err.kind, RuntimeErrorKind::TypeMismatch { .. }));
    assert_eq!(err.line, 2);
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn test_syntax_error_is_typed() {
    let err = Interpreter::create(
        "10 PRINT 1\n20 PRINT 2\n10 END",
        ScriptedInput::default(),
        CapturedOutput::new(),
    )
    .unwrap_err();
    match err {
        BasicError::Syntax(e) => {
            assert_eq!(e.kind, SyntaxErrorKind::DuplicateLabel(10));
            assert_eq!(e.line, 3);
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn test_forward_reference_resolves_at_run_time() {
    // Line 99 is missing, but that only matters if the GOTO runs
    assert_eq!(
        run_program("10 IF 0 GOTO 99\n20 PRINT \"ok\"", &[]),
        vec!["ok"]
    );
}

#[test]
fn test_stream_collaborators() {
    let mut output = Vec::new();
    {
        let mut interpreter = Interpreter::create(
            "10 INPUT A\n20 PRINT A * 2",
            LineReader::new(Cursor::new("21\n")),
            LineWriter::new(&mut output),
        )
        .unwrap();
        interpreter.run().unwrap();
    }
    assert_eq!(String::from_utf8(output).unwrap(), "42\n");
}

#[test]
fn test_independent_instances() {
    let source = "10 INPUT A\n20 PRINT A";
    let mut first = Interpreter::create(source, ScriptedInput::new(["one"]), CapturedOutput::new())
        .unwrap();
    let mut second = Interpreter::create(source, ScriptedInput::new(["two"]), CapturedOutput::new())
        .unwrap();

    second.run().unwrap();
    first.run().unwrap();

    assert_eq!(first.output().lines(), &["one".to_string()]);
    assert_eq!(second.output().lines(), &["two".to_string()]);
}

#[test]
fn test_list_from_running_program() {
    let output = run_program("10 PRINT 1 + 2\n20 LIST", &[]);
    assert_eq!(
        output,
        vec![
            "3",
            "Label: 10",
            "Print:",
            "  BinaryOp: +",
            "    NumberLiteral: 1",
            "    NumberLiteral: 2",
            "Label: 20",
            "List",
        ]
    );
}

#[test]
fn test_long_single_line_program() {
    let source = format!("10 LET A = 0{}\n20 PRINT A", " + 2".repeat(100_000));
    assert_eq!(run_program(&source, &[]), vec!["200000"]);
}

#[test]
fn test_failing_output_is_reported() {
    struct Closed;

    impl tiny_basic_interpreter::OutputSink for Closed {
        fn write_line(&mut self, _text: &str) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    let mut interpreter =
        Interpreter::create("10 PRINT \"x\"", ScriptedInput::default(), Closed).unwrap();
    let err = interpreter.run().unwrap_err();
    assert_eq!(err.kind, RuntimeErrorKind::Io("closed".to_string()));
    assert_eq!(err.line, 1);
}

/// Dumping the same program twice gives identical text
#[quickcheck]
fn prop_dump_is_idempotent(values: Vec<u16>) -> bool {
    let source: String = values
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{} LET V{i} = {v} + V{i}\n", (i + 1) * 10))
        .collect();
    let program = generate_ast(&tokenize(&source)).unwrap();
    program.dump() == program.dump()
}

/// Arbitrary text never panics the front end; it either parses or fails with
/// a typed error
#[quickcheck]
fn prop_parser_total(source: String) -> bool {
    let _ = generate_ast(&tokenize(&source));
    true
}
