#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use glox::error::{CollectingReporter, Failure, Stage};
    use glox::value::Value;
    use glox::Lox;
    use pretty_assertions::assert_eq;

    /// `print` sink the test can read back.
    #[derive(Clone, Default)]
    struct Captured(Rc<RefCell<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    struct Outcome {
        result: Result<Value, Failure>,
        printed: String,
        errors: Vec<String>,
    }

    fn run(source: &str) -> Outcome {
        let out = Captured::default();
        let mut lox = Lox::with_output(Box::new(out.clone()));
        let mut reporter = CollectingReporter::new();

        let result = lox.run(source, &mut reporter);

        Outcome {
            result,
            printed: out.text(),
            errors: reporter.messages(),
        }
    }

    fn eval(source: &str) -> Value {
        let outcome = run(source);

        match outcome.result {
            Ok(value) => value,
            Err(failure) => panic!("{} for {:?}: {:?}", failure, source, outcome.errors),
        }
    }

    fn runtime_error(source: &str) -> String {
        let outcome = run(source);

        assert_eq!(outcome.result, Err(Failure::Runtime), "{:?}", source);
        assert_eq!(outcome.errors.len(), 1);
        outcome.errors[0].clone()
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(eval("2+3*4-4/2;"), Value::Number(12.0));
        assert_eq!(eval("(2+3)*4;"), Value::Number(20.0));
        assert_eq!(eval("-2 - -3;"), Value::Number(1.0));
    }

    #[test]
    fn test_conditional_expression() {
        assert_eq!(eval("2<=3?3-1:false;"), Value::Number(2.0));
        assert_eq!(eval("2==3?3-1:false;"), Value::Bool(false));
        assert_eq!(eval("false ? 1 : true ? 2 : 3;"), Value::Number(2.0));
    }

    #[test]
    fn test_conditional_evaluates_one_branch() {
        let source = "var hits = 0;\n\
                      fun bump() { hits = hits + 1; return hits; }\n\
                      true ? 1 : bump();\n\
                      false ? bump() : 2;\n\
                      hits;";

        assert_eq!(eval(source), Value::Number(0.0));
    }

    #[test]
    fn test_while_leaves_last_value() {
        assert_eq!(
            eval("var counter=0; while(counter<5){counter=counter+1;} "),
            Value::Number(5.0)
        );
    }

    #[test]
    fn test_break_stops_loop() {
        assert_eq!(
            eval("var counter=0; while(counter<5){counter=counter+1; break; counter=0;}"),
            Value::Number(1.0)
        );
    }

    #[test]
    fn test_continue_skips_rest_of_body() {
        assert_eq!(
            eval("var counter=0; while(counter<5){counter=counter+1; continue; counter=0;}"),
            Value::Number(5.0)
        );
    }

    #[test]
    fn test_continue_in_for_still_runs_increment() {
        let source = "var n = 0;\n\
                      for (var i = 0; i < 5; i = i + 1) { if (i == 2) continue; n = n + 1; }\n\
                      n;";

        assert_eq!(eval(source), Value::Number(4.0));
    }

    #[test]
    fn test_break_only_leaves_inner_loop() {
        let source = "var c = 0;\n\
                      for (var i = 0; i < 3; i = i + 1) {\n\
                        for (var j = 0; j < 3; j = j + 1) { if (j == 1) break; c = c + 1; }\n\
                      }\n\
                      c;";

        assert_eq!(eval(source), Value::Number(3.0));
    }

    #[test]
    fn test_for_matches_equivalent_while() {
        let desugared = eval("for(var i=0;i<5;i=i+1){i;}");
        let manual = eval("{ var i=0; while(i<5){ i; i=i+1; } }");

        assert_eq!(desugared, Value::Number(5.0));
        assert_eq!(desugared, manual);
    }

    #[test]
    fn test_for_with_continue_matches_while_incrementing_before_continue() {
        let desugared = eval(
            "var n = 0;\n\
             for (var i = 0; i < 5; i = i + 1) { if (i == 2) continue; n = n + 1; }\n\
             n;",
        );
        let manual = eval(
            "var n = 0;\n\
             { var i = 0; while (i < 5) { if (i == 2) { i = i + 1; continue; } n = n + 1; i = i + 1; } }\n\
             n;",
        );

        assert_eq!(desugared, Value::Number(4.0));
        assert_eq!(desugared, manual);
    }

    #[test]
    fn test_return_unwinds_loops_and_blocks() {
        let source = "fun find() {\n\
                        for (var i = 0; i < 100; i = i + 1) {\n\
                          { if (i == 2) { return i; } }\n\
                        }\n\
                        return -1;\n\
                      }\n\
                      find();";

        assert_eq!(eval(source), Value::Number(2.0));
    }

    #[test]
    fn test_implicit_nil_return() {
        assert_eq!(eval("fun f(arg) { var counter = arg; } f(1.0);"), Value::Nil);
        assert_eq!(eval("fun g() { return; } g();"), Value::Nil);
    }

    #[test]
    fn test_recursion() {
        let source = "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }\n\
                      fib(19);";

        assert_eq!(eval(source), Value::Number(4181.0));
    }

    #[test]
    fn test_local_recursion() {
        let source = "{ fun count(n) { if (n > 0) return count(n - 1) + 1; return 0; } count(4); }";

        assert_eq!(eval(source), Value::Number(4.0));
    }

    #[test]
    fn test_mutual_recursion_between_local_functions() {
        let pair = "fun even(n) { if (n == 0) return true; return odd(n - 1); }\n\
                    fun odd(n) { if (n == 0) return false; return even(n - 1); }\n";

        assert_eq!(eval(&format!("{{ {} even(4); }}", pair)), Value::Bool(true));
        assert_eq!(eval(&format!("{{ {} odd(4); }}", pair)), Value::Bool(false));
        assert_eq!(eval(&format!("{} even(3);", pair)), Value::Bool(false));
        assert_eq!(
            eval(&format!("fun outer() {{ {} return even(6); }} outer();", pair)),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_local_function_called_before_sibling_declared() {
        assert_eq!(
            runtime_error("{ fun a() { return b(); } a(); fun b() { return 1; } }"),
            "[line 1] Runtime error: Undefined variable 'b'."
        );
    }

    #[test]
    fn test_closure_counter_shares_state() {
        let source = "fun makeCounter() {\n\
                        var i = 0;\n\
                        fun count() { i = i + 1; return i; }\n\
                        return count;\n\
                      }\n\
                      var c = makeCounter();\n\
                      c(); c();\n\
                      var other = makeCounter();\n\
                      other();\n\
                      c();";

        assert_eq!(eval(source), Value::Number(3.0));
    }

    #[test]
    fn test_sibling_closures_share_one_frame() {
        let source = "var get; var set;\n\
                      fun make() {\n\
                        var v = 1;\n\
                        fun g() { return v; }\n\
                        fun s(x) { v = x; }\n\
                        get = g; set = s;\n\
                      }\n\
                      make();\n\
                      set(42);\n\
                      get();";

        assert_eq!(eval(source), Value::Number(42.0));
    }

    #[test]
    fn test_closure_binds_lexically() {
        let source = "var a = \"global\";\n\
                      {\n\
                        fun show() { print a; }\n\
                        show();\n\
                        var a = \"block\";\n\
                        show();\n\
                      }";

        let outcome = run(source);

        assert_eq!(outcome.result, Ok(Value::Nil));
        assert_eq!(outcome.printed, "global\nglobal\n");
    }

    #[test]
    fn test_block_scope_is_restored() {
        let source = "var a = 1; { var a = 2; print a; } print a;";

        assert_eq!(run(source).printed, "2\n1\n");
    }

    #[test]
    fn test_print_formats() {
        let source = "print 1 + 2; print \"a\" + \"b\"; print nil; print true; print 2.5;\n\
                      fun f() {} print f; print clock;";

        assert_eq!(
            run(source).printed,
            "3\nab\nnil\ntrue\n2.5\n<fn f>\n<native fn clock>\n"
        );
    }

    #[test]
    fn test_last_value_tracks_print_and_var() {
        assert_eq!(eval("print 7;"), Value::Number(7.0));
        assert_eq!(eval("var x = \"v\";"), Value::from("v"));
        assert_eq!(eval("var y;"), Value::Nil);
        assert_eq!(eval("fun f() {}"), Value::Nil);
    }

    #[test]
    fn test_clock() {
        assert_eq!(eval("clock() > 0;"), Value::Bool(true));
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(eval("0 ? 1 : 2;"), Value::Number(2.0));
        assert_eq!(eval("-1 ? 1 : 2;"), Value::Number(2.0));
        assert_eq!(eval("0.5 ? 1 : 2;"), Value::Number(1.0));
        assert_eq!(eval("\"\" ? 1 : 2;"), Value::Number(2.0));
        assert_eq!(eval("\"x\" ? 1 : 2;"), Value::Number(1.0));
        assert_eq!(eval("nil ? 1 : 2;"), Value::Number(2.0));
        assert_eq!(eval("!0;"), Value::Bool(true));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(eval("nil or \"default\";"), Value::from("default"));
        assert_eq!(eval("\"x\" or 1;"), Value::from("x"));
        assert_eq!(eval("false and 1;"), Value::Bool(false));
        assert_eq!(eval("true and 3;"), Value::Number(3.0));
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        let source = "var hits = 0;\n\
                      fun bump() { hits = hits + 1; return true; }\n\
                      true or bump();\n\
                      false and bump();\n\
                      false or bump();\n\
                      hits;";

        assert_eq!(eval(source), Value::Number(1.0));
    }

    #[test]
    fn test_equality_has_no_coercion() {
        assert_eq!(eval("1 == \"1\";"), Value::Bool(false));
        assert_eq!(eval("nil == nil;"), Value::Bool(true));
        assert_eq!(eval("\"a\" == \"a\";"), Value::Bool(true));
        assert_eq!(eval("nil != false;"), Value::Bool(true));
        assert_eq!(eval("fun f() {} f == f;"), Value::Bool(true));
        assert_eq!(eval("clock == clock;"), Value::Bool(true));
    }

    #[test]
    fn test_numeric_strings_coerce_for_arithmetic() {
        assert_eq!(eval("\"3\" * 2;"), Value::Number(6.0));
        assert_eq!(eval("\"10\" > 9;"), Value::Bool(true));
        assert_eq!(eval("-\"4\";"), Value::Number(-4.0));
        assert_eq!(eval("\"2.5\" * 2;"), Value::Number(5.0));
    }

    #[test]
    fn test_only_literal_shaped_strings_coerce() {
        for text in ["inf", "nan", "NaN", "1e3", "+5", "-5", " 5", "5.", ".5", ""] {
            let source = format!("\"{}\" * 2;", text);

            assert_eq!(
                runtime_error(&source),
                "[line 1] Runtime error: Operands must be numbers.",
                "string {:?}",
                text
            );
        }

        assert_eq!(
            runtime_error("-\"infinity\";"),
            "[line 1] Runtime error: Operand must be a number."
        );
    }

    #[test]
    fn test_division_follows_ieee() {
        assert_eq!(eval("1 / 0;"), Value::Number(f64::INFINITY));
    }

    #[test]
    fn test_assignment_yields_value() {
        assert_eq!(eval("var a; var b = a = 3; a + b;"), Value::Number(6.0));
    }

    #[test]
    fn test_runtime_errors() {
        assert_eq!(
            runtime_error("print undefinedVar;"),
            "[line 1] Runtime error: Undefined variable 'undefinedVar'."
        );
        assert_eq!(
            runtime_error("x = 1;"),
            "[line 1] Runtime error: Undefined variable 'x'."
        );
        assert_eq!(
            runtime_error("\"a\"();"),
            "[line 1] Runtime error: Can only call functions."
        );
        assert_eq!(
            runtime_error("fun f(a) {}\nf();"),
            "[line 2] Runtime error: Expected 1 arguments but got 0."
        );
        assert_eq!(
            runtime_error("-\"abc\";"),
            "[line 1] Runtime error: Operand must be a number."
        );
        assert_eq!(
            runtime_error("\"a\" - 1;"),
            "[line 1] Runtime error: Operands must be numbers."
        );
        assert_eq!(
            runtime_error("\"3\" + 2;"),
            "[line 1] Runtime error: Operands must be two numbers or two strings."
        );
        assert_eq!(
            runtime_error("fun f() {}\nif (f) print 1;"),
            "[line 2] Runtime error: Can't use a function as a condition."
        );
    }

    #[test]
    fn test_side_effects_before_runtime_error_stand() {
        let outcome = run("print 1;\nprint nope;\nprint 2;");

        assert_eq!(outcome.result, Err(Failure::Runtime));
        assert_eq!(outcome.printed, "1\n");
        assert_eq!(
            outcome.errors,
            vec!["[line 2] Runtime error: Undefined variable 'nope'."]
        );
    }

    #[test]
    fn test_syntax_error_prevents_evaluation() {
        let outcome = run("print 1;\nvar = 2;");

        assert_eq!(outcome.result, Err(Failure::Compile));
        assert_eq!(outcome.printed, "");
        assert_eq!(
            outcome.errors,
            vec!["[line 2] Error: at '=': Expect variable name."]
        );
    }

    #[test]
    fn test_resolution_error_prevents_evaluation() {
        let outcome = run("print 1;\n{ var a = a; }");

        assert_eq!(outcome.result, Err(Failure::Compile));
        assert_eq!(outcome.printed, "");
        assert_eq!(
            outcome.errors,
            vec!["[line 2] Error: at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_lexical_and_syntax_errors_reported_together() {
        let outcome = run("@ # $;");

        assert_eq!(outcome.result, Err(Failure::Compile));
        assert_eq!(
            outcome.errors,
            vec![
                "[line 1] Error: Unexpected character: @",
                "[line 1] Error: Unexpected character: #",
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: at ';': Expect expression.",
            ]
        );
    }

    #[test]
    fn test_collected_errors_keep_stage_and_line() {
        let mut lox = Lox::with_output(Box::new(io::sink()));
        let mut reporter = CollectingReporter::new();

        assert_eq!(lox.run("var a = 1;\nprint a - nil;", &mut reporter), Err(Failure::Runtime));

        let collected: Vec<(Stage, usize, String)> = reporter
            .errors()
            .iter()
            .map(|err| (err.stage(), err.line(), err.message()))
            .collect();

        assert_eq!(
            collected,
            vec![(Stage::Interpreter, 2, "Operands must be numbers.".to_string())]
        );
    }

    #[test]
    fn test_failure_exit_codes() {
        assert_eq!(Failure::Compile.exit_code(), 65);
        assert_eq!(Failure::Runtime.exit_code(), 70);
    }

    #[test]
    fn test_session_keeps_globals_and_closures() {
        let out = Captured::default();
        let mut lox = Lox::with_output(Box::new(out.clone()));
        let mut reporter = CollectingReporter::new();

        let first = lox.run(
            "fun make() { var x = 10; fun g() { return x; } return g; }\nvar g = make();",
            &mut reporter,
        );
        assert!(matches!(first, Ok(Value::Callable(_))));

        assert_eq!(lox.run("{ var y = 1; g() + y; }", &mut reporter), Ok(Value::Number(11.0)));
        assert_eq!(lox.run("7;", &mut reporter), Ok(Value::Number(7.0)));

        // Last value starts over on every run.
        assert_eq!(lox.run("fun h() {}", &mut reporter), Ok(Value::Nil));
    }

    #[test]
    fn test_session_recovers_after_errors() {
        let mut lox = Lox::with_output(Box::new(io::sink()));
        let mut reporter = CollectingReporter::new();

        assert_eq!(lox.run("var a = 1;", &mut reporter), Ok(Value::Number(1.0)));
        assert_eq!(lox.run("a +;", &mut reporter), Err(Failure::Compile));
        assert_eq!(lox.run("a = b;", &mut reporter), Err(Failure::Runtime));
        assert_eq!(lox.run("a + 1;", &mut reporter), Ok(Value::Number(2.0)));
        assert!(reporter.errors().is_empty());
    }
}
