// monkey-vm - VM tests
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

use monkey_core::object::Object;
use monkey_parser::Parser;
use monkey_vm::{Compiler, VM, VmError};

fn run(source: &str) -> Result<Object, VmError> {
    let program = Parser::new(source)
        .parse_program()
        .unwrap_or_else(|errors| panic!("parser errors for {:?}: {:?}", source, errors));
    let mut compiler = Compiler::new();
    compiler
        .compile(&program)
        .unwrap_or_else(|err| panic!("compile error for {:?}: {}", source, err));
    let mut vm = VM::new(compiler.bytecode());
    vm.run()?;
    Ok(vm.last_popped().clone())
}

fn assert_runs(source: &str, expected: &str) {
    let result = run(source).unwrap_or_else(|err| panic!("vm error for {:?}: {}", source, err));
    assert_eq!(result.to_string(), expected, "source: {}", source);
}

fn assert_vm_error(source: &str, expected: &str) {
    let err = run(source).expect_err(&format!("expected vm error for {:?}", source));
    assert_eq!(err.to_string(), expected, "source: {}", source);
}

#[test]
fn test_integer_arithmetic() {
    let cases = [
        ("1", "1"),
        ("2", "2"),
        ("1 + 2", "3"),
        ("1 - 2", "-1"),
        ("1 * 2", "2"),
        ("4 / 2", "2"),
        ("50 / 2 * 2 + 10 - 5", "55"),
        ("5 * (2 + 10)", "60"),
        ("-5", "-5"),
        ("-10", "-10"),
        ("-50 + 100 + -50", "0"),
        ("(5 + 10 * 2 + 15 / 3) * 2 + -10", "50"),
    ];
    for (source, expected) in cases {
        assert_runs(source, expected);
    }
}

#[test]
fn test_boolean_expressions() {
    let cases = [
        ("true", "true"),
        ("false", "false"),
        ("1 < 2", "true"),
        ("1 > 2", "false"),
        ("1 < 1", "false"),
        ("1 == 1", "true"),
        ("1 != 1", "false"),
        ("1 == 2", "false"),
        ("true == true", "true"),
        ("false == false", "true"),
        ("true == false", "false"),
        ("true != false", "true"),
        ("(1 < 2) == true", "true"),
        ("(1 > 2) == true", "false"),
        ("!true", "false"),
        ("!5", "false"),
        ("!!true", "true"),
        ("!!5", "true"),
        ("!(if (false) { 5; })", "true"),
    ];
    for (source, expected) in cases {
        assert_runs(source, expected);
    }
}

#[test]
fn test_conditionals() {
    let cases = [
        ("if (true) { 10 }", "10"),
        ("if (true) { 10 } else { 20 }", "10"),
        ("if (false) { 10 } else { 20 }", "20"),
        ("if (1) { 10 }", "10"),
        ("if (1 < 2) { 10 }", "10"),
        ("if (1 > 2) { 10 } else { 20 }", "20"),
        ("if (1 > 2) { 10 }", "null"),
        ("if (false) { 10 }", "null"),
        ("if ((if (false) { 10 })) { 10 } else { 20 }", "20"),
    ];
    for (source, expected) in cases {
        assert_runs(source, expected);
    }
}

#[test]
fn test_global_let_statements() {
    let cases = [
        ("let one = 1; one", "1"),
        ("let one = 1; let two = 2; one + two", "3"),
        ("let one = 1; let two = one + one; one + two;", "3"),
    ];
    for (source, expected) in cases {
        assert_runs(source, expected);
    }
}

#[test]
fn test_string_expressions() {
    assert_runs(r#""monkey""#, "monkey");
    assert_runs(r#""mon" + "key""#, "monkey");
    assert_runs(r#""mon" + "key" + "banana""#, "monkeybanana");
}

#[test]
fn test_array_literals() {
    assert_runs("[]", "[]");
    assert_runs("[1, 2, 3]", "[1, 2, 3]");
    assert_runs("[1 + 2, 3 * 4, 5 + 6]", "[3, 12, 11]");
}

#[test]
fn test_hash_literals() {
    assert_runs("{}", "{}");
    assert_runs("{1: 2, 2: 3}", "{1: 2, 2: 3}");
    assert_runs("{1 + 1: 2 * 2, 3 + 3: 4 * 4}", "{2: 4, 6: 16}");
}

#[test]
fn test_index_expressions() {
    let cases = [
        ("[1, 2, 3][1]", "2"),
        ("[1, 2, 3][0 + 2]", "3"),
        ("[[1, 1, 1]][0][0]", "1"),
        ("[][0]", "null"),
        ("[1, 2, 3][99]", "null"),
        ("[1][-1]", "null"),
        ("{1: 1, 2: 2}[1]", "1"),
        ("{1: 1, 2: 2}[2]", "2"),
        ("{1: 1}[0]", "null"),
        ("{}[0]", "null"),
    ];
    for (source, expected) in cases {
        assert_runs(source, expected);
    }
}

#[test]
fn test_calling_functions() {
    let cases = [
        ("let fivePlusTen = fn() { 5 + 10; }; fivePlusTen();", "15"),
        (
            "let one = fn() { 1; }; let two = fn() { 2; }; one() + two()",
            "3",
        ),
        (
            "let a = fn() { 1 }; let b = fn() { a() + 1 }; let c = fn() { b() + 1 }; c();",
            "3",
        ),
        ("let earlyExit = fn() { return 99; 100; }; earlyExit();", "99"),
        ("let noReturn = fn() { }; noReturn();", "null"),
        (
            "let noReturn = fn() { }; let noReturnTwo = fn() { noReturn(); }; noReturn(); noReturnTwo();",
            "null",
        ),
        (
            "let returnsOne = fn() { 1; }; let returnsOneReturner = fn() { returnsOne; }; returnsOneReturner()();",
            "1",
        ),
    ];
    for (source, expected) in cases {
        assert_runs(source, expected);
    }
}

#[test]
fn test_calling_functions_with_bindings() {
    let cases = [
        ("let one = fn() { let one = 1; one }; one();", "1"),
        (
            "let oneAndTwo = fn() { let one = 1; let two = 2; one + two; }; oneAndTwo();",
            "3",
        ),
        (
            "let firstFoobar = fn() { let foobar = 50; foobar; };
             let secondFoobar = fn() { let foobar = 100; foobar; };
             firstFoobar() + secondFoobar();",
            "150",
        ),
        (
            "let globalSeed = 50;
             let minusOne = fn() { let num = 1; globalSeed - num; };
             let minusTwo = fn() { let num = 2; globalSeed - num; };
             minusOne() + minusTwo();",
            "97",
        ),
    ];
    for (source, expected) in cases {
        assert_runs(source, expected);
    }
}

#[test]
fn test_calling_functions_with_arguments() {
    let cases = [
        ("let identity = fn(a) { a; }; identity(4);", "4"),
        ("let sum = fn(a, b) { a + b; }; sum(1, 2);", "3"),
        (
            "let sum = fn(a, b) { let c = a + b; c; }; sum(1, 2) + sum(3, 4);",
            "10",
        ),
        (
            "let globalNum = 10;
             let sum = fn(a, b) { let c = a + b; c + globalNum; };
             let outer = fn() { sum(1, 2) + sum(3, 4) + globalNum; };
             outer() + globalNum;",
            "50",
        ),
    ];
    for (source, expected) in cases {
        assert_runs(source, expected);
    }
}

#[test]
fn test_wrong_arity_is_fatal() {
    assert_vm_error(
        "fn() { 1; }(1);",
        "wrong number of arguments: want=0, got=1",
    );
    assert_vm_error(
        "fn(a) { a; }();",
        "wrong number of arguments: want=1, got=0",
    );
    assert_vm_error(
        "fn(a, b) { a + b; }(1);",
        "wrong number of arguments: want=2, got=1",
    );
}

#[test]
fn test_builtin_functions() {
    let cases = [
        (r#"len("")"#, "0"),
        (r#"len("four")"#, "4"),
        (r#"len("hello world")"#, "11"),
        ("len([1, 2, 3])", "3"),
        ("len([])", "0"),
        ("first([1, 2, 3])", "1"),
        ("first([])", "null"),
        ("last([1, 2, 3])", "3"),
        ("last([])", "null"),
        ("rest([1, 2, 3])", "[2, 3]"),
        ("rest([])", "null"),
        ("push([], 1)", "[1]"),
        // Built-in failures are in-band Error values, not fatal.
        ("len(1)", "ERROR: argument to `len` not supported, got INTEGER"),
        (
            r#"len("one", "two")"#,
            "ERROR: wrong number of arguments. got=2, want=1",
        ),
        ("first(1)", "ERROR: argument to `first` must be ARRAY, got INTEGER"),
        ("last(1)", "ERROR: argument to `last` must be ARRAY, got INTEGER"),
        ("push(1, 1)", "ERROR: argument to `push` must be ARRAY, got INTEGER"),
    ];
    for (source, expected) in cases {
        assert_runs(source, expected);
    }
}

#[test]
fn test_push_does_not_mutate_original() {
    assert_runs(
        "let a = [1, 2]; let b = push(a, 3); len(b) == len(a) + 1;",
        "true",
    );
    assert_runs("let a = [1, 2]; push(a, 3); a;", "[1, 2]");
}

#[test]
fn test_closures() {
    let cases = [
        (
            "let newClosure = fn(a) { fn() { a; }; }; let closure = newClosure(99); closure();",
            "99",
        ),
        (
            "let newAdder = fn(a, b) { fn(c) { a + b + c }; }; let adder = newAdder(1, 2); adder(8);",
            "11",
        ),
        (
            "let newAdder = fn(a,b){ fn(c){ a+b+c } }; newAdder(1,2)(8);",
            "11",
        ),
        (
            "let newAdder = fn(a, b) { let c = a + b; fn(d) { c + d }; };
             let adder = newAdder(1, 2); adder(8);",
            "11",
        ),
        (
            "let newAdderOuter = fn(a, b) {
               let c = a + b;
               fn(d) { let e = d + c; fn(f) { e + f; }; };
             };
             let newAdderInner = newAdderOuter(1, 2);
             let adder = newAdderInner(3);
             adder(8);",
            "14",
        ),
        (
            "let a = 1;
             let newAdderOuter = fn(b) { fn(c) { fn(d) { a + b + c + d }; }; };
             let newAdderInner = newAdderOuter(2);
             let adder = newAdderInner(3);
             adder(8);",
            "14",
        ),
        (
            "let newClosure = fn(a, b) {
               let one = fn() { a; };
               let two = fn() { b; };
               fn() { one() + two(); };
             };
             let closure = newClosure(9, 90);
             closure();",
            "99",
        ),
    ];
    for (source, expected) in cases {
        assert_runs(source, expected);
    }
}

#[test]
fn test_recursive_functions() {
    let cases = [
        (
            "let countDown = fn(x) { if (x == 0) { return 0; } else { countDown(x - 1); } };
             countDown(1);",
            "0",
        ),
        (
            "let countDown = fn(x){ if(x==0){ return 0 } else { countDown(x-1) } }; countDown(1);",
            "0",
        ),
        (
            "let countDown = fn(x) { if (x == 0) { return 0; } else { countDown(x - 1); } };
             let wrapper = fn() { countDown(1); };
             wrapper();",
            "0",
        ),
        (
            "let wrapper = fn() {
               let countDown = fn(x) { if (x == 0) { return 0; } else { countDown(x - 1); } };
               countDown(1);
             };
             wrapper();",
            "0",
        ),
        (
            "let fibonacci = fn(x) {
               if (x == 0) { return 0; }
               if (x == 1) { return 1; }
               fibonacci(x - 1) + fibonacci(x - 2);
             };
             fibonacci(15);",
            "610",
        ),
    ];
    for (source, expected) in cases {
        assert_runs(source, expected);
    }
}

#[test]
fn test_fatal_errors() {
    assert_vm_error(
        "5 + true",
        "unsupported types for binary operation: INTEGER BOOLEAN",
    );
    assert_vm_error("-true", "unsupported type for negation: BOOLEAN");
    assert_vm_error(r#""a" - "b""#, "unknown string operator: 3");
    assert_vm_error(r#""a" > "b""#, "unknown operator: 10 (STRING STRING)");
    assert_vm_error("1 / 0", "division by zero");
    assert_vm_error("5(1)", "calling non-function and non-builtin");
    assert_vm_error("1[0]", "index operator not supported: INTEGER");
    assert_vm_error(
        r#"{"name": "Monkey"}[fn(x) { x }];"#,
        "unusable as hash key: CLOSURE",
    );
    assert_vm_error("{[1]: 2}", "unusable as hash key: ARRAY");
}

#[test]
fn test_unbounded_recursion_is_fatal() {
    assert_vm_error("let f = fn() { f(); }; f();", "stack overflow");
}

#[test]
fn test_last_popped_convention() {
    // After a completed run the last expression statement's value is
    // retrievable even though its trailing Pop balanced the stack.
    let cases = [("1;", "1"), ("1; 2;", "2"), ("let a = 7;", "7")];
    for (source, expected) in cases {
        assert_runs(source, expected);
    }
}

#[test]
fn test_session_state_threads_through_cycles() {
    // The REPL scenario: symbol table, constants and globals persist
    // across compile/run cycles.
    let symbol_table = monkey_vm::SymbolTable::new();
    for (i, builtin) in monkey_core::BUILTINS.iter().enumerate() {
        symbol_table.define_builtin(i, builtin.name);
    }
    let mut constants = Vec::new();
    let mut globals = vec![Object::Null; monkey_vm::GLOBALS_SIZE];

    let lines = [
        ("let acc = 5;", "5"),
        ("let bump = fn(x) { x + acc };", "CLOSURE"),
        ("bump(10)", "15"),
        ("acc + 1", "6"),
    ];
    for (line, expected) in lines {
        let program = Parser::new(line).parse_program().unwrap();
        let mut compiler = Compiler::with_state(symbol_table.clone(), constants);
        compiler.compile(&program).unwrap();
        let bytecode = compiler.bytecode();
        constants = bytecode.constants.clone();

        let mut vm = VM::with_globals(bytecode, globals);
        vm.run().unwrap();
        let result = vm.last_popped().clone();
        globals = vm.into_globals();

        if expected == "CLOSURE" {
            assert_eq!(result.type_name(), "CLOSURE");
        } else {
            assert_eq!(result.to_string(), expected, "line: {}", line);
        }
    }
}
