// monkey - A Monkey interpreter written in Rust
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process;

use monkey_core::{Environment, Object, eval_program};
use monkey_parser::{ParseError, Parser};
use monkey_vm::{Compiler, GLOBALS_SIZE, SymbolTable, VM};

const PROMPT: &str = ">> ";

fn main() {
    let mut use_eval = false;
    let mut file: Option<String> = None;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("Monkey v0.1.0");
                return;
            }
            "--eval" => use_eval = true,
            _ => file = Some(arg),
        }
    }

    match file {
        Some(path) => run_file(&path, use_eval),
        None => run_repl(use_eval),
    }
}

/// Compile and execute a whole source file. Output comes only from
/// `puts`; failures go to stderr with exit code 1.
fn run_file(path: &str, use_eval: bool) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error reading '{}': {}", path, err);
            process::exit(1);
        }
    };

    let program = match Parser::new(&source).parse_program() {
        Ok(program) => program,
        Err(errors) => {
            eprintln!("parser errors:");
            for error in errors {
                eprintln!("\t{}", error);
            }
            process::exit(1);
        }
    };

    if use_eval {
        let env = Environment::new();
        if let Object::Error(message) = eval_program(&program, &env) {
            eprintln!("ERROR: {}", message);
            process::exit(1);
        }
        return;
    }

    let mut compiler = Compiler::new();
    if let Err(err) = compiler.compile(&program) {
        eprintln!("Woops! Compilation failed:\n {}", err);
        process::exit(1);
    }

    let mut machine = VM::new(compiler.bytecode());
    if let Err(err) = machine.run() {
        eprintln!("Woops! Executing bytecode failed:\n {}", err);
        process::exit(1);
    }
}

/// The interactive session. Compiler and VM state persist across
/// lines, so definitions stay bound from one prompt to the next.
fn run_repl(use_eval: bool) {
    let user = env::var("USER").unwrap_or_else(|_| String::from("there"));
    println!("Hello {}! This is the Monkey programming language!", user);
    println!("feel free to type in commands");

    if use_eval {
        run_eval_repl();
        return;
    }

    let symbol_table = SymbolTable::new();
    for (i, builtin) in monkey_core::BUILTINS.iter().enumerate() {
        symbol_table.define_builtin(i, builtin.name);
    }
    let mut constants: Vec<Object> = Vec::new();
    let mut globals: Vec<Object> = vec![Object::Null; GLOBALS_SIZE];

    loop {
        let line = match read_line() {
            Some(line) => line,
            None => return,
        };
        if line.trim().is_empty() {
            continue;
        }

        let program = match Parser::new(&line).parse_program() {
            Ok(program) => program,
            Err(errors) => {
                print_parser_errors(&errors);
                continue;
            }
        };

        let mut compiler = Compiler::with_state(symbol_table.clone(), constants.clone());
        if let Err(err) = compiler.compile(&program) {
            // The pool is not updated: a failed line's partial
            // constants are discarded.
            println!("Woops! Compilation failed:\n {}", err);
            continue;
        }

        let bytecode = compiler.bytecode();
        constants = bytecode.constants.clone();

        let mut machine = VM::with_globals(bytecode, std::mem::take(&mut globals));
        let outcome = machine.run();
        let result = machine.last_popped().clone();
        globals = machine.into_globals();

        match outcome {
            Ok(()) => println!("{}", result),
            Err(err) => println!("Woops! Executing bytecode failed:\n {}", err),
        }
    }
}

/// The tree-walking variant of the session, selected with `--eval`.
fn run_eval_repl() {
    let env = Environment::new();
    loop {
        let line = match read_line() {
            Some(line) => line,
            None => return,
        };
        if line.trim().is_empty() {
            continue;
        }

        match Parser::new(&line).parse_program() {
            Ok(program) => println!("{}", eval_program(&program, &env)),
            Err(errors) => print_parser_errors(&errors),
        }
    }
}

/// Prompt and read one line. `None` means end of input.
fn read_line() -> Option<String> {
    print!("{}", PROMPT);
    io::stdout().flush().expect("flushing stdout");

    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) => {
            println!();
            None
        }
        Ok(_) => Some(line),
        Err(err) => {
            eprintln!("Read error: {}", err);
            None
        }
    }
}

fn print_parser_errors(errors: &[ParseError]) {
    println!("parser errors:");
    for error in errors {
        println!("\t{}", error);
    }
}
