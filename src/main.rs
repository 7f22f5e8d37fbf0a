use std::{env, fs, path::Path, process};

use cinder::bytecode::disasm::print_program;
use cinder::frontend::lexer::Lexer;
use cinder::frontend::parser::Parser;
use cinder::frontend::token_dumper::TokenDumper;
use cinder::{compile, Vm};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CINDER_LOG")
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_env("RUST_LOG"))
                .unwrap_or_else(|_| "cinder=warn".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let tokens_only = args.contains(&"--tokens".to_string());
    let no_color = args.contains(&"--no-color".to_string());
    let pretty = args.contains(&"--pretty".to_string());
    let ast = args.contains(&"--ast".to_string());
    let bytecode = args.contains(&"--bc".to_string());
    let trace = args.contains(&"--trace".to_string());

    // first non-flag argument is the filename
    let filename = args.iter().skip(1).find(|a| !a.starts_with('-'));

    match filename {
        Some(filename) => {
            ensure_extension(filename);
            match fs::read_to_string(filename) {
                Ok(source) => {
                    if tokens_only {
                        dump_tokens(&source, no_color, pretty);
                    } else if ast {
                        dump_ast(&source);
                    } else if bytecode {
                        dump_bytecode(&source);
                    } else {
                        run_program(&source, trace);
                    }
                }
                Err(e) => {
                    eprintln!("Failed to read '{}': {}", filename, e);
                    process::exit(1);
                }
            }
        }
        None => print_usage(),
    }
}

fn ensure_extension(filename: &str) {
    let path = Path::new(filename);
    if path.extension().and_then(|e| e.to_str()) != Some("cin") {
        eprintln!("Error: expected a .cin file, got {}", filename);
        process::exit(1);
    }
}

fn print_usage() {
    println!("CINDER - a small C-like language on an observable stack VM");
    println!();
    println!("Usage:");
    println!("  cinder <file.cin>           Compile and run a program");
    println!("  cinder --tokens <file.cin>  Show tokens only (--no-color, --pretty)");
    println!("  cinder --ast <file.cin>     Show the parse tree");
    println!("  cinder --bc <file.cin>      Show the compiled bytecode");
    println!("  cinder --trace <file.cin>   Run stepwise, printing each instruction");
}

fn dump_tokens(source: &str, no_color: bool, pretty: bool) {
    let mut lexer = Lexer::new(source);
    match lexer.tokenize() {
        Ok(tokens) => {
            let mut dumper = TokenDumper::new();
            if no_color {
                dumper = dumper.no_color();
            }
            if pretty {
                dumper = dumper.pretty();
            }
            dumper.dump(&tokens);
        }
        Err(e) => {
            eprintln!("Compile error: {}", e);
            process::exit(1);
        }
    }
}

fn dump_ast(source: &str) {
    let tokens = match Lexer::new(source).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("Compile error: {}", e);
            process::exit(1);
        }
    };
    match Parser::new(tokens).parse() {
        Ok(program) => println!("{:#?}", program),
        Err(e) => {
            eprintln!("Compile error: {}", e);
            process::exit(1);
        }
    }
}

fn dump_bytecode(source: &str) {
    match compile(source) {
        Ok(program) => print_program(&program),
        Err(e) => {
            eprintln!("Compile error: {}", e);
            process::exit(1);
        }
    }
}

fn run_program(source: &str, trace: bool) {
    let program = match compile(source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Compile error: {}", e);
            process::exit(1);
        }
    };

    let mut vm = Vm::new(program);
    let result = if trace { run_traced(&mut vm) } else { vm.run_to_end() };

    match result {
        Ok(Some(value)) => println!("{}", value),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            process::exit(1);
        }
    }
}

/// Steps the VM by hand, showing each instruction and the stack after it.
fn run_traced(vm: &mut Vm) -> Result<Option<cinder::Value>, cinder::RuntimeError> {
    loop {
        let ip = vm.ip();
        let op = vm.program().ops().get(ip).cloned();
        let step = vm.step()?;
        if let Some(op) = op {
            println!("[{:04}] {:<24} stack={:?}", ip, format!("{:?}", op), vm.stack());
        }
        if step.done {
            return Ok(step.value);
        }
    }
}
