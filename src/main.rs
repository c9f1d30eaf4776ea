use std::{env, fs};

use tracing_subscriber::filter::EnvFilter;

use lazyc::bytecode::compile::{CompiledFunction, Compiler, FormalDefault};
use lazyc::bytecode::disasm::print_function;
use lazyc::bytecode::image::FunctionImage;
use lazyc::bytecode::ir::Function;
use lazyc::bytecode::pool::ConstantPool;
use lazyc::bytecode::verify::CodeVerifier;
use lazyc::lang::closure::Formal;
use lazyc::lang::node::{Arg, Node};
use lazyc::lang::value::{Symbol, Value};

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None | Some("demo") => {
            let out = flag_value(&args, "--out");
            run_demo(out);
        }
        Some("disasm") => match args.get(2) {
            Some(file) => run_disasm(file),
            None => usage_error(),
        },
        Some("verify") => match args.get(2) {
            Some(file) => run_verify(file),
            None => usage_error(),
        },
        Some("--help") | Some("-h") => print_usage(),
        Some(_) => usage_error(),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let pos = args.iter().position(|a| a == flag)?;
    match args.get(pos + 1) {
        Some(value) => Some(value.as_str()),
        None => {
            eprintln!("Error: {} expects a file name", flag);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("LAZYC - bytecode compiler for a lazy stack machine");
    println!();
    println!("Usage:");
    println!("  lazyc                        Compile and disassemble the demo closure");
    println!("  lazyc demo [--out <file>]    Same, optionally saving the image");
    println!("  lazyc disasm <file>          Disassemble a saved image");
    println!("  lazyc verify <file>          Verify a saved image");
    println!("  lazyc --help, -h             Show this help");
}

fn usage_error() -> ! {
    print_usage();
    std::process::exit(1);
}

/// `function(x, n = 10L) f(x, scale = g(n), ...)`
fn demo_closure() -> (Node, Vec<Formal>) {
    let body = Node::call(
        Node::sym("f"),
        vec![
            Arg::positional(Node::sym("x")),
            Arg::named(
                "scale",
                Node::call(Node::sym("g"), vec![Arg::positional(Node::sym("n"))]),
            ),
            Arg::positional(Node::Symbol(Symbol::Dots)),
        ],
    );
    let formals = vec![
        Formal::required("x"),
        Formal::new("n", Node::literal(Value::Integer(10))),
        Formal::required("..."),
    ];
    (body, formals)
}

fn run_demo(out: Option<&str>) {
    let pool = ConstantPool::new();
    let (body, formals) = demo_closure();

    let compiled = match Compiler::new(&pool).finalize(&body, &formals) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    print_formals(&compiled);
    print_function(&compiled.function, &pool);

    if let Some(path) = out {
        let bytes = match FunctionImage::capture(&compiled.function, &pool).to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = fs::write(path, bytes) {
            eprintln!("Failed to write '{}': {}", path, e);
            std::process::exit(1);
        }
        println!("image written to {}", path);
    }
}

fn print_formals(compiled: &CompiledFunction) {
    println!("=== FORMALS ===");
    for formal in &compiled.formals {
        match formal.default {
            FormalDefault::Missing => println!("  {}", formal.name),
            FormalDefault::Promise(idx) => println!("  {} = code[{}]", formal.name, idx),
        }
    }
    println!();
}

fn load_image(path: &str) -> (Function, ConstantPool) {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", path, e);
            std::process::exit(1);
        }
    };
    match FunctionImage::from_bytes(&bytes).and_then(FunctionImage::restore) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run_disasm(path: &str) {
    let (mut function, pool) = load_image(path);
    // Verification only fills in stack sizes here; broken code is still shown.
    if let Err(e) = CodeVerifier::new(&pool).verify_function_layout(&mut function) {
        eprintln!("warning: {}", e);
    }
    print_function(&function, &pool);
}

fn run_verify(path: &str) {
    let (mut function, pool) = load_image(path);
    match CodeVerifier::new(&pool).verify_function_layout(&mut function) {
        Ok(()) => println!("ok: {} code objects", function.len()),
        Err(e) => {
            eprintln!("verify error: {}", e);
            std::process::exit(1);
        }
    }
}
