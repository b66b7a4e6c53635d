use std::{env, fs, path::Path, process::ExitCode, time::Instant};

use krait::{Engine, EngineError, HostValue};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let (source, path) = match args.get(1).map(String::as_str) {
        Some("-e") => match args.get(2) {
            Some(expr) => (expr.clone(), "<eval>".to_owned()),
            None => {
                eprintln!("usage: krait <file.js> | krait -e <expression>");
                return ExitCode::FAILURE;
            }
        },
        Some(file_path) => match fs::read_to_string(file_path) {
            Ok(source) => (source, file_path.to_owned()),
            Err(err) => {
                eprintln!("error: cannot read {file_path}: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            eprintln!("usage: krait <file.js> | krait -e <expression>");
            return ExitCode::FAILURE;
        }
    };

    let mut engine = Engine::new();
    engine.set_script_path(&path);

    // Imports resolve relative to the entry script's directory.
    let base = Path::new(&path).parent().map(Path::to_path_buf);
    engine.set_module_loader(move |specifier| {
        let resolved = match &base {
            Some(base) => base.join(specifier),
            None => Path::new(specifier).to_path_buf(),
        };
        fs::read_to_string(resolved).ok()
    });

    let start = Instant::now();
    match engine.run(&source) {
        Ok(value) => {
            let elapsed = start.elapsed();
            if !value.is_undefined() {
                println!("{}", render(&value));
            }
            eprintln!("done in {elapsed:?}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn render(value: &HostValue) -> String {
    match value {
        HostValue::Undefined => "undefined".to_owned(),
        HostValue::Null => "null".to_owned(),
        HostValue::Bool(b) => b.to_string(),
        HostValue::Int(i) => i.to_string(),
        HostValue::Float(f) => f.to_string(),
        HostValue::BigInt(b) => format!("{b}n"),
        HostValue::String(s) => s.clone(),
        HostValue::Bytes(bytes) => format!("Uint8Array({})", bytes.len()),
        HostValue::Array(items) => {
            let parts: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", parts.join(", "))
        }
        HostValue::Object(pairs) => {
            let parts: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}: {}", render(v))).collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

fn report(err: &EngineError) {
    match err {
        EngineError::Parse(e) => eprintln!("{e}"),
        EngineError::Runtime(e) => eprintln!("{e}"),
        EngineError::NotSupported { feature } => eprintln!("not supported: {feature}"),
        EngineError::ModuleNotFound { path } => eprintln!("module not found: {path}"),
    }
}
