/// Preview — generate lines from a snippet spec for quick grammar checks.
///
/// Usage: preview --spec <file|dir> --snippet <name> [--count <n>] [--seed <n>]
///                [--config <file>] [--audit] [--field key=value]...
///
/// Set RUST_LOG=snippet_engine=debug to trace phrase selection.

use snippet_engine::core::config::GeneratorConfig;
use snippet_engine::{Generator, Model, Spec};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

struct Options {
    spec_path: String,
    snippet: String,
    count: usize,
    seed: Option<u64>,
    config_path: Option<String>,
    audit: bool,
    fields: Vec<(String, String)>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let options = match parse_args(&args[1..]) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("ERROR: {}", msg);
            print_usage();
            process::exit(1);
        }
    };

    let spec_path = Path::new(&options.spec_path);
    let spec = if spec_path.is_dir() {
        Spec::load_dir(spec_path)
    } else {
        Spec::load_from_ron(spec_path)
    };
    let spec = match spec {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("ERROR: Failed to load spec: {}", e);
            process::exit(1);
        }
    };
    println!("Loaded {} snippets", spec.snippets.len());

    let mut builder = Generator::builder(spec);
    if let Some(ref path) = options.config_path {
        match GeneratorConfig::load_from_ron(Path::new(path)) {
            Ok(config) => builder = builder.config(&config),
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                process::exit(1);
            }
        }
    }
    if let Some(seed) = options.seed {
        builder = builder.seed(seed);
    }
    if options.audit {
        builder = builder.audit(true);
    }

    let mut generator = match builder.build() {
        Ok(generator) => generator,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let mut failures = 0;
    for _ in 0..options.count {
        let mut model = Model::new();
        for (key, value) in &options.fields {
            model.set_field(key.clone(), value.clone());
        }
        match generator.gen(&options.snippet, &mut model) {
            Ok(line) => println!("{}", line),
            Err(e) => {
                failures += 1;
                println!("ERROR: {}", e);
            }
        }
    }

    if let Some(audit) = generator.audit() {
        println!("\n=== Phrase Audit ===\n");
        print!("{}", audit);
        let unused = audit.unused();
        if !unused.is_empty() {
            println!("\n{} phrases never chosen", unused.len());
        }
    }

    println!("\nSummary: {} generated, {} errors", options.count - failures, failures);
    if failures > 0 {
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut spec_path = None;
    let mut snippet = None;
    let mut options = Options {
        spec_path: String::new(),
        snippet: String::new(),
        count: 10,
        seed: None,
        config_path: None,
        audit: false,
        fields: Vec::new(),
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--spec" if i + 1 < args.len() => {
                i += 1;
                spec_path = Some(args[i].clone());
            }
            "--snippet" if i + 1 < args.len() => {
                i += 1;
                snippet = Some(args[i].clone());
            }
            "--count" if i + 1 < args.len() => {
                i += 1;
                options.count = args[i]
                    .parse()
                    .map_err(|_| format!("invalid count: {}", args[i]))?;
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                options.seed = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("invalid seed: {}", args[i]))?,
                );
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                options.config_path = Some(args[i].clone());
            }
            "--field" if i + 1 < args.len() => {
                i += 1;
                let (key, value) = args[i]
                    .split_once('=')
                    .ok_or_else(|| format!("expected key=value, got {}", args[i]))?;
                options.fields.push((key.to_string(), value.to_string()));
            }
            "--audit" => options.audit = true,
            other => return Err(format!("Unknown argument: {}", other)),
        }
        i += 1;
    }

    options.spec_path = spec_path.ok_or("--spec is required")?;
    options.snippet = snippet.ok_or("--snippet is required")?;
    Ok(options)
}

fn print_usage() {
    println!("Usage: preview --spec <file|dir> --snippet <name> [options]");
    println!();
    println!("Options:");
    println!("  --count <n>          lines to generate (default 10)");
    println!("  --seed <n>           seed the random source");
    println!("  --config <file>      RON generator config (filters, flags)");
    println!("  --audit              print phrase usage counts");
    println!("  --field key=value    set a model field (repeatable)");
}
