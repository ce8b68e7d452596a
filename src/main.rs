use clap::Parser;
use std::io::{Read, Write};
use std::time::Duration;

use gosh::gosh::{Gosh, GoshOptions};
use gosh::interpreter::ExecutionLimits;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "gosh")]
#[command(about = "Run gosh scripts: a small scripting language with shell subshells")]
#[command(version)]
struct Cli {
    /// Execute the script from command line argument
    #[arg(short = 'c')]
    script: Option<String>,

    /// Print the token stream as JSON instead of running
    #[arg(long = "dump-tokens")]
    dump_tokens: bool,

    /// Print the syntax tree as JSON instead of running
    #[arg(long = "dump-ast")]
    dump_ast: bool,

    /// Output results as JSON (stdout, stderr, exitCode)
    #[arg(long = "json")]
    json: bool,

    /// Maximum depth of nested function calls
    #[arg(long = "max-call-depth")]
    max_call_depth: Option<usize>,

    /// Kill shell commands that run longer than this many seconds
    #[arg(long = "command-timeout")]
    command_timeout: Option<f64>,

    /// Script file to execute
    #[arg()]
    script_file: Option<String>,
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Determine script source: -c, file, or stdin
    let (script, entry_point) = if let Some(s) = cli.script {
        (s, "-c".to_string())
    } else if let Some(ref file) = cli.script_file {
        match std::fs::read_to_string(file) {
            Ok(content) => (content, file.clone()),
            Err(e) => fail(&format!("Cannot read script file: {}: {}", file, e)),
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            fail("No script provided. Use -c 'script', provide a script file, or pipe via stdin.");
        }
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            fail(&format!("Cannot read stdin: {}", e));
        }
        (buf, "<stdin>".to_string())
    };

    if cli.dump_tokens {
        print_json(&gosh::parser::tokenize(&script));
        return;
    }
    if cli.dump_ast {
        match gosh::parser::parse(&script, &entry_point) {
            Ok(program) => print_json(&program),
            Err(e) => {
                eprintln!("{}: SyntaxError: {}", entry_point, e);
                std::process::exit(2);
            }
        }
        return;
    }

    let mut limits = ExecutionLimits::default();
    if let Some(depth) = cli.max_call_depth {
        limits.max_call_depth = depth;
    }
    if let Some(secs) = cli.command_timeout {
        match Duration::try_from_secs_f64(secs) {
            Ok(timeout) => limits.command_timeout = Some(timeout),
            Err(e) => fail(&format!("Invalid --command-timeout {}: {}", secs, e)),
        }
    }

    // Relative `source` paths resolve against the script's directory; inline
    // and piped scripts use the working directory.
    let base_dir = match cli.script_file {
        Some(_) if entry_point != "-c" => None,
        _ => std::env::current_dir().ok(),
    };
    let gosh = Gosh::new(GoshOptions {
        limits: Some(limits),
        base_dir,
        ..Default::default()
    });

    if cli.json {
        let result = gosh.exec(&script, &entry_point);
        print_json(&result);
        std::process::exit(result.exit_code);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let code = match gosh.run(&script, &entry_point, &mut out) {
        Ok(()) => 0,
        Err(e) => {
            let _ = out.flush();
            eprint!("{}", e.render());
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(&format!("Cannot serialize output: {}", e)),
    }
}
