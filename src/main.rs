use clap::Parser;
use mintcl::api;
use std::io::Read;

#[derive(Parser)]
#[command(name = "mintcl")]
#[command(about = "A small, embeddable scripting-language interpreter in the Tcl family")]
#[command(version)]
struct Cli {
    /// Execute the script from a command-line argument
    #[arg(short = 'c')]
    script: Option<String>,

    /// Output the result as JSON ({"result": ..., "exitCode": ...})
    #[arg(long = "json")]
    json: bool,

    /// Script file to execute
    #[arg()]
    script_file: Option<String>,
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    let script = if let Some(s) = cli.script {
        s
    } else if let Some(ref file) = cli.script_file {
        match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error: cannot read script file: {}: {}", file, e);
                std::process::exit(1);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("Error: no script provided. Use -c 'script', provide a script file, or pipe via stdin.");
            std::process::exit(1);
        }
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).unwrap_or_default();
        buf
    };

    if script.trim().is_empty() {
        if cli.json {
            println!("{}", serde_json::json!({"result": "", "exitCode": 0}));
        }
        std::process::exit(0);
    }

    let mut interp = api::create_interp();
    let outcome = api::eval(&mut interp, &script);

    let (result_text, exit_code) = match outcome {
        Ok(value) => (value.to_str().into_owned(), 0),
        Err(mintcl::error::Signal::Exit(code)) => (String::new(), code),
        Err(_) => {
            let message = interp.result().to_str().into_owned();
            let mut lines = vec![message];
            for frame in interp.stack_trace().iter().rev() {
                lines.push(format!("in procedure '{}' called at file \"{}\", line {}", frame.proc_name, frame.file, frame.line));
            }
            (lines.join("\n"), 1)
        }
    };

    if cli.json {
        println!("{}", serde_json::json!({"result": result_text, "exitCode": exit_code}));
    } else if exit_code == 0 {
        if !result_text.is_empty() {
            println!("{}", result_text);
        }
    } else {
        eprintln!("{}", result_text);
    }

    std::process::exit(exit_code);
}
