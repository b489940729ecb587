//! Picklejar CLI entry point.

use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use picklejar_foundation::ParseConfig;
use picklejar_machine::{CancelToken, disassemble_to_string};
use picklejar_runtime::{Watchdog, init_logging, load_config, parse_bytes};

/// CLI configuration parsed from arguments.
#[derive(Default)]
struct CliConfig {
    inputs: Vec<PathBuf>,
    show_help: bool,
    show_version: bool,
    pretty: bool,
    config_file: Option<PathBuf>,
    // Overrides applied on top of the config file
    element_threshold: Option<usize>,
    sample_size: Option<usize>,
    max_opcodes: Option<u64>,
    max_stack_depth: Option<usize>,
    max_input_bytes: Option<usize>,
    max_nesting_depth: Option<usize>,
    max_output_nodes: Option<usize>,
    max_allocated_items: Option<usize>,
    timeout_ms: Option<u64>,
    // Debug flags
    disasm: bool,
    trace_vm: bool,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("\x1b[31mError: {e}\x1b[0m");
            ExitCode::FAILURE
        }
    }
}

fn value_of<T: std::str::FromStr>(args: &[String], i: usize) -> Result<T, Box<dyn std::error::Error>> {
    let flag = &args[i - 1];
    let Some(raw) = args.get(i) else {
        return Err(format!("{flag} requires a value").into());
    };
    raw.parse()
        .map_err(|_| format!("invalid {flag} value: {raw}").into())
}

fn parse_args(args: Vec<String>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let mut config = CliConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => config.show_help = true,
            "-V" | "--version" => config.show_version = true,
            "-p" | "--pretty" => config.pretty = true,
            "--disasm" => config.disasm = true,
            "--trace-vm" => config.trace_vm = true,
            "-c" | "--config" => {
                i += 1;
                config.config_file = Some(value_of::<PathBuf>(&args, i)?);
            }
            "--threshold" => {
                i += 1;
                config.element_threshold = Some(value_of(&args, i)?);
            }
            "--sample" => {
                i += 1;
                config.sample_size = Some(value_of(&args, i)?);
            }
            "--max-opcodes" => {
                i += 1;
                config.max_opcodes = Some(value_of(&args, i)?);
            }
            "--max-stack" => {
                i += 1;
                config.max_stack_depth = Some(value_of(&args, i)?);
            }
            "--max-input" => {
                i += 1;
                config.max_input_bytes = Some(value_of(&args, i)?);
            }
            "--max-depth" => {
                i += 1;
                config.max_nesting_depth = Some(value_of(&args, i)?);
            }
            "--max-nodes" => {
                i += 1;
                config.max_output_nodes = Some(value_of(&args, i)?);
            }
            "--max-items" => {
                i += 1;
                config.max_allocated_items = Some(value_of(&args, i)?);
            }
            "--timeout-ms" => {
                i += 1;
                config.timeout_ms = Some(value_of(&args, i)?);
            }
            "-" => config.inputs.push(PathBuf::from("-")),
            arg if arg.starts_with('-') => {
                return Err(format!("unknown option: {arg}").into());
            }
            path => config.inputs.push(PathBuf::from(path)),
        }
        i += 1;
    }

    Ok(config)
}

impl CliConfig {
    /// Builds the parse limits: defaults, then the config file, then flags.
    fn parse_config(&self) -> Result<ParseConfig, Box<dyn std::error::Error>> {
        let mut parse = match &self.config_file {
            Some(path) => load_config(path)?,
            None => ParseConfig::default(),
        };
        if let Some(v) = self.element_threshold {
            parse = parse.with_element_threshold(v);
        }
        if let Some(v) = self.sample_size {
            parse = parse.with_sample_size(v);
        }
        if let Some(v) = self.max_opcodes {
            parse = parse.with_max_opcodes(v);
        }
        if let Some(v) = self.max_stack_depth {
            parse = parse.with_max_stack_depth(v);
        }
        if let Some(v) = self.max_input_bytes {
            parse = parse.with_max_input_bytes(v);
        }
        if let Some(v) = self.max_nesting_depth {
            parse = parse.with_max_nesting_depth(v);
        }
        if let Some(v) = self.max_output_nodes {
            parse = parse.with_max_output_nodes(v);
        }
        if let Some(v) = self.max_allocated_items {
            parse = parse.with_max_allocated_items(v);
        }
        Ok(parse)
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if path.as_os_str() == "-" {
        let mut data = Vec::new();
        std::io::stdin().lock().read_to_end(&mut data)?;
        return Ok(data);
    }
    std::fs::read(path).map_err(|e| format!("failed to read '{}': {e}", path.display()).into())
}

/// Returns whether every input parsed successfully.
fn run(args: Vec<String>) -> Result<bool, Box<dyn std::error::Error>> {
    let mut config = parse_args(args)?;

    if config.show_help {
        print_help();
        return Ok(true);
    }

    if config.show_version {
        println!("picklejar {}", env!("CARGO_PKG_VERSION"));
        return Ok(true);
    }

    init_logging(config.trace_vm);
    let parse_config = config.parse_config()?;

    if config.inputs.is_empty() {
        config.inputs.push(PathBuf::from("-"));
    }

    let mut all_ok = true;
    for input in &config.inputs {
        let data = read_input(input)?;

        if config.disasm {
            eprintln!("\x1b[1;36m=== {} ===\x1b[0m", input.display());
            eprint!("{}", disassemble_to_string(&data));
        }

        let cancel = CancelToken::new();
        let watchdog = config
            .timeout_ms
            .map(|ms| Watchdog::arm(cancel.clone(), Duration::from_millis(ms)));
        let outcome = parse_bytes(&data, &parse_config, &cancel);
        drop(watchdog);

        all_ok &= outcome.is_ok();
        if config.pretty {
            println!("{}", outcome.to_json_pretty());
        } else {
            println!("{}", outcome.to_json());
        }
    }

    Ok(all_ok)
}

fn print_help() {
    println!(
        "\x1b[1mPicklejar\x1b[0m - Safe pickle reader with JSON output

\x1b[1mUSAGE:\x1b[0m
    picklejar [OPTIONS] [FILES...]

\x1b[1mARGUMENTS:\x1b[0m
    [FILES...]    Pickle files to parse (\"-\" or none reads stdin)

\x1b[1mOPTIONS:\x1b[0m
    -h, --help           Print help information
    -V, --version        Print version information
    -p, --pretty         Indent the JSON output
    -c, --config FILE    Load limits from a JSON config file
    --threshold N        Summarize arrays with more than N elements
    --sample N           Elements kept in an array summary
    --timeout-ms N       Cancel a parse that runs longer than N ms

\x1b[1mLIMITS:\x1b[0m
    --max-opcodes N      Opcodes executed per stream
    --max-stack N        Interpreter stack depth
    --max-input N        Input size in bytes
    --max-depth N        Container nesting depth
    --max-nodes N        Nodes in the expanded output
    --max-items N        Items allocated by permitted calls

\x1b[1mDEBUG OPTIONS:\x1b[0m
    --disasm             Print an opcode listing to stderr
    --trace-vm           Trace every dispatched opcode (RUST_LOG also works)

\x1b[1mEXAMPLES:\x1b[0m
    picklejar data.pkl                   Print one JSON envelope
    picklejar -p a.pkl b.pkl             One envelope per file, indented
    picklejar --threshold 100 big.pkl    Summarize arrays over 100 elements
    cat data.pkl | picklejar -           Read from stdin

Exits non-zero if any input is rejected."
    );
}
