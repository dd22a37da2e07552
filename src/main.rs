use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use structopt::StructOpt;

use jsflow::formatters::{format_graph_as_dot, format_graph_as_json, format_lines_as_json};
use jsflow::{Analyzer, AnalyzerConfig, ArgumentVector};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "jsflow",
    about = "Build the control-flow graph of a JavaScript function and trace it on concrete inputs"
)]
struct Opt {
    /// Input source file holding one function declaration
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// Parameter values as a JSON object, e.g. '{"x": 5}'
    #[structopt(short, long)]
    args: Option<String>,

    /// Output file
    #[structopt(parse(from_os_str), short, long)]
    output: Option<PathBuf>,

    /// Output format (json, dot or lines)
    #[structopt(short, long, default_value = "json")]
    format: String,

    /// Label nodes with symbolically folded source
    #[structopt(long)]
    fold_labels: bool,

    /// First statement node id
    #[structopt(long)]
    first_id: Option<u32>,

    /// JSON file with analyzer settings
    #[structopt(parse(from_os_str), short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[structopt(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let level = if opt.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let mut config = match &opt.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            AnalyzerConfig::from_json(&text)
                .with_context(|| format!("Invalid config file: {:?}", path))?
        }
        None => AnalyzerConfig::default(),
    };
    if opt.fold_labels {
        config.fold_labels = true;
    }
    if let Some(first_id) = opt.first_id {
        config.first_id = first_id;
    }

    let args = match &opt.args {
        Some(text) => {
            config.highlight = true;
            ArgumentVector::from_json(text).context("Failed to parse --args")?
        }
        None => ArgumentVector::new(),
    };

    let source = fs::read_to_string(&opt.input)
        .with_context(|| format!("Failed to read file: {:?}", opt.input))?;

    let analyzer = Analyzer::new(config);

    // Generate the output based on selected format
    let output = match opt.format.as_str() {
        "json" => format_graph_as_json(&analyzer.analyze(&source, &args)?),
        "dot" => format_graph_as_dot(&analyzer.analyze(&source, &args)?)
            .context("Failed to render DOT output")?,
        "lines" => format_lines_as_json(&analyzer.classify_lines(&source, &args)?),
        other => anyhow::bail!("Unknown output format: {}", other),
    };

    // Write to file or stdout
    if let Some(output_path) = opt.output {
        fs::write(&output_path, output)
            .with_context(|| format!("Failed to write to file: {:?}", output_path))?;
        info!("Output written to {:?}", output_path);
    } else {
        println!("{}", output);
    }

    Ok(())
}
