use std::fs;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use tracing::debug;

use oildbg::ast::InstructionKind;
use oildbg::diagnostics::Diagnostics;
use oildbg::lexer;
use oildbg::parser;
use oildbg::render::Renderer;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let mut expr_mode = false;
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--expr" | "-e" => expr_mode = true,
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    let renderer = Renderer::new();

    if let Some(path) = input_path {
        let source =
            fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?;
        return run_source(&renderer, &source, expr_mode);
    }

    repl(&renderer, expr_mode)
}

/// Parses a whole script (or one expression with `--expr`) and echoes the
/// canonical rendering of everything that parsed. Execution belongs to the
/// attached engine, not this frontend.
fn run_source(renderer: &Renderer, source: &str, expr_mode: bool) -> Result<()> {
    let mut diags = Diagnostics::new();
    let tokens = lexer::tokenize(source, &mut diags);
    let outcome = if expr_mode {
        parser::parse_expression(&tokens, &mut diags).map(|expr| vec![renderer.expr_text(&expr)])
    } else {
        parser::parse_script(&tokens, &mut diags).map(|script| {
            script
                .iter()
                .map(|instruction| renderer.instruction_text(instruction))
                .collect()
        })
    };
    for diagnostic in diags.iter() {
        eprintln!("{diagnostic}");
    }
    match outcome {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            if diags.has_errors() {
                bail!("input had lexical errors");
            }
            Ok(())
        }
        Err(error) => bail!(
            "{}:{}: error: {}",
            error.span.line,
            error.span.column,
            error
        ),
    }
}

fn repl(renderer: &Renderer, expr_mode: bool) -> Result<()> {
    let stdin = io::stdin();
    let mut history: Vec<String> = Vec::new();
    let mut line = String::new();

    loop {
        print!("(oildbg) ");
        io::stdout().flush().context("Flushing prompt")?;
        line.clear();
        if stdin.lock().read_line(&mut line).context("Reading stdin")? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut diags = Diagnostics::new();
        let tokens = lexer::tokenize(input, &mut diags);
        if expr_mode {
            match parser::parse_expression(&tokens, &mut diags) {
                Ok(expr) => println!("{}", renderer.expr_text(&expr)),
                Err(error) => {
                    eprintln!("{}:{}: error: {}", error.span.line, error.span.column, error)
                }
            }
        } else {
            match parser::parse_instruction(&tokens, &mut diags) {
                Ok(instruction) => {
                    let text = renderer.instruction_text(&instruction);
                    if matches!(instruction.kind, InstructionKind::History) {
                        for (position, entry) in history.iter().enumerate() {
                            println!("{:4}  {entry}", position + 1);
                        }
                    } else {
                        println!("{text}");
                    }
                    history.push(text);
                    debug!(commands = history.len(), "recorded instruction");
                }
                Err(error) => {
                    eprintln!("{}:{}: error: {}", error.span.line, error.span.column, error)
                }
            }
        }
        for diagnostic in diags.iter() {
            eprintln!("{diagnostic}");
        }
    }
    Ok(())
}
