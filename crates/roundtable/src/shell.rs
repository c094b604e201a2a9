// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-oriented shell over the debate core.
//!
//! Parses slash commands into the core's [`Command`] set, forwards plain
//! input as debate prompts, and renders streaming responses with a source
//! header whenever the speaking model changes.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use roundtable_core::RoundtableError;
use roundtable_debate::{Command, DebateService, ModelResponse};

/// Parses user input into a command.
///
/// Returns `None` for plain (non-slash) input, which the shell treats as
/// a debate prompt.
pub fn parse(input: &str) -> Option<Command> {
    let input = input.trim();
    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input.split_whitespace();
    let cmd = parts.next()?.to_lowercase();
    let args: Vec<&str> = parts.collect();

    let command = match cmd.as_str() {
        "/help" => Command::Help,
        "/new" => Command::NewDebate {
            name: join_nonempty(&args),
        },
        "/close" => Command::CloseDebate,
        "/rename" => match join_nonempty(&args) {
            Some(name) => Command::RenameDebate { name },
            None => Command::ParseError {
                message: "/rename requires a name".to_string(),
            },
        },
        "/context" => parse_context(&args),
        "/models" => Command::ToggleModels,
        "/consensus" => Command::ForceConsensus,
        "/execute" => Command::Execute,
        "/pause" => Command::Pause,
        "/resume" => Command::Resume,
        "/history" => Command::ShowHistory,
        "/export" => Command::Export,
        other => Command::ParseError {
            message: format!("unknown command: {other}"),
        },
    };
    Some(command)
}

fn parse_context(args: &[&str]) -> Command {
    let Some((sub, rest)) = args.split_first() else {
        return Command::ParseError {
            message: "/context requires a subcommand: add, remove, or list".to_string(),
        };
    };

    match sub.to_lowercase().as_str() {
        "add" => match join_nonempty(rest) {
            Some(path) => Command::AddContext { path },
            None => Command::ParseError {
                message: "/context add requires a path".to_string(),
            },
        },
        "remove" => match join_nonempty(rest) {
            Some(path) => Command::RemoveContext { path },
            None => Command::ParseError {
                message: "/context remove requires a path".to_string(),
            },
        },
        "list" => Command::ListContext,
        other => Command::ParseError {
            message: format!("unknown context subcommand: {other}"),
        },
    }
}

fn join_nonempty(args: &[&str]) -> Option<String> {
    let joined = args.join(" ");
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Runs the interactive loop until EOF or `/quit`.
pub async fn run(service: &mut DebateService) -> Result<(), RoundtableError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout
            .write_all(b"> ")
            .await
            .map_err(|e| RoundtableError::Internal(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| RoundtableError::Internal(e.to_string()))?;

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| RoundtableError::Internal(e.to_string()))?
        else {
            break;
        };
        let line = line.trim().to_string();

        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        let mut printer = ResponsePrinter::default();
        match parse(&line) {
            Some(command) => {
                let output = service.handle(command, |r| printer.print(r)).await;
                printer.finish();
                if !output.is_empty() {
                    println!("{output}");
                }
            }
            None => match service.submit_prompt(&line, |r| printer.print(r)).await {
                Ok(_) => printer.finish(),
                Err(e) => {
                    printer.finish();
                    println!("{e}");
                }
            },
        }
    }

    Ok(())
}

/// Renders streaming responses, printing a source header when the
/// speaking model changes.
#[derive(Default)]
struct ResponsePrinter {
    current_model: Option<String>,
}

impl ResponsePrinter {
    fn print(&mut self, response: &ModelResponse) {
        if let Some(ref error) = response.error {
            let tag = if response.is_timeout { "TIMEOUT" } else { "ERROR" };
            println!("\n[{}] {tag}: {error}", response.model_id);
            self.current_model = None;
            return;
        }

        if !response.content.is_empty() {
            if self.current_model.as_deref() != Some(response.model_id.as_str()) {
                println!("\n[{}]:", response.model_id);
                self.current_model = Some(response.model_id.clone());
            }
            print!("{}", response.content);
            use std::io::Write;
            let _ = std::io::stdout().flush();
        }

        if response.done {
            if self.current_model.as_deref() == Some(response.model_id.as_str()) {
                println!();
                self.current_model = None;
            }
        }
    }

    fn finish(&mut self) {
        if self.current_model.take().is_some() {
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_input_is_not_a_command() {
        assert!(parse("what should we do?").is_none());
        assert!(parse("").is_none());
    }

    #[test]
    fn simple_commands_parse() {
        assert_eq!(parse("/help"), Some(Command::Help));
        assert_eq!(parse("/close"), Some(Command::CloseDebate));
        assert_eq!(parse("/models"), Some(Command::ToggleModels));
        assert_eq!(parse("/consensus"), Some(Command::ForceConsensus));
        assert_eq!(parse("/execute"), Some(Command::Execute));
        assert_eq!(parse("/pause"), Some(Command::Pause));
        assert_eq!(parse("/resume"), Some(Command::Resume));
        assert_eq!(parse("/history"), Some(Command::ShowHistory));
        assert_eq!(parse("/export"), Some(Command::Export));
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(parse("/HELP"), Some(Command::Help));
        assert_eq!(parse("/Execute"), Some(Command::Execute));
    }

    #[test]
    fn new_takes_an_optional_name() {
        assert_eq!(parse("/new"), Some(Command::NewDebate { name: None }));
        assert_eq!(
            parse("/new api redesign"),
            Some(Command::NewDebate {
                name: Some("api redesign".to_string())
            })
        );
    }

    #[test]
    fn rename_requires_a_name() {
        assert_eq!(
            parse("/rename better name"),
            Some(Command::RenameDebate {
                name: "better name".to_string()
            })
        );
        assert!(matches!(
            parse("/rename"),
            Some(Command::ParseError { .. })
        ));
    }

    #[test]
    fn context_subcommands_parse() {
        assert_eq!(
            parse("/context add /src/main.rs"),
            Some(Command::AddContext {
                path: "/src/main.rs".to_string()
            })
        );
        assert_eq!(
            parse("/context remove /src/main.rs"),
            Some(Command::RemoveContext {
                path: "/src/main.rs".to_string()
            })
        );
        assert_eq!(parse("/context list"), Some(Command::ListContext));
    }

    #[test]
    fn context_errors_are_actionable() {
        let Some(Command::ParseError { message }) = parse("/context") else {
            panic!("bare /context must be a parse error");
        };
        assert!(message.contains("subcommand"));

        let Some(Command::ParseError { message }) = parse("/context add") else {
            panic!("/context add without path must be a parse error");
        };
        assert!(message.contains("path"));

        let Some(Command::ParseError { message }) = parse("/context frobnicate x") else {
            panic!("unknown subcommand must be a parse error");
        };
        assert!(message.contains("frobnicate"));
    }

    #[test]
    fn unknown_commands_are_parse_errors() {
        let Some(Command::ParseError { message }) = parse("/frobnicate") else {
            panic!("unknown command must be a parse error");
        };
        assert!(message.contains("/frobnicate"));
    }

    #[test]
    fn paths_with_spaces_are_joined() {
        assert_eq!(
            parse("/context add /home/me/my notes.txt"),
            Some(Command::AddContext {
                path: "/home/me/my notes.txt".to_string()
            })
        );
    }
}
