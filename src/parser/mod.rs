// Dashboard shell script parser

pub mod ast;
pub mod command;
pub mod lexer;
pub mod pipeline;

// Public API re-exports
pub use ast::{Assignment, Command, LoadTarget, Pipeline, Value};
pub use pipeline::{parse_optional_pipeline, parse_pipeline};

/// Parse a whole script, reporting where the first unparsable text starts
pub fn parse_script(input: &str) -> anyhow::Result<Pipeline> {
    match parse_optional_pipeline(input) {
        Ok((_, pipeline)) => Ok(pipeline),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let offset = input.len() - e.input.len();
            let near: String = e.input.trim_start().chars().take(24).collect();
            anyhow::bail!("syntax error at offset {}: near '{}'", offset, near)
        }
        Err(nom::Err::Incomplete(_)) => anyhow::bail!("incomplete script"),
    }
}
