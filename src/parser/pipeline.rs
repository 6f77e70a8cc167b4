// Pipeline parser: commands separated by `|`, `;` or line breaks

use super::ast::Pipeline;
use super::command::parse_command;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{multispace0, one_of, space0},
    combinator::{eof, map},
    multi::{many1_count, separated_list1},
    sequence::{delimited, preceded, terminated},
    IResult,
};

/// One or more separators; blank lines between commands are allowed
fn separator(input: &str) -> IResult<&str, ()> {
    map(
        many1_count(delimited(space0, alt((tag("\r\n"), map(one_of("|;\n"), |_| ""))), space0)),
        |_| (),
    )(input)
}

/// Parse a complete script
/// Format: command | command ; command
pub fn parse_pipeline(input: &str) -> IResult<&str, Pipeline> {
    map(
        delimited(
            multispace0,
            separated_list1(separator, parse_command),
            terminated(multispace0, eof),
        ),
        |commands| Pipeline { commands },
    )(input)
}

/// A script that may be entirely blank
pub fn parse_optional_pipeline(input: &str) -> IResult<&str, Pipeline> {
    alt((
        map(preceded(multispace0, eof), |_| Pipeline { commands: Vec::new() }),
        parse_pipeline,
    ))(input)
}
