// Command parser for dashboard shell scripts

use super::ast::{Assignment, Command, LoadTarget, Value};
use super::lexer::{identifier, number_literal, string_literal, ws};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, u64 as unsigned},
    combinator::{map, opt, value},
    multi::separated_list1,
    sequence::{preceded, separated_pair, terminated},
    IResult,
};

/// `name:` with optional spaces around the colon
fn key<'a>(name: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(ws(tag(name)), char(':'))
}

/// Empty or absent argument list: `name()`
fn bare<'a>(name: &'static str, command: Command) -> impl FnMut(&'a str) -> IResult<&'a str, Command> {
    value(command, terminated(ws(tag(name)), terminated(ws(char('(')), ws(char(')')))))
}

/// Parse a load command
/// Format: load(sample), load(stdin), load(url: "..."), load(file: "...")
pub fn parse_load(input: &str) -> IResult<&str, Command> {
    let (input, _) = ws(tag("load"))(input)?;
    let (input, _) = ws(char('('))(input)?;

    let (input, target) = alt((
        value(LoadTarget::Sample, ws(tag("sample"))),
        value(LoadTarget::Stdin, ws(tag("stdin"))),
        map(preceded(key("url"), ws(string_literal)), LoadTarget::Url),
        map(preceded(key("file"), ws(string_literal)), LoadTarget::File),
    ))(input)?;

    let (input, _) = ws(char(')'))(input)?;

    Ok((input, Command::Load(target)))
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    alt((
        map(string_literal, Value::Str),
        map(identifier, Value::Ident),
        map(number_literal, Value::Number),
    ))(input)
}

/// Parse a set command
/// Format: set(x: Product, y: "Unit Price", ci: 0.9, ...)
pub fn parse_set(input: &str) -> IResult<&str, Command> {
    let (input, _) = ws(tag("set"))(input)?;
    let (input, _) = ws(char('('))(input)?;

    let (input, pairs) = separated_list1(
        ws(char(',')),
        separated_pair(ws(identifier), char(':'), ws(parse_value)),
    )(input)?;

    let (input, _) = ws(char(')'))(input)?;

    let assignments = pairs
        .into_iter()
        .map(|(field, value)| Assignment { field, value })
        .collect();

    Ok((input, Command::Set(assignments)))
}

/// Parse a preview command
/// Format: preview() or preview(rows: 5)
pub fn parse_preview(input: &str) -> IResult<&str, Command> {
    let (input, _) = ws(tag("preview"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, rows) = opt(preceded(key("rows"), ws(unsigned)))(input)?;
    let (input, _) = ws(char(')'))(input)?;

    Ok((input, Command::Preview { rows: rows.map(|n| n as usize) }))
}

/// `render(...)` and `export(...)` share the optional `path:` argument
fn parse_output<'a>(
    name: &'static str,
    build: fn(Option<String>) -> Command,
) -> impl FnMut(&'a str) -> IResult<&'a str, Command> {
    move |input: &'a str| {
        let (input, _) = ws(tag(name))(input)?;
        let (input, _) = ws(char('('))(input)?;
        let (input, path) = opt(preceded(key("path"), ws(string_literal)))(input)?;
        let (input, _) = ws(char(')'))(input)?;
        Ok((input, build(path)))
    }
}

/// Parse any command
pub fn parse_command(input: &str) -> IResult<&str, Command> {
    alt((
        parse_load,
        parse_set,
        parse_preview,
        bare("summary", Command::Summary),
        bare("schema", Command::Schema),
        parse_output("render", |path| Command::Render { path }),
        parse_output("export", |path| Command::Export { path }),
    ))(input)
}
