//! Console command parsing
//!
//! One line of input is `<zone> <op> [args...]` or the global `zones`.

use thiserror::Error;

use crate::dict::{End, Scalar, Value, WriteMode, DEFAULT_KEYS_LIMIT};

/// Errors produced while parsing a console line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unterminated quote")]
    UnterminatedQuote,

    #[error("unknown operation: {0}")]
    UnknownOp(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid {name}: {value}")]
    InvalidArgument { name: &'static str, value: String },

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

// == Tokens ==
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Bare(String),
    Quoted(String),
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Token::Bare(s) | Token::Quoted(s) => s,
        }
    }

    fn into_text(self) -> String {
        match self {
            Token::Bare(s) | Token::Quoted(s) => s,
        }
    }

    /// `true`/`false` and finite numbers are typed unless quoted
    fn into_value(self) -> Value {
        match self {
            Token::Quoted(s) => Value::Str(s.into_bytes()),
            Token::Bare(s) => match s.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => match s.parse::<f64>() {
                    Ok(n) if n.is_finite() => Value::Number(n),
                    _ => Value::Str(s.into_bytes()),
                },
            },
        }
    }
}

/// Splits a line on whitespace; double quotes group words and allow
/// `\"` and `\\` escapes.
fn tokenize(line: &str) -> Result<Vec<Token>, CommandError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    None => return Err(CommandError::UnterminatedQuote),
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped @ ('"' | '\\')) => text.push(escaped),
                        Some(other) => {
                            text.push('\\');
                            text.push(other);
                        }
                        None => return Err(CommandError::UnterminatedQuote),
                    },
                    Some(other) => text.push(other),
                }
            }
            tokens.push(Token::Quoted(text));
        } else {
            let mut text = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                text.push(c);
                chars.next();
            }
            tokens.push(Token::Bare(text));
        }
    }

    Ok(tokens)
}

// == Commands ==
/// An operation on one zone.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Get { key: Vec<u8> },
    GetStale { key: Vec<u8> },
    Write {
        mode: WriteMode,
        evict: bool,
        key: Vec<u8>,
        value: Value,
        ttl_ms: u64,
        flags: u32,
    },
    Delete { key: Vec<u8> },
    Incr {
        key: Vec<u8>,
        delta: f64,
        init: Option<f64>,
        init_ttl_ms: u64,
    },
    Push { key: Vec<u8>, item: Scalar, end: End },
    Pop { key: Vec<u8>, end: End },
    Llen { key: Vec<u8> },
    Ttl { key: Vec<u8> },
    Expire { key: Vec<u8>, ttl_ms: u64 },
    FlushAll,
    FlushExpired { max_count: usize },
    GetKeys { max_count: usize },
    Capacity,
    FreeSpace,
    Stats,
}

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// List configured zones
    Zones,
    Zone { zone: String, op: Op },
}

/// Cursor over the arguments of one command
struct Args {
    tokens: std::vec::IntoIter<Token>,
}

impl Args {
    fn next(&mut self, name: &'static str) -> Result<Token, CommandError> {
        self.tokens.next().ok_or(CommandError::MissingArgument(name))
    }

    fn key(&mut self) -> Result<Vec<u8>, CommandError> {
        Ok(self.next("key")?.into_text().into_bytes())
    }

    fn value(&mut self) -> Result<Value, CommandError> {
        Ok(self.next("value")?.into_value())
    }

    fn number<T: std::str::FromStr>(&mut self, name: &'static str) -> Result<T, CommandError> {
        let token = self.next(name)?;
        parse_number(name, token.text())
    }

    fn optional_number<T: std::str::FromStr>(
        &mut self,
        name: &'static str,
    ) -> Result<Option<T>, CommandError> {
        self.tokens
            .next()
            .map(|token| parse_number(name, token.text()))
            .transpose()
    }

    fn finish(mut self) -> Result<(), CommandError> {
        match self.tokens.next() {
            Some(extra) => Err(CommandError::UnexpectedArgument(extra.into_text())),
            None => Ok(()),
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, text: &str) -> Result<T, CommandError> {
    text.parse().map_err(|_| CommandError::InvalidArgument {
        name,
        value: text.to_string(),
    })
}

impl Command {
    /// Parses one line; `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let mut tokens = tokenize(line)?.into_iter();
        let Some(first) = tokens.next() else {
            return Ok(None);
        };

        if tokens.len() == 0 && first == Token::Bare("zones".to_string()) {
            return Ok(Some(Command::Zones));
        }

        let zone = first.into_text();
        let op = tokens
            .next()
            .ok_or(CommandError::MissingArgument("operation"))?
            .into_text();
        let mut args = Args { tokens };
        let op = parse_op(&op, &mut args)?;
        args.finish()?;

        Ok(Some(Command::Zone { zone, op }))
    }
}

fn parse_op(name: &str, args: &mut Args) -> Result<Op, CommandError> {
    let op = match name {
        "get" => Op::Get { key: args.key()? },
        "get_stale" => Op::GetStale { key: args.key()? },
        "set" => write(args, WriteMode::Set, true)?,
        "safe_set" => write(args, WriteMode::Set, false)?,
        "add" => write(args, WriteMode::Add, true)?,
        "safe_add" => write(args, WriteMode::Add, false)?,
        "replace" => write(args, WriteMode::Replace, true)?,
        "delete" => Op::Delete { key: args.key()? },
        "incr" => Op::Incr {
            key: args.key()?,
            delta: args.number("delta")?,
            init: args.optional_number("init")?,
            init_ttl_ms: args.optional_number("init_ttl")?.unwrap_or(0),
        },
        "lpush" => push(args, End::Front)?,
        "rpush" => push(args, End::Back)?,
        "lpop" => Op::Pop {
            key: args.key()?,
            end: End::Front,
        },
        "rpop" => Op::Pop {
            key: args.key()?,
            end: End::Back,
        },
        "llen" => Op::Llen { key: args.key()? },
        "ttl" => Op::Ttl { key: args.key()? },
        "expire" => Op::Expire {
            key: args.key()?,
            ttl_ms: args.number("ttl")?,
        },
        "flush_all" => Op::FlushAll,
        "flush_expired" => Op::FlushExpired {
            max_count: args.optional_number("max_count")?.unwrap_or(0),
        },
        "get_keys" => Op::GetKeys {
            max_count: args
                .optional_number("max_count")?
                .unwrap_or(DEFAULT_KEYS_LIMIT),
        },
        "capacity" => Op::Capacity,
        "free_space" => Op::FreeSpace,
        "stats" => Op::Stats,
        other => return Err(CommandError::UnknownOp(other.to_string())),
    };
    Ok(op)
}

fn write(args: &mut Args, mode: WriteMode, evict: bool) -> Result<Op, CommandError> {
    Ok(Op::Write {
        mode,
        evict,
        key: args.key()?,
        value: args.value()?,
        ttl_ms: args.optional_number("ttl")?.unwrap_or(0),
        flags: args.optional_number("flags")?.unwrap_or(0),
    })
}

fn push(args: &mut Args, end: End) -> Result<Op, CommandError> {
    let key = args.key()?;
    let item = match args.value()? {
        Value::Number(n) => Scalar::Number(n),
        Value::Str(bytes) => Scalar::Str(bytes),
        other => {
            return Err(CommandError::InvalidArgument {
                name: "list element",
                value: format!("{other:?}"),
            })
        }
    };
    Ok(Op::Push { key, item, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    fn op(line: &str) -> Op {
        match parse(line) {
            Command::Zone { op, .. } => op,
            other => panic!("expected a zone command, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_zones() {
        assert_eq!(parse("zones"), Command::Zones);
    }

    #[test]
    fn test_set_with_defaults() {
        assert_eq!(
            parse("cache set k 42"),
            Command::Zone {
                zone: "cache".to_string(),
                op: Op::Write {
                    mode: WriteMode::Set,
                    evict: true,
                    key: b"k".to_vec(),
                    value: Value::Number(42.0),
                    ttl_ms: 0,
                    flags: 0,
                },
            }
        );
    }

    #[test]
    fn test_safe_add_with_ttl_and_flags() {
        assert_eq!(
            op("cache safe_add k true 1500 7"),
            Op::Write {
                mode: WriteMode::Add,
                evict: false,
                key: b"k".to_vec(),
                value: Value::Bool(true),
                ttl_ms: 1500,
                flags: 7,
            }
        );
    }

    #[test]
    fn test_literal_typing() {
        let value_of = |line: &str| match op(line) {
            Op::Write { value, .. } => value,
            other => panic!("expected a write, got {other:?}"),
        };

        assert_eq!(value_of("z set k false"), Value::Bool(false));
        assert_eq!(value_of("z set k -2.5"), Value::Number(-2.5));
        assert_eq!(value_of("z set k hello"), Value::from("hello"));
        assert_eq!(value_of("z set k \"42\""), Value::from("42"));
        assert_eq!(value_of("z set k \"two words\""), Value::from("two words"));
        assert_eq!(value_of("z set k inf"), Value::from("inf"));
        assert_eq!(value_of(r#"z set k "say \"hi\"""#), Value::from("say \"hi\""));
    }

    #[test]
    fn test_incr_arguments() {
        assert_eq!(
            op("z incr hits 1"),
            Op::Incr {
                key: b"hits".to_vec(),
                delta: 1.0,
                init: None,
                init_ttl_ms: 0,
            }
        );
        assert_eq!(
            op("z incr hits 1 0 60000"),
            Op::Incr {
                key: b"hits".to_vec(),
                delta: 1.0,
                init: Some(0.0),
                init_ttl_ms: 60000,
            }
        );
    }

    #[test]
    fn test_list_ops() {
        assert_eq!(
            op("z lpush q \"job 1\""),
            Op::Push {
                key: b"q".to_vec(),
                item: Scalar::from("job 1"),
                end: End::Front,
            }
        );
        assert_eq!(
            op("z rpop q"),
            Op::Pop {
                key: b"q".to_vec(),
                end: End::Back,
            }
        );
        assert!(matches!(
            Command::parse("z rpush q true"),
            Err(CommandError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_optional_counts() {
        assert_eq!(op("z get_keys"), Op::GetKeys { max_count: DEFAULT_KEYS_LIMIT });
        assert_eq!(op("z get_keys 0"), Op::GetKeys { max_count: 0 });
        assert_eq!(op("z flush_expired"), Op::FlushExpired { max_count: 0 });
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            Command::parse("z"),
            Err(CommandError::MissingArgument("operation"))
        );
        assert_eq!(
            Command::parse("z frobnicate k"),
            Err(CommandError::UnknownOp("frobnicate".to_string()))
        );
        assert_eq!(
            Command::parse("z get"),
            Err(CommandError::MissingArgument("key"))
        );
        assert_eq!(
            Command::parse("z get a b"),
            Err(CommandError::UnexpectedArgument("b".to_string()))
        );
        assert_eq!(
            Command::parse("z expire k soon"),
            Err(CommandError::InvalidArgument {
                name: "ttl",
                value: "soon".to_string(),
            })
        );
        assert_eq!(
            Command::parse("z set k \"open"),
            Err(CommandError::UnterminatedQuote)
        );
    }

    #[test]
    fn test_quoted_key_and_zone() {
        assert_eq!(
            parse("\"my zone\" get \"a key\""),
            Command::Zone {
                zone: "my zone".to_string(),
                op: Op::Get {
                    key: b"a key".to_vec(),
                },
            }
        );
    }
}
