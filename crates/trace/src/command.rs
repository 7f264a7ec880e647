use crate::error::TraceError;

/// One parsed trace line. Addresses and counts are hex in the trace text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quota(u32),
    Put { addr: u32, bytes: Vec<u8> },
    Fill { addr: u32, count: u32, value: u8 },
    Copy { dst: u32, src: u32, count: u32 },
    /// Expected values keep all 32 bits, so one above `0xff` never matches.
    Compare { addr: u32, expected: Vec<u32> },
    Dump { addr: u32, count: u32 },
    Writable { addr: u32, count: u32, writable: bool },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Quota(_) => "quota",
            Command::Put { .. } => "put",
            Command::Fill { .. } => "fill",
            Command::Copy { .. } => "copy",
            Command::Compare { .. } => "compare",
            Command::Dump { .. } => "dump",
            Command::Writable { .. } => "writable",
        }
    }
}

/// Parse a hex number with an optional `0x` prefix.
pub fn parse_hex(text: &str) -> Result<u32, std::num::ParseIntError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16)
}

/// True for lines that carry no command.
pub fn is_comment(text: &str) -> bool {
    let text = text.trim_start();
    text.is_empty() || text.starts_with('#')
}

struct Args<'a> {
    line: usize,
    command: &'a str,
    tokens: std::str::SplitWhitespace<'a>,
}

impl Args<'_> {
    fn next(&mut self, what: &'static str) -> Result<u32, TraceError> {
        let token = self.tokens.next().ok_or_else(|| TraceError::MissingArgument {
            line: self.line,
            command: self.command.to_string(),
            what,
        })?;
        hex_arg(self.line, token)
    }

    /// Byte-valued arguments keep their low eight bits.
    fn byte(&mut self, what: &'static str) -> Result<u8, TraceError> {
        Ok(self.next(what)? as u8)
    }

    fn rest(&mut self) -> Result<Vec<u32>, TraceError> {
        let line = self.line;
        self.tokens.by_ref().map(|token| hex_arg(line, token)).collect()
    }

    fn rest_bytes(&mut self) -> Result<Vec<u8>, TraceError> {
        Ok(self.rest()?.into_iter().map(|value| value as u8).collect())
    }
}

fn hex_arg(line: usize, token: &str) -> Result<u32, TraceError> {
    parse_hex(token).map_err(|_| TraceError::BadArgument {
        line,
        arg: token.to_string(),
    })
}

/// Parse trace line `line`. Comments and blank lines yield `None`.
/// Arguments beyond those a command takes are ignored.
pub fn parse_command(line: usize, text: &str) -> Result<Option<Command>, TraceError> {
    if is_comment(text) {
        return Ok(None);
    }
    let mut tokens = text.split_whitespace();
    let Some(op) = tokens.next() else {
        return Ok(None);
    };
    let mut args = Args {
        line,
        command: op,
        tokens,
    };

    let parsed = match op {
        "quota" => Command::Quota(args.next("page count")?),
        "put" => Command::Put {
            addr: args.next("address")?,
            bytes: args.rest_bytes()?,
        },
        "fill" => Command::Fill {
            addr: args.next("address")?,
            count: args.next("count")?,
            value: args.byte("value")?,
        },
        "copy" => Command::Copy {
            dst: args.next("destination")?,
            src: args.next("source")?,
            count: args.next("count")?,
        },
        "compare" => Command::Compare {
            addr: args.next("address")?,
            expected: args.rest()?,
        },
        "dump" => Command::Dump {
            addr: args.next("address")?,
            count: args.next("count")?,
        },
        "writable" => Command::Writable {
            addr: args.next("address")?,
            count: args.next("count")?,
            writable: args.next("flag")? != 0,
        },
        _ => {
            return Err(TraceError::UnknownCommand {
                line,
                text: text.to_string(),
            });
        }
    };
    Ok(Some(parsed))
}
