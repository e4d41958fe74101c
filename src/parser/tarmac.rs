//! Tarmac trace line parser.
//!
//! Turns one raw line into a typed `TraceEvent`:
//!
//! ```text
//!       22225 ns IT 10000076 488e        LDR      r0,[pc,#568]  ; [0x100002b0]
//!       22425 ns MR4_D 100002b0 2001ec00
//!       22425 ns R r13 2001fe48 (MSP)
//! ```
//!
//! Parsing is a pure function of the line and the previous accepted
//! timestamp; the caller owns the ordering state.

use super::schema::{
    AccessSpace, EventKind, FetchState, HexWord, InstructionFetch, MemoryAccess, RegisterWrite,
    TraceEvent,
};
use crate::utils::error::ParseError;

/// Event tag of the reduced-information fetch line (`E NOT_IN_THUMB_STATE ...`)
const NOT_IN_THUMB_STATE: &str = "NOT_IN_THUMB_STATE";

/// Whitespace-separated field cursor that can hand back the untouched rest of the line
struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn next(&mut self) -> Option<&'a str> {
        let trimmed = self.rest.trim_start();
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }
        let end = trimmed
            .find(|c: char| c.is_whitespace())
            .unwrap_or(trimmed.len());
        let (token, rest) = trimmed.split_at(end);
        self.rest = rest;
        Some(token)
    }

    fn require(&mut self, field: &'static str) -> Result<&'a str, ParseError> {
        self.next().ok_or(ParseError::MissingField { field })
    }

    /// Remaining text with surrounding whitespace removed
    fn remainder(&self) -> Option<&'a str> {
        let rest = self.rest.trim();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Parse one trace line
///
/// **Public** - main entry point for line parsing
///
/// # Arguments
/// * `text` - Line content without its terminator
/// * `line_number` - 1-based position in the input
/// * `previous_timestamp` - Last accepted timestamp, for the ordering check
///
/// # Errors
/// * `ParseError::UnrecognizedLine` - Not a comment and no timestamp/unit prefix
/// * `ParseError::MissingField` - A known tag without its required fields
/// * `ParseError::MalformedHex` - Address, encoding or value is not hex
/// * `ParseError::OutOfOrderTimestamp` - Time went backwards
pub fn parse_line(
    text: &str,
    line_number: usize,
    previous_timestamp: Option<u64>,
) -> Result<TraceEvent, ParseError> {
    if is_passthrough(text) {
        return Ok(TraceEvent::opaque(line_number, text));
    }

    let mut fields = Fields::new(text);

    let timestamp = fields
        .next()
        .and_then(|token| token.parse::<u64>().ok())
        .ok_or_else(|| ParseError::UnrecognizedLine(text.trim().to_string()))?;

    match fields.next() {
        Some(unit) if unit.chars().all(|c| c.is_ascii_alphabetic()) => {}
        _ => return Err(ParseError::UnrecognizedLine(text.trim().to_string())),
    }

    if let Some(previous) = previous_timestamp {
        if timestamp < previous {
            return Err(ParseError::OutOfOrderTimestamp {
                previous,
                found: timestamp,
            });
        }
    }

    let tag = fields.require("tag")?;

    let kind = match tag {
        "IT" => EventKind::InstructionFetch(parse_fetch(&mut fields, FetchState::Executed)?),
        "IS" => EventKind::InstructionFetch(parse_fetch(&mut fields, FetchState::Skipped)?),
        "E" => match fields.next() {
            Some(NOT_IN_THUMB_STATE) => EventKind::InstructionFetch(parse_fetch(
                &mut fields,
                FetchState::NotInThumbState,
            )?),
            _ => EventKind::Opaque,
        },
        "R" => EventKind::RegisterWrite(parse_register(&mut fields)?),
        t if t.starts_with("MR") => EventKind::MemoryRead(parse_access(t, &mut fields)?),
        t if t.starts_with("MW") => EventKind::MemoryWrite(parse_access(t, &mut fields)?),
        _ => EventKind::Opaque,
    };

    Ok(TraceEvent {
        line_number,
        timestamp: Some(timestamp),
        kind,
        text: text.to_string(),
    })
}

/// Blank lines and pre-existing comments
fn is_passthrough(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.is_empty()
        || trimmed.starts_with(';')
        || trimmed.starts_with('#')
        || trimmed.starts_with("//")
}

fn parse_fetch(fields: &mut Fields<'_>, state: FetchState) -> Result<InstructionFetch, ParseError> {
    let address = parse_hex("address", fields.require("address")?)?;
    let encoding = parse_hex("encoding", fields.require("encoding")?)?;

    let disassembly = match state {
        FetchState::NotInThumbState => None,
        _ => fields.remainder().map(str::to_string),
    };

    Ok(InstructionFetch {
        address: address.value,
        encoding,
        disassembly,
        state,
    })
}

fn parse_access(tag: &str, fields: &mut Fields<'_>) -> Result<MemoryAccess, ParseError> {
    let address = parse_hex("address", fields.require("address")?)?;
    let value = parse_hex("value", fields.require("value")?)?;

    // MR4_D: width digit after the direction, space after the underscore
    let width = tag[2..]
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .map(|w| w as u8);

    let space = match tag.rsplit_once('_').map(|(_, suffix)| suffix) {
        Some("D") => AccessSpace::Data,
        Some("I") => AccessSpace::Instruction,
        _ => AccessSpace::Other,
    };

    Ok(MemoryAccess {
        tag: tag.to_string(),
        width,
        space,
        address: address.value,
        value,
    })
}

fn parse_register(fields: &mut Fields<'_>) -> Result<RegisterWrite, ParseError> {
    let register = fields.require("register")?;
    let value = parse_hex("value", fields.require("value")?)?;

    let alias = fields
        .next()
        .and_then(|token| token.strip_prefix('('))
        .and_then(|token| token.strip_suffix(')'))
        .filter(|alias| !alias.is_empty())
        .map(str::to_string);

    Ok(RegisterWrite {
        register: register.to_string(),
        value,
        alias,
    })
}

/// Parse a hex token, with or without `0x`, remembering its width
///
/// **Public** - shared with the list file and watch list loaders
pub fn parse_hex(field: &'static str, token: &str) -> Result<HexWord, ParseError> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);

    if digits.is_empty() || digits.len() > 16 {
        return Err(ParseError::MalformedHex {
            field,
            token: token.to_string(),
        });
    }

    u64::from_str_radix(digits, 16)
        .map(|value| HexWord::new(value, digits.len()))
        .map_err(|_| ParseError::MalformedHex {
            field,
            token: token.to_string(),
        })
}
