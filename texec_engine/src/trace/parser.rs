//! Trace record parser
//!
//! Decodes one line of tracer output. Two encodings are accepted:
//! - json: `{"event":26,"ts":1000,"ctx":{"task":1,"info":{"prio":3}}}`
//! - compact: `[1000|26|1|1:3]`, i.e. `[<ts>|<event>|<task>|<info_id>:<info_value>]`
//!
//! Parsing is a pure function of the record. Every failure is returned as a
//! [`ParseError`]; the caller decides whether a skipped record is worth logging.

use serde::Deserialize;
use serde_json::json;

use super::error::{ParseError, ParseResult};
use super::event::{
    Event, EventKind, Payload, INFO_CODE_MARKER, INFO_CODE_MESSAGE, INFO_CODE_NONE,
    INFO_CODE_PRIORITY,
};

/// Wire format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceFormat {
    /// Pick the grammar from the first character of the record
    #[default]
    Auto,
    Json,
    Compact,
}

impl std::str::FromStr for TraceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(TraceFormat::Auto),
            "json" => Ok(TraceFormat::Json),
            "compact" | "text" => Ok(TraceFormat::Compact),
            _ => Err(format!(
                "Unknown trace format '{}'. Use 'auto', 'json' or 'compact'",
                s
            )),
        }
    }
}

/// Parse a record, detecting its format
pub fn parse(raw: &str) -> ParseResult<Event> {
    parse_with(raw, TraceFormat::Auto)
}

/// Parse a record with an explicit format
pub fn parse_with(raw: &str, format: TraceFormat) -> ParseResult<Event> {
    match format {
        TraceFormat::Json => parse_json(raw),
        TraceFormat::Compact => parse_compact(raw),
        TraceFormat::Auto => {
            let record = raw.trim();
            match record.chars().next() {
                None => Err(ParseError::Empty),
                Some('{') => parse_json(record),
                Some('[') => parse_compact(record),
                Some(_) => Err(ParseError::UnrecognizedFormat),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonRecord {
    event: u32,
    ts: u64,
    ctx: JsonContext,
}

#[derive(Debug, Deserialize)]
struct JsonContext {
    task: u32,
    #[serde(default)]
    info: JsonInfo,
}

#[derive(Debug, Default, Deserialize)]
struct JsonInfo {
    prio: Option<u32>,
    msg: Option<String>,
    mark: Option<u32>,
}

impl JsonInfo {
    fn into_payload(self) -> ParseResult<Payload> {
        match (self.prio, self.msg, self.mark) {
            (None, None, None) => Ok(Payload::None),
            (Some(prio), None, None) => Ok(Payload::Priority(prio)),
            (None, Some(msg), None) => Ok(Payload::Text(msg)),
            (None, None, Some(mark)) => Ok(Payload::Marker(mark)),
            _ => Err(ParseError::AmbiguousPayload),
        }
    }
}

/// Parse a json record
pub fn parse_json(raw: &str) -> ParseResult<Event> {
    let record = raw.trim();
    if record.is_empty() {
        return Err(ParseError::Empty);
    }

    // Structs also deserialize from arrays; only objects are records
    let value: serde_json::Value = serde_json::from_str(record)?;
    if !value.is_object() {
        return Err(ParseError::Json("top level is not an object".to_string()));
    }

    let decoded = JsonRecord::deserialize(value)?;
    let kind =
        EventKind::from_code(decoded.event).ok_or(ParseError::UnknownEventCode(decoded.event))?;
    let payload = decoded.ctx.info.into_payload()?;

    Ok(Event::new(decoded.ts, kind, decoded.ctx.task).with_payload(payload))
}

/// Parse a compact `[ts|event|task|info_id:info_value]` record
pub fn parse_compact(raw: &str) -> ParseResult<Event> {
    let record = raw.trim();
    if record.is_empty() {
        return Err(ParseError::Empty);
    }

    let body = record
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| ParseError::malformed("expected a record enclosed in '[' and ']'"))?;

    // The info value is last so it may contain separators
    let mut fields = body.splitn(4, '|');
    let (Some(ts), Some(event), Some(task), Some(info)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(ParseError::malformed("expected 4 '|' separated fields"));
    };

    let timestamp: u64 = parse_number("ts", ts)?;
    let event_code: u32 = parse_number("event", event)?;
    let task_id: u32 = parse_number("task", task)?;

    let (info_id, info_value) = info
        .split_once(':')
        .ok_or_else(|| ParseError::malformed("expected '<info_id>:<info_value>'"))?;
    let info_code: u32 = parse_number("info_id", info_id)?;

    let kind = EventKind::from_code(event_code).ok_or(ParseError::UnknownEventCode(event_code))?;
    let payload = match info_code {
        INFO_CODE_NONE if info_value.is_empty() => Payload::None,
        INFO_CODE_NONE => {
            return Err(ParseError::malformed("info id 0 carries a value"));
        }
        INFO_CODE_PRIORITY => Payload::Priority(parse_number("prio", info_value)?),
        INFO_CODE_MESSAGE => Payload::Text(info_value.to_string()),
        INFO_CODE_MARKER => Payload::Marker(parse_number("mark", info_value)?),
        other => return Err(ParseError::UnknownInfoCode(other)),
    };

    Ok(Event::new(timestamp, kind, task_id).with_payload(payload))
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> ParseResult<T> {
    value
        .parse()
        .map_err(|_| ParseError::invalid_number(field, value))
}

impl Event {
    /// Encode as a json record (without trailing newline)
    ///
    /// `duration` is a reconstruction product and is not encoded.
    pub fn to_json_line(&self) -> String {
        let info = match &self.payload {
            Payload::None => json!({}),
            Payload::Priority(prio) => json!({ "prio": prio }),
            Payload::Text(msg) => json!({ "msg": msg }),
            Payload::Marker(mark) => json!({ "mark": mark }),
        };

        json!({
            "ts": self.timestamp,
            "event": self.kind.code(),
            "ctx": { "task": self.task_id, "info": info },
        })
        .to_string()
    }

    /// Encode as a compact record (without trailing newline)
    ///
    /// Text payloads are written verbatim and must not contain line breaks.
    pub fn to_compact_line(&self) -> String {
        let value = match &self.payload {
            Payload::None => String::new(),
            Payload::Priority(prio) => prio.to_string(),
            Payload::Text(text) => text.clone(),
            Payload::Marker(mark) => mark.to_string(),
        };

        format!(
            "[{}|{}|{}|{}:{}]",
            self.timestamp,
            self.kind.code(),
            self.task_id,
            self.payload.info_code(),
            value
        )
    }
}
