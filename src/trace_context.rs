//! W3C Trace Context parsing.
//!
//! Implements the `traceparent` header of the W3C Trace Context recommendation:
//! <https://www.w3.org/TR/trace-context/>
//!
//! Format: `traceparent: {version}-{trace-id}-{parent-id}-{trace-flags}`
//! Example: `traceparent: 00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01`
//!
//! Parsing is a pure function over the header value: no I/O, no shared state.

use std::fmt;

use http::HeaderMap;

/// Header name carrying the inbound parent context.
pub const TRACEPARENT: &str = "traceparent";

/// The only version this crate emits.
const SUPPORTED_VERSION: u8 = 0x00;

/// Version `ff` is forbidden by W3C Trace Context.
const FORBIDDEN_VERSION: u8 = 0xff;

/// Trace flags bit 0: sampled.
const FLAG_SAMPLED: u8 = 0x01;

const VERSION_HEX_LEN: usize = 2;
const TRACE_ID_HEX_LEN: usize = 32;
const SPAN_ID_HEX_LEN: usize = 16;
const FLAGS_HEX_LEN: usize = 2;

// =============================================================================
// Identifiers
// =============================================================================

/// 16-byte trace identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraceId([u8; 16]);

impl TraceId {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    /// An id is valid when at least one byte is non-zero.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0.iter().any(|&b| b != 0)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceId({})", self)
    }
}

/// 8-byte span identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpanId([u8; 8]);

impl SpanId {
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 8] {
        self.0
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0.iter().any(|&b| b != 0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpanId({})", self)
    }
}

/// Trace flags byte (bit 0 = sampled).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TraceFlags(u8);

impl TraceFlags {
    pub const NOT_SAMPLED: TraceFlags = TraceFlags(0x00);
    pub const SAMPLED: TraceFlags = TraceFlags(FLAG_SAMPLED);

    pub const fn new(flags: u8) -> Self {
        Self(flags)
    }

    #[inline]
    pub fn is_sampled(&self) -> bool {
        self.0 & FLAG_SAMPLED != 0
    }

    pub const fn to_u8(self) -> u8 {
        self.0
    }
}

// =============================================================================
// Span context
// =============================================================================

/// Identity of a span as seen across process boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    flags: TraceFlags,
    remote: bool,
}

/// A span context decoded from an inbound `traceparent` header.
///
/// Always remote: the header only ever arrives from another process.
pub type ParsedParentContext = SpanContext;

impl SpanContext {
    /// Context of a span created in this process.
    pub fn new_local(trace_id: TraceId, span_id: SpanId, flags: TraceFlags) -> Self {
        Self {
            trace_id,
            span_id,
            flags,
            remote: false,
        }
    }

    #[inline]
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    #[inline]
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    #[inline]
    pub fn flags(&self) -> TraceFlags {
        self.flags
    }

    #[inline]
    pub fn is_sampled(&self) -> bool {
        self.flags.is_sampled()
    }

    #[inline]
    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// Format as a version `00` traceparent header value.
    pub fn to_traceparent(&self) -> String {
        format!(
            "{:02x}-{}-{}-{:02x}",
            SUPPORTED_VERSION,
            self.trace_id,
            self.span_id,
            self.flags.to_u8()
        )
    }
}

impl fmt::Display for SpanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_traceparent())
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Reasons a traceparent header cannot be used as a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    /// Wrong number of fields or wrong field lengths.
    MalformedHeader,
    /// A field is not valid hexadecimal.
    InvalidHex,
    /// Version `ff`.
    UnsupportedVersion,
    /// All-zero trace-id or parent-id.
    ZeroId,
}

impl ParseFailure {
    /// Stable short code, used as a span attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseFailure::MalformedHeader => "malformed_header",
            ParseFailure::InvalidHex => "invalid_hex",
            ParseFailure::UnsupportedVersion => "unsupported_version",
            ParseFailure::ZeroId => "zero_id",
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::MalformedHeader => write!(f, "malformed traceparent header"),
            ParseFailure::InvalidHex => write!(f, "invalid hex in traceparent header"),
            ParseFailure::UnsupportedVersion => write!(f, "unsupported traceparent version"),
            ParseFailure::ZeroId => write!(f, "all-zero trace id or parent id"),
        }
    }
}

impl std::error::Error for ParseFailure {}

/// Parse a W3C traceparent header value.
///
/// Structure is checked first (three `-` delimiters, field lengths), then hex
/// decoding, then the version and non-zero id rules.
pub fn parse(header: &str) -> Result<ParsedParentContext, ParseFailure> {
    let header = header.trim();

    let mut fields = header.splitn(4, '-');
    let (version, trace_id, parent_id, rest) =
        match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(v), Some(t), Some(p), Some(r)) => (v, t, p, r),
            _ => return Err(ParseFailure::MalformedHeader),
        };

    if version.len() != VERSION_HEX_LEN
        || trace_id.len() != TRACE_ID_HEX_LEN
        || parent_id.len() != SPAN_ID_HEX_LEN
    {
        return Err(ParseFailure::MalformedHeader);
    }

    // Later versions may append fields after the flags.
    let flags = if rest.len() == FLAGS_HEX_LEN {
        rest
    } else if rest.len() > FLAGS_HEX_LEN
        && rest.as_bytes()[FLAGS_HEX_LEN] == b'-'
        && version != "00"
    {
        &rest[..FLAGS_HEX_LEN]
    } else {
        return Err(ParseFailure::MalformedHeader);
    };

    let [version] = decode_hex::<1>(version)?;
    let trace_id = TraceId::from_bytes(decode_hex::<16>(trace_id)?);
    let span_id = SpanId::from_bytes(decode_hex::<8>(parent_id)?);
    let [flags] = decode_hex::<1>(flags)?;

    if version == FORBIDDEN_VERSION {
        return Err(ParseFailure::UnsupportedVersion);
    }

    if !trace_id.is_valid() || !span_id.is_valid() {
        return Err(ParseFailure::ZeroId);
    }

    Ok(SpanContext {
        trace_id,
        span_id,
        flags: TraceFlags::new(flags),
        remote: true,
    })
}

/// Look up and parse the traceparent header.
///
/// `None` when the header is absent. Header names are matched
/// case-insensitively by [`HeaderMap`]. A header that is repeated or is not
/// visible ASCII is malformed.
pub fn extract(headers: &HeaderMap) -> Option<Result<ParsedParentContext, ParseFailure>> {
    let mut values = headers.get_all(TRACEPARENT).iter();
    let value = values.next()?;

    if values.next().is_some() {
        return Some(Err(ParseFailure::MalformedHeader));
    }

    Some(
        value
            .to_str()
            .map_err(|_| ParseFailure::MalformedHeader)
            .and_then(parse),
    )
}

// =============================================================================
// Hex helpers
// =============================================================================

/// Decode exactly `N` bytes, two hex digits per byte.
fn decode_hex<const N: usize>(field: &str) -> Result<[u8; N], ParseFailure> {
    let digits = field.as_bytes();
    if digits.len() != N * 2 {
        return Err(ParseFailure::InvalidHex);
    }

    let mut out = [0u8; N];
    for (byte, pair) in out.iter_mut().zip(digits.chunks_exact(2)) {
        let hi = hex_value(pair[0]).ok_or(ParseFailure::InvalidHex)?;
        let lo = hex_value(pair[1]).ok_or(ParseFailure::InvalidHex)?;
        *byte = (hi << 4) | lo;
    }
    Ok(out)
}

#[inline]
fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
