use std::ops::Range;

use bson::oid::ObjectId;
use bson::spec::ElementType;
use bson::{DateTime, Decimal128, Timestamp};

use crate::element::fixed_size;
use crate::error::CodecError;
use crate::source::Source;
use crate::value::{Document, Value};

/// BSON caps document nesting at 100 levels.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Smallest legal container: i32 length + terminating nul.
const MIN_CONTAINER_LEN: usize = 5;

/// Forward-only cursor over BSON bytes.
///
/// The caller drives it element by element:
///
/// ```text
/// read_start_container()
/// while let Some(tag) = read_element()? {
///     name();  skip_value(tag) | read_value(tag) | read_start_container() ...
/// }
/// read_end_container()
/// ```
///
/// Every read is checked against the end of the innermost open container,
/// so a length that lies about its contents fails instead of bleeding into
/// the next field.
pub struct Reader<'a, S: Source + ?Sized = [u8]> {
    src: &'a S,
    pos: usize,
    /// Exclusive end offset of each open container, innermost last.
    frames: Vec<usize>,
    name: String,
    max_depth: usize,
}

impl<'a, S: Source + ?Sized> Reader<'a, S> {
    pub fn new(src: &'a S) -> Self {
        Self {
            src,
            pos: 0,
            frames: Vec::new(),
            name: String::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn source(&self) -> &'a S {
        self.src
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of open containers.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Rewind to a position previously returned by [`position`](Self::position)
    /// while the same container is open.
    pub fn reset(&mut self, position: usize) {
        debug_assert!(position <= self.limit());
        self.pos = position;
    }

    /// Name of the element most recently returned by
    /// [`read_element`](Self::read_element).
    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Containers ──────────────────────────────────────────────

    /// Consume a container's length header and open it.
    pub fn read_start_container(&mut self) -> Result<(), CodecError> {
        if self.frames.len() >= self.max_depth {
            return Err(CodecError::DepthLimitExceeded(self.max_depth));
        }
        let start = self.pos;
        let len = self.read_len()?;
        if len < MIN_CONTAINER_LEN {
            return Err(CodecError::malformed(start, "container length below minimum"));
        }
        let end = start + len;
        if end > self.limit() {
            return Err(CodecError::UnexpectedEof {
                offset: start,
                needed: end - self.limit(),
            });
        }
        if self.src.byte_at(end - 1) != 0 {
            return Err(CodecError::malformed(end - 1, "container not nul-terminated"));
        }
        self.frames.push(end);
        Ok(())
    }

    /// Close the innermost container. Must follow a `read_element` that
    /// returned `None`.
    pub fn read_end_container(&mut self) -> Result<(), CodecError> {
        match self.frames.pop() {
            Some(end) if end == self.pos => Ok(()),
            Some(_) => Err(CodecError::malformed(self.pos, "container closed before its end")),
            None => Err(CodecError::malformed(self.pos, "no open container")),
        }
    }

    /// Read the next element header. Returns `None` at the container's
    /// terminator; the element name is then available through
    /// [`name`](Self::name).
    pub fn read_element(&mut self) -> Result<Option<ElementType>, CodecError> {
        self.need(1)?;
        let offset = self.pos;
        let tag = self.src.byte_at(offset);
        self.pos += 1;
        if tag == 0 {
            if self.frames.last() != Some(&self.pos) {
                return Err(CodecError::malformed(offset, "terminator before container end"));
            }
            return Ok(None);
        }
        let element_type =
            ElementType::from(tag).ok_or(CodecError::UnsupportedType { tag, offset })?;
        self.read_name()?;
        Ok(Some(element_type))
    }

    fn read_name(&mut self) -> Result<(), CodecError> {
        let start = self.pos;
        let nul = self
            .src
            .find_nul(start, self.limit())
            .ok_or(CodecError::malformed(start, "unterminated element name"))?;
        let mut buf = std::mem::take(&mut self.name).into_bytes();
        buf.clear();
        self.src.append_to(start..nul, &mut buf);
        self.name = String::from_utf8(buf).map_err(|_| CodecError::InvalidUtf8 { offset: start })?;
        self.pos = nul + 1;
        Ok(())
    }

    // ── Skipping ────────────────────────────────────────────────

    /// Byte length of the current value, computed from its type's length
    /// rules without decoding it.
    ///
    /// Length prefixes are cross-checked against the terminators they
    /// imply, so a span that passes can be copied to the output verbatim.
    pub fn value_len(&self, tag: ElementType) -> Result<usize, CodecError> {
        if let Some(n) = fixed_size(tag) {
            self.check(self.pos, n)?;
            return Ok(n);
        }
        let at = self.pos;
        let len = match tag {
            ElementType::String | ElementType::JavaScriptCode | ElementType::Symbol => {
                self.string_span(at)?
            }
            ElementType::EmbeddedDocument | ElementType::Array => self.container_span(at)?,
            ElementType::JavaScriptCodeWithScope => {
                let total = self.peek_len(at)?;
                let code = self.string_span(at + 4)?;
                let scope = self.container_span(at + 4 + code)?;
                if 4 + code + scope != total {
                    return Err(CodecError::malformed(at, "code-with-scope length mismatch"));
                }
                total
            }
            ElementType::Binary => 4 + 1 + self.peek_len(at)?,
            ElementType::RegularExpression => {
                let pattern_end = self.cstring_end(at)?;
                self.cstring_end(pattern_end)? - at
            }
            ElementType::DbPointer => self.string_span(at)? + 12,
            _ => return Err(CodecError::malformed(at, "no length rule for type")),
        };
        self.check(at, len)?;
        Ok(len)
    }

    /// Span of a length-prefixed string at `at`, prefix included. The
    /// declared last byte must be its nul.
    fn string_span(&self, at: usize) -> Result<usize, CodecError> {
        let len = 4 + self.peek_string_len(at)?;
        self.check(at, len)?;
        if self.src.byte_at(at + len - 1) != 0 {
            return Err(CodecError::malformed(at, "string not nul-terminated"));
        }
        Ok(len)
    }

    /// Span of an embedded document or array at `at`.
    fn container_span(&self, at: usize) -> Result<usize, CodecError> {
        let len = self.peek_len(at)?;
        if len < MIN_CONTAINER_LEN {
            return Err(CodecError::malformed(at, "container length below minimum"));
        }
        self.check(at, len)?;
        if self.src.byte_at(at + len - 1) != 0 {
            return Err(CodecError::malformed(at + len - 1, "container not nul-terminated"));
        }
        Ok(len)
    }

    /// Move past the current value. Returns the span it occupied.
    pub fn skip_value(&mut self, tag: ElementType) -> Result<Range<usize>, CodecError> {
        let start = self.pos;
        self.pos += self.value_len(tag)?;
        Ok(start..self.pos)
    }

    // ── Materialization ─────────────────────────────────────────

    /// Decode the current value, including whole sub-trees.
    pub fn read_value(&mut self, tag: ElementType) -> Result<Value, CodecError> {
        let value = match tag {
            ElementType::Double => Value::Double(f64::from_le_bytes(self.take_array()?)),
            ElementType::String => Value::String(self.read_string()?),
            ElementType::EmbeddedDocument => Value::Document(self.read_document()?),
            ElementType::Array => Value::Array(self.read_array()?),
            ElementType::Binary => {
                let len = self.read_len()?;
                let subtype = self.take_array::<1>()?[0];
                let bytes = self.take_bytes(len)?;
                Value::Binary { subtype, bytes }
            }
            ElementType::Undefined => Value::Undefined,
            ElementType::ObjectId => Value::ObjectId(ObjectId::from_bytes(self.take_array()?)),
            ElementType::Boolean => match self.take_array::<1>()?[0] {
                0 => Value::Boolean(false),
                1 => Value::Boolean(true),
                _ => return Err(CodecError::malformed(self.pos - 1, "invalid boolean")),
            },
            ElementType::DateTime => {
                Value::DateTime(DateTime::from_millis(i64::from_le_bytes(self.take_array()?)))
            }
            ElementType::Null => Value::Null,
            ElementType::RegularExpression => {
                let pattern = self.read_cstring()?;
                let options = self.read_cstring()?;
                Value::Regex { pattern, options }
            }
            ElementType::DbPointer => {
                let namespace = self.read_string()?;
                let id = ObjectId::from_bytes(self.take_array()?);
                Value::DbPointer { namespace, id }
            }
            ElementType::JavaScriptCode => Value::JavaScript(self.read_string()?),
            ElementType::Symbol => Value::Symbol(self.read_string()?),
            ElementType::JavaScriptCodeWithScope => {
                let start = self.pos;
                let total = self.read_len()?;
                let code = self.read_string()?;
                let scope = self.read_document()?;
                if self.pos - start != total {
                    return Err(CodecError::malformed(start, "code-with-scope length mismatch"));
                }
                Value::JavaScriptWithScope { code, scope }
            }
            ElementType::Int32 => Value::Int32(i32::from_le_bytes(self.take_array()?)),
            ElementType::Timestamp => {
                let increment = u32::from_le_bytes(self.take_array()?);
                let time = u32::from_le_bytes(self.take_array()?);
                Value::Timestamp(Timestamp { time, increment })
            }
            ElementType::Int64 => Value::Int64(i64::from_le_bytes(self.take_array()?)),
            ElementType::Decimal128 => Value::Decimal128(Decimal128::from_bytes(self.take_array()?)),
            ElementType::MinKey => Value::MinKey,
            ElementType::MaxKey => Value::MaxKey,
        };
        Ok(value)
    }

    /// Decode a whole document starting at the current position.
    pub fn read_document(&mut self) -> Result<Document, CodecError> {
        self.read_start_container()?;
        let mut doc = Document::new();
        while let Some(tag) = self.read_element()? {
            let key = self.name.clone();
            let value = self.read_value(tag)?;
            doc.insert(key, value);
        }
        self.read_end_container()?;
        Ok(doc)
    }

    fn read_array(&mut self) -> Result<Vec<Value>, CodecError> {
        self.read_start_container()?;
        let mut items = Vec::new();
        while let Some(tag) = self.read_element()? {
            items.push(self.read_value(tag)?);
        }
        self.read_end_container()?;
        Ok(items)
    }

    // ── Primitives ──────────────────────────────────────────────

    fn limit(&self) -> usize {
        self.frames.last().copied().unwrap_or(self.src.len())
    }

    fn check(&self, at: usize, n: usize) -> Result<(), CodecError> {
        let limit = self.limit();
        if at + n > limit {
            return Err(CodecError::UnexpectedEof {
                offset: at,
                needed: at + n - limit,
            });
        }
        Ok(())
    }

    fn need(&self, n: usize) -> Result<(), CodecError> {
        self.check(self.pos, n)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        self.need(N)?;
        let out = self.src.read_array::<N>(self.pos);
        self.pos += N;
        Ok(out)
    }

    fn take_bytes(&mut self, n: usize) -> Result<Vec<u8>, CodecError> {
        self.need(n)?;
        let mut out = Vec::with_capacity(n);
        self.src.append_to(self.pos..self.pos + n, &mut out);
        self.pos += n;
        Ok(out)
    }

    /// Non-negative i32 length at `at`.
    fn peek_len(&self, at: usize) -> Result<usize, CodecError> {
        self.check(at, 4)?;
        let len = i32::from_le_bytes(self.src.read_array::<4>(at));
        usize::try_from(len).map_err(|_| CodecError::malformed(at, "negative length"))
    }

    fn read_len(&mut self) -> Result<usize, CodecError> {
        let len = self.peek_len(self.pos)?;
        self.pos += 4;
        Ok(len)
    }

    /// Length prefix of a string: counts the trailing nul, so never zero.
    fn peek_string_len(&self, at: usize) -> Result<usize, CodecError> {
        let len = self.peek_len(at)?;
        if len == 0 {
            return Err(CodecError::malformed(at, "string length is zero"));
        }
        Ok(len)
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        let start = self.pos;
        let len = self.peek_string_len(start)?;
        self.pos += 4;
        let mut bytes = self.take_bytes(len)?;
        if bytes.pop() != Some(0) {
            return Err(CodecError::malformed(start, "string not nul-terminated"));
        }
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 { offset: start })
    }

    /// Offset just past the nul that terminates the cstring at `at`.
    fn cstring_end(&self, at: usize) -> Result<usize, CodecError> {
        self.src
            .find_nul(at, self.limit())
            .map(|nul| nul + 1)
            .ok_or(CodecError::malformed(at, "unterminated cstring"))
    }

    fn read_cstring(&mut self) -> Result<String, CodecError> {
        let start = self.pos;
        let end = self.cstring_end(start)?;
        let bytes = self.take_bytes(end - start)?;
        let text = &bytes[..bytes.len() - 1];
        String::from_utf8(text.to_vec()).map_err(|_| CodecError::InvalidUtf8 { offset: start })
    }
}
