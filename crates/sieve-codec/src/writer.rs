use std::ops::{Deref, DerefMut, Range};

use bson::spec::ElementType;

use crate::error::CodecError;
use crate::sink::Sink;
use crate::source::Source;
use crate::value::{Document, Value};

struct Frame {
    /// Offset of the container's i32 length field.
    start: usize,
    /// Next positional key, for array frames.
    next_index: Option<usize>,
}

/// A rewind point: output position, open-container depth and the array
/// counter of the innermost frame at the time of the mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    position: usize,
    depth: usize,
    next_index: Option<usize>,
}

/// Streaming BSON writer.
///
/// Container lengths are reserved on open and back-patched on close. Keys
/// written inside an array frame are replaced by the frame's own
/// positional counter, so arrays stay densely indexed after elements are
/// dropped.
pub struct Writer<K: Sink = Vec<u8>> {
    sink: K,
    frames: Vec<Frame>,
}

impl Writer<Vec<u8>> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(Vec::with_capacity(capacity))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.sink
    }
}

impl<K: Sink> Writer<K> {
    pub fn new(sink: K) -> Self {
        Self {
            sink,
            frames: Vec::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.sink.position()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    // ── Containers ──────────────────────────────────────────────

    pub fn write_start_document(&mut self) -> Result<(), CodecError> {
        self.open(None)
    }

    pub fn write_start_array(&mut self) -> Result<(), CodecError> {
        self.open(Some(0))
    }

    fn open(&mut self, next_index: Option<usize>) -> Result<(), CodecError> {
        let start = self.sink.position();
        self.sink.put(&[0; 4])?;
        self.frames.push(Frame { start, next_index });
        Ok(())
    }

    pub fn write_end_container(&mut self) -> Result<(), CodecError> {
        let frame = self
            .frames
            .pop()
            .ok_or(CodecError::InvalidState("no open container"))?;
        self.sink.put(&[0])?;
        let len = self.sink.position() - frame.start;
        let len = i32::try_from(len).map_err(|_| CodecError::TooLarge(len))?;
        self.sink.patch(frame.start, len.to_le_bytes());
        Ok(())
    }

    // ── Elements ────────────────────────────────────────────────

    /// Write an element header. Inside an array the name is ignored and
    /// the next positional index is used instead.
    pub fn write_key(&mut self, tag: ElementType, name: &str) -> Result<(), CodecError> {
        let frame = self
            .frames
            .last_mut()
            .ok_or(CodecError::InvalidState("key outside a container"))?;
        self.sink.put(&[tag as u8])?;
        match frame.next_index.as_mut() {
            Some(index) => {
                let key = index.to_string();
                *index += 1;
                self.sink.put(key.as_bytes())?;
            }
            None => {
                if name.as_bytes().contains(&0) {
                    return Err(CodecError::InvalidKey(name.to_string()));
                }
                self.sink.put(name.as_bytes())?;
            }
        }
        self.sink.put(&[0])
    }

    /// Bytes [`write_key`](Self::write_key) would emit for `name` in the
    /// current frame.
    pub fn key_len(&self, name: &str) -> usize {
        let key = match self.frames.last().and_then(|f| f.next_index) {
            Some(index) => index.checked_ilog10().unwrap_or(0) as usize + 1,
            None => name.len(),
        };
        key + 2
    }

    /// Copy an already-encoded value verbatim.
    pub fn copy_value<S: Source + ?Sized>(
        &mut self,
        src: &S,
        span: Range<usize>,
    ) -> Result<(), CodecError> {
        self.sink.put_from(src, span)
    }

    /// Encode a full element: header plus value.
    pub fn write_value(&mut self, name: &str, value: &Value) -> Result<(), CodecError> {
        self.write_key(value.element_type(), name)?;
        self.write_payload(value)
    }

    pub fn write_document(&mut self, doc: &Document) -> Result<(), CodecError> {
        self.write_start_document()?;
        for (key, value) in doc.iter() {
            self.write_value(key, value)?;
        }
        self.write_end_container()
    }

    fn write_payload(&mut self, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Double(v) => self.sink.put(&v.to_le_bytes()),
            Value::String(s) | Value::JavaScript(s) | Value::Symbol(s) => self.write_string(s),
            Value::Document(doc) => self.write_document(doc),
            Value::Array(items) => {
                self.write_start_array()?;
                for item in items {
                    self.write_value("", item)?;
                }
                self.write_end_container()
            }
            Value::Binary { subtype, bytes } => {
                self.write_len(bytes.len())?;
                self.sink.put(&[*subtype])?;
                self.sink.put(bytes)
            }
            Value::Undefined | Value::Null | Value::MinKey | Value::MaxKey => Ok(()),
            Value::ObjectId(oid) => self.sink.put(&oid.bytes()),
            Value::Boolean(b) => self.sink.put(&[u8::from(*b)]),
            Value::DateTime(dt) => self.sink.put(&dt.timestamp_millis().to_le_bytes()),
            Value::Regex { pattern, options } => {
                self.write_cstring(pattern)?;
                self.write_cstring(options)
            }
            Value::DbPointer { namespace, id } => {
                self.write_string(namespace)?;
                self.sink.put(&id.bytes())
            }
            Value::JavaScriptWithScope { code, scope } => {
                let start = self.sink.position();
                self.sink.put(&[0; 4])?;
                self.write_string(code)?;
                self.write_document(scope)?;
                let len = self.sink.position() - start;
                let len = i32::try_from(len).map_err(|_| CodecError::TooLarge(len))?;
                self.sink.patch(start, len.to_le_bytes());
                Ok(())
            }
            Value::Int32(v) => self.sink.put(&v.to_le_bytes()),
            Value::Timestamp(ts) => {
                self.sink.put(&ts.increment.to_le_bytes())?;
                self.sink.put(&ts.time.to_le_bytes())
            }
            Value::Int64(v) => self.sink.put(&v.to_le_bytes()),
            Value::Decimal128(d) => self.sink.put(&d.bytes()),
        }
    }

    fn write_len(&mut self, len: usize) -> Result<(), CodecError> {
        let len = i32::try_from(len).map_err(|_| CodecError::TooLarge(len))?;
        self.sink.put(&len.to_le_bytes())
    }

    fn write_string(&mut self, s: &str) -> Result<(), CodecError> {
        self.write_len(s.len() + 1)?;
        self.sink.put(s.as_bytes())?;
        self.sink.put(&[0])
    }

    fn write_cstring(&mut self, s: &str) -> Result<(), CodecError> {
        if s.as_bytes().contains(&0) {
            return Err(CodecError::InvalidKey(s.to_string()));
        }
        self.sink.put(s.as_bytes())?;
        self.sink.put(&[0])
    }

    // ── Mark / rewind ───────────────────────────────────────────

    pub fn mark(&self) -> Mark {
        Mark {
            position: self.sink.position(),
            depth: self.frames.len(),
            next_index: self.frames.last().and_then(|f| f.next_index),
        }
    }

    /// Discard everything written since `mark`, closing any containers
    /// opened after it and restoring the array counter.
    pub fn reset(&mut self, mark: Mark) -> Result<(), CodecError> {
        if self.frames.len() < mark.depth {
            return Err(CodecError::InvalidState("reset past a closed container"));
        }
        self.frames.truncate(mark.depth);
        if let Some(frame) = self.frames.last_mut() {
            frame.next_index = mark.next_index;
        }
        self.sink.truncate(mark.position);
        Ok(())
    }

    /// Speculative write scope: everything written through the guard is
    /// rolled back on drop unless [`MarkGuard::commit`] is called.
    pub fn guard(&mut self) -> MarkGuard<'_, K> {
        let mark = self.mark();
        MarkGuard {
            writer: self,
            mark,
            committed: false,
        }
    }
}

pub struct MarkGuard<'w, K: Sink> {
    writer: &'w mut Writer<K>,
    mark: Mark,
    committed: bool,
}

impl<K: Sink> MarkGuard<'_, K> {
    /// Keep the output written since the guard was taken.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl<K: Sink> Deref for MarkGuard<'_, K> {
    type Target = Writer<K>;

    fn deref(&self) -> &Writer<K> {
        self.writer
    }
}

impl<K: Sink> DerefMut for MarkGuard<'_, K> {
    fn deref_mut(&mut self) -> &mut Writer<K> {
        self.writer
    }
}

impl<K: Sink> Drop for MarkGuard<'_, K> {
    fn drop(&mut self) {
        if !self.committed {
            // Only fails if containers opened before the mark were closed
            // through the guard; nothing left to restore in that case.
            let _ = self.writer.reset(self.mark);
        }
    }
}
