use std::cell::Cell;
use std::ops::Range;

use crate::error::CodecError;
use crate::source::Source;

/// Append-only byte storage behind a [`Writer`](crate::Writer).
///
/// Truncation is how mark/rewind discards speculative output; `patch`
/// back-fills container lengths once a container closes.
pub trait Sink {
    /// True when the sink writes into the storage the reader is reading.
    /// The engine then checks that every write stays behind the read
    /// cursor.
    const ALIASES_INPUT: bool = false;

    fn position(&self) -> usize;

    /// Drop everything at or past `position`.
    fn truncate(&mut self, position: usize);

    fn put(&mut self, bytes: &[u8]) -> Result<(), CodecError>;

    /// Copy `span` of `src` to the end of the sink, byte for byte.
    fn put_from<S: Source + ?Sized>(&mut self, src: &S, span: Range<usize>)
    -> Result<(), CodecError>;

    /// Overwrite four already-written bytes at `at`.
    fn patch(&mut self, at: usize, bytes: [u8; 4]);
}

impl Sink for Vec<u8> {
    fn position(&self) -> usize {
        self.len()
    }

    fn truncate(&mut self, position: usize) {
        Vec::truncate(self, position);
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn put_from<S: Source + ?Sized>(
        &mut self,
        src: &S,
        span: Range<usize>,
    ) -> Result<(), CodecError> {
        src.append_to(span, self);
        Ok(())
    }

    fn patch(&mut self, at: usize, bytes: [u8; 4]) {
        self[at..at + 4].copy_from_slice(&bytes);
    }
}

/// Fixed-capacity sink over shared cells, used to write a projection back
/// into the buffer it is being read from.
///
/// Copies run front to back, so copying a span to an earlier offset of
/// the same storage is safe.
pub struct CellSink<'a> {
    cells: &'a [Cell<u8>],
    len: usize,
}

impl<'a> CellSink<'a> {
    pub fn new(cells: &'a [Cell<u8>]) -> Self {
        Self { cells, len: 0 }
    }

    fn reserve(&self, n: usize) -> Result<usize, CodecError> {
        let available = self.cells.len() - self.len;
        if n > available {
            return Err(CodecError::BufferFull { needed: n, available });
        }
        Ok(self.len)
    }
}

impl Sink for CellSink<'_> {
    const ALIASES_INPUT: bool = true;

    fn position(&self) -> usize {
        self.len
    }

    fn truncate(&mut self, position: usize) {
        self.len = self.len.min(position);
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let at = self.reserve(bytes.len())?;
        for (cell, &b) in self.cells[at..at + bytes.len()].iter().zip(bytes) {
            cell.set(b);
        }
        self.len += bytes.len();
        Ok(())
    }

    fn put_from<S: Source + ?Sized>(
        &mut self,
        src: &S,
        span: Range<usize>,
    ) -> Result<(), CodecError> {
        let n = span.len();
        let at = self.reserve(n)?;
        for (i, offset) in span.enumerate() {
            self.cells[at + i].set(src.byte_at(offset));
        }
        self.len += n;
        Ok(())
    }

    fn patch(&mut self, at: usize, bytes: [u8; 4]) {
        for (cell, b) in self.cells[at..at + 4].iter().zip(bytes) {
            cell.set(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_truncate_and_patch() {
        let mut sink: Vec<u8> = Vec::new();
        sink.put(&[0, 0, 0, 0, 7, 8]).unwrap();
        sink.patch(0, 6i32.to_le_bytes());
        assert_eq!(sink, vec![6, 0, 0, 0, 7, 8]);
        Sink::truncate(&mut sink, 4);
        assert_eq!(Sink::position(&sink), 4);
    }

    #[test]
    fn cell_sink_copies_toward_the_front() {
        let mut bytes = vec![0u8, 0, 1, 2, 3, 4];
        let cells = Cell::from_mut(bytes.as_mut_slice()).as_slice_of_cells();
        let mut sink = CellSink::new(cells);
        sink.put_from(cells, 2..6).unwrap();
        assert_eq!(sink.position(), 4);
        drop(sink);
        assert_eq!(&bytes[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn cell_sink_refuses_to_grow() {
        let mut bytes = vec![0u8; 3];
        let cells = Cell::from_mut(bytes.as_mut_slice()).as_slice_of_cells();
        let mut sink = CellSink::new(cells);
        sink.put(&[1, 2]).unwrap();
        let err = sink.put(&[3, 4]).unwrap_err();
        assert_eq!(err, CodecError::BufferFull { needed: 2, available: 1 });
    }

    #[test]
    fn cell_sink_truncate_never_extends() {
        let mut bytes = vec![0u8; 8];
        let cells = Cell::from_mut(bytes.as_mut_slice()).as_slice_of_cells();
        let mut sink = CellSink::new(cells);
        sink.put(&[1, 2, 3]).unwrap();
        sink.truncate(6);
        assert_eq!(sink.position(), 3);
        sink.truncate(1);
        assert_eq!(sink.position(), 1);
    }
}
