use std::cell::Cell;
use std::ops::Range;

/// Byte storage a [`Reader`](crate::Reader) can walk.
///
/// Implemented for plain `[u8]` and for `[Cell<u8>]`, the latter being the
/// view used when the output is written into the same buffer the input is
/// read from. Callers bounds-check offsets before calling in.
pub trait Source {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn byte_at(&self, offset: usize) -> u8;

    /// Append `span` to `out`.
    fn append_to(&self, span: Range<usize>, out: &mut Vec<u8>);

    /// Offset of the first nul byte in `from..to`.
    fn find_nul(&self, from: usize, to: usize) -> Option<usize> {
        (from..to).find(|&i| self.byte_at(i) == 0)
    }

    fn read_array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut out = [0u8; N];
        for (i, b) in out.iter_mut().enumerate() {
            *b = self.byte_at(offset + i);
        }
        out
    }
}

impl Source for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    #[inline]
    fn byte_at(&self, offset: usize) -> u8 {
        self[offset]
    }

    fn append_to(&self, span: Range<usize>, out: &mut Vec<u8>) {
        out.extend_from_slice(&self[span]);
    }

    fn find_nul(&self, from: usize, to: usize) -> Option<usize> {
        self[from..to].iter().position(|&b| b == 0).map(|i| from + i)
    }

    fn read_array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self[offset..offset + N]);
        out
    }
}

impl Source for [Cell<u8>] {
    fn len(&self) -> usize {
        <[Cell<u8>]>::len(self)
    }

    #[inline]
    fn byte_at(&self, offset: usize) -> u8 {
        self[offset].get()
    }

    fn append_to(&self, span: Range<usize>, out: &mut Vec<u8>) {
        out.extend(self[span].iter().map(Cell::get));
    }
}
