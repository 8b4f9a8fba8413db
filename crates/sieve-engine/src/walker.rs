use std::fmt::Write as _;

use sieve_codec::{ElementType, Reader, Sink, Source, Writer, is_container};
use sieve_query::{Filter, Mode, PathNode, Projection, ValueMap};
use tracing::{trace, warn};

use crate::error::EngineError;

/// Outcome of piping one container.
#[derive(Default)]
struct Visit {
    /// At least one member reached the output.
    wrote: bool,
    /// Members read from the input.
    seen: usize,
}

/// One projection pass.
///
/// The projection trie and the filter trie are descended in lockstep with
/// the document. Per-call state lives here so the specs themselves stay
/// immutable and shareable.
pub(crate) struct Walker {
    mode: Mode,
    /// Projection nodes already satisfied, by node id.
    projected: Vec<bool>,
    /// Filter nodes already materialized, by node id.
    extracted: Vec<bool>,
    values: ValueMap,
    rollbacks: usize,
}

impl Walker {
    pub(crate) fn new(projection: &Projection, filter: Option<&Filter>) -> Self {
        Self {
            mode: projection.mode(),
            projected: vec![false; projection.index().len()],
            extracted: vec![false; filter.map_or(0, |f| f.index().len())],
            values: ValueMap::new(),
            rollbacks: 0,
        }
    }

    pub(crate) fn values(&self) -> &ValueMap {
        &self.values
    }

    pub(crate) fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    /// Pipe the root document. It is always emitted, possibly empty.
    pub(crate) fn walk<S, K>(
        &mut self,
        reader: &mut Reader<'_, S>,
        writer: &mut Writer<K>,
        projection: &PathNode,
        filter: Option<&PathNode>,
    ) -> Result<(), EngineError>
    where
        S: Source + ?Sized,
        K: Sink,
    {
        self.pipe_container(
            reader,
            writer,
            ElementType::EmbeddedDocument,
            Some(projection),
            filter,
            false,
        )?;
        Ok(())
    }

    /// Pipe a document or array whose length header is under the reader.
    ///
    /// `permitted` means an ancestor was kept whole: every member is
    /// written and the projection is no longer consulted.
    fn pipe_container<S, K>(
        &mut self,
        reader: &mut Reader<'_, S>,
        writer: &mut Writer<K>,
        tag: ElementType,
        projection: Option<&PathNode>,
        filter: Option<&PathNode>,
        permitted: bool,
    ) -> Result<Visit, EngineError>
    where
        S: Source + ?Sized,
        K: Sink,
    {
        reader.read_start_container()?;
        room(reader, writer, 4)?;
        if tag == ElementType::Array {
            writer.write_start_array()?;
        } else {
            writer.write_start_document()?;
        }

        let mut visit = Visit::default();
        let mut position = (tag == ElementType::Array).then_some(0);
        let mut key = String::new();
        while let Some(tag) = reader.read_element()? {
            visit.seen += 1;
            let segment = segment(&mut key, &mut position, reader.name());
            let child = projection.and_then(|n| n.child(segment));
            let wanted = filter.and_then(|n| n.child(segment));
            if let Some(node) = wanted {
                self.extract(reader, tag, node)?;
            }
            let scan = wanted.filter(|n| n.has_children() && is_container(tag));
            visit.wrote |= self.pipe_element(reader, writer, tag, child, scan, permitted)?;
        }

        reader.read_end_container()?;
        room(reader, writer, 1)?;
        writer.write_end_container()?;
        Ok(visit)
    }

    /// Decide the fate of one element. Returns whether it was written.
    fn pipe_element<S, K>(
        &mut self,
        reader: &mut Reader<'_, S>,
        writer: &mut Writer<K>,
        tag: ElementType,
        projection: Option<&PathNode>,
        scan: Option<&PathNode>,
        permitted: bool,
    ) -> Result<bool, EngineError>
    where
        S: Source + ?Sized,
        K: Sink,
    {
        if permitted {
            self.copy(reader, writer, tag, scan)?;
            return Ok(true);
        }

        let exact = projection.filter(|n| n.is_terminal() && !self.projected[n.id()]);
        let prefix = projection.filter(|n| n.has_children() && is_container(tag));

        match (self.mode, exact, prefix) {
            (Mode::Inclusive, Some(node), _) => {
                self.projected[node.id()] = true;
                self.copy(reader, writer, tag, scan)?;
                Ok(true)
            }
            (Mode::Exclusive, Some(node), _) => {
                self.projected[node.id()] = true;
                self.skip(reader, tag, scan)?;
                Ok(false)
            }
            (_, None, Some(node)) => self.descend(reader, writer, tag, node, scan),
            (Mode::Inclusive, None, None) => {
                self.skip(reader, tag, scan)?;
                Ok(false)
            }
            (Mode::Exclusive, None, None) => {
                self.copy(reader, writer, tag, scan)?;
                Ok(true)
            }
        }
    }

    /// Write the key under a mark and recurse; roll the key back when the
    /// container comes out empty of anything worth keeping.
    fn descend<S, K>(
        &mut self,
        reader: &mut Reader<'_, S>,
        writer: &mut Writer<K>,
        tag: ElementType,
        projection: &PathNode,
        scan: Option<&PathNode>,
    ) -> Result<bool, EngineError>
    where
        S: Source + ?Sized,
        K: Sink,
    {
        let mut guard = writer.guard();
        room(reader, &*guard, guard.key_len(reader.name()))?;
        guard.write_key(tag, reader.name())?;
        let visit = self.pipe_container(reader, &mut *guard, tag, Some(projection), scan, false)?;

        // Exclusive mode keeps a container that was empty to begin with.
        let keep = match self.mode {
            Mode::Inclusive => visit.wrote,
            Mode::Exclusive => visit.wrote || visit.seen == 0,
        };
        if keep {
            guard.commit();
        } else {
            self.rollbacks += 1;
            trace!(path = projection.path(), "rolled back emptied container");
        }
        Ok(keep)
    }

    /// Write the element whole. Filter paths beneath it are still
    /// collected on the way through.
    fn copy<S, K>(
        &mut self,
        reader: &mut Reader<'_, S>,
        writer: &mut Writer<K>,
        tag: ElementType,
        scan: Option<&PathNode>,
    ) -> Result<(), EngineError>
    where
        S: Source + ?Sized,
        K: Sink,
    {
        room(reader, writer, writer.key_len(reader.name()))?;
        writer.write_key(tag, reader.name())?;
        match scan {
            Some(filter) => {
                self.pipe_container(reader, writer, tag, None, Some(filter), true)?;
            }
            None => {
                let span = reader.skip_value(tag)?;
                room(reader, writer, span.len())?;
                writer.copy_value(reader.source(), span)?;
            }
        }
        Ok(())
    }

    fn skip<S>(
        &mut self,
        reader: &mut Reader<'_, S>,
        tag: ElementType,
        scan: Option<&PathNode>,
    ) -> Result<(), EngineError>
    where
        S: Source + ?Sized,
    {
        match scan {
            Some(filter) => self.scan(reader, tag, filter),
            None => {
                reader.skip_value(tag)?;
                Ok(())
            }
        }
    }

    /// Read-only pass over a dropped container, collecting filter values.
    fn scan<S>(
        &mut self,
        reader: &mut Reader<'_, S>,
        tag: ElementType,
        filter: &PathNode,
    ) -> Result<(), EngineError>
    where
        S: Source + ?Sized,
    {
        reader.read_start_container()?;
        let mut position = (tag == ElementType::Array).then_some(0);
        let mut key = String::new();
        while let Some(tag) = reader.read_element()? {
            match filter.child(segment(&mut key, &mut position, reader.name())) {
                Some(node) => {
                    self.extract(reader, tag, node)?;
                    if node.has_children() && is_container(tag) {
                        self.scan(reader, tag, node)?;
                    } else {
                        reader.skip_value(tag)?;
                    }
                }
                None => {
                    reader.skip_value(tag)?;
                }
            }
        }
        reader.read_end_container()?;
        Ok(())
    }

    /// Materialize the value under the reader for a filter path, then
    /// rewind so the walk sees it again. The first occurrence wins.
    fn extract<S>(
        &mut self,
        reader: &mut Reader<'_, S>,
        tag: ElementType,
        node: &PathNode,
    ) -> Result<(), EngineError>
    where
        S: Source + ?Sized,
    {
        if !node.is_terminal() || self.extracted[node.id()] {
            return Ok(());
        }
        self.extracted[node.id()] = true;
        let start = reader.position();
        let value = reader.read_value(tag)?;
        reader.reset(start);
        self.values.insert(node.path().to_string(), value);
        Ok(())
    }
}

/// Trie segment for the element under the reader. Array members are
/// matched by position, whatever key they were stored under.
fn segment<'k>(key: &'k mut String, position: &mut Option<usize>, name: &'k str) -> &'k str {
    match position {
        Some(index) => {
            key.clear();
            let _ = write!(key, "{index}");
            *index += 1;
            key
        }
        None => name,
    }
}

/// When the output aliases the input, a write of `n` bytes must end at or
/// before the read cursor.
fn room<S, K>(reader: &Reader<'_, S>, writer: &Writer<K>, n: usize) -> Result<(), EngineError>
where
    S: Source + ?Sized,
    K: Sink,
{
    if K::ALIASES_INPUT && writer.position() + n > reader.position() {
        let (write, read) = (writer.position(), reader.position());
        warn!(write, read, needed = n, "in-place write would overtake the read cursor");
        return Err(EngineError::InPlaceOverrun { write, read });
    }
    Ok(())
}
