use std::cell::Cell;

use sieve_codec::{CellSink, Reader, Sink, Source, Writer};
use sieve_query::{Filter, Projection};
use tracing::{debug, debug_span, trace};

use crate::config::ProjectorConfig;
use crate::error::EngineError;
use crate::walker::Walker;

/// Runs projection and filtering in one pass over a BSON document.
///
/// Holds no per-call state; one instance can serve any number of threads.
pub struct Projector {
    config: ProjectorConfig,
    passthrough: Projection,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new()
    }
}

impl Projector {
    pub fn new() -> Self {
        Self::with_config(ProjectorConfig::default())
    }

    pub fn with_config(config: ProjectorConfig) -> Self {
        Self {
            config,
            passthrough: Projection::passthrough(),
        }
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    /// Project `input` and evaluate `filter` against it.
    ///
    /// Returns `Ok(None)` when the filter rejects the document. Without a
    /// projection the document is copied unchanged; at least one of the
    /// two must be given.
    pub fn project(
        &self,
        input: &[u8],
        projection: Option<&Projection>,
        filter: Option<&Filter>,
    ) -> Result<Option<Vec<u8>>, EngineError> {
        let projection = self.resolve(projection, filter)?;
        let span = debug_span!(
            "project",
            mode = ?projection.mode(),
            input_len = input.len(),
            filtered = filter.is_some(),
        );
        let _enter = span.enter();

        let mut reader = Reader::new(input).with_max_depth(self.config.max_depth);
        let mut writer = Writer::with_capacity(self.config.capacity_for(input.len()));
        if !self.run(&mut reader, &mut writer, projection, filter)? {
            return Ok(None);
        }
        let out = writer.into_bytes();
        debug!(output_len = out.len(), "projected");
        Ok(Some(out))
    }

    /// Like [`project`](Self::project), but writes the result over `buf`.
    ///
    /// On accept `buf` holds the projected document and `true` is
    /// returned. On reject or error `buf` is cleared, since its prefix has
    /// already been overwritten.
    pub fn project_in_place(
        &self,
        buf: &mut Vec<u8>,
        projection: Option<&Projection>,
        filter: Option<&Filter>,
    ) -> Result<bool, EngineError> {
        let projection = self.resolve(projection, filter)?;
        let span = debug_span!(
            "project_in_place",
            mode = ?projection.mode(),
            input_len = buf.len(),
            filtered = filter.is_some(),
        );
        let _enter = span.enter();

        let outcome = {
            let cells = Cell::from_mut(buf.as_mut_slice()).as_slice_of_cells();
            let mut reader = Reader::new(cells).with_max_depth(self.config.max_depth);
            let mut writer = Writer::new(CellSink::new(cells));
            self.run(&mut reader, &mut writer, projection, filter)
                .map(|accepted| (accepted, writer.position()))
        };

        match outcome {
            Ok((true, len)) => {
                buf.truncate(len);
                debug!(output_len = len, "projected");
                Ok(true)
            }
            Ok((false, _)) => {
                buf.clear();
                Ok(false)
            }
            Err(e) => {
                buf.clear();
                Err(e)
            }
        }
    }

    fn resolve<'a>(
        &'a self,
        projection: Option<&'a Projection>,
        filter: Option<&Filter>,
    ) -> Result<&'a Projection, EngineError> {
        match (projection, filter) {
            (Some(projection), _) => Ok(projection),
            (None, Some(_)) => Ok(&self.passthrough),
            (None, None) => Err(EngineError::InvalidRequest(
                "either a projection or a filter is required",
            )),
        }
    }

    /// Walk one document and return the filter's verdict.
    fn run<S, K>(
        &self,
        reader: &mut Reader<'_, S>,
        writer: &mut Writer<K>,
        projection: &Projection,
        filter: Option<&Filter>,
    ) -> Result<bool, EngineError>
    where
        S: Source + ?Sized,
        K: Sink,
    {
        let mut walker = Walker::new(projection, filter);
        walker.walk(
            reader,
            writer,
            projection.index().root(),
            filter.map(|f| f.index().root()),
        )?;

        let trailing = reader.source().len() - reader.position();
        if trailing != 0 {
            return Err(EngineError::TrailingBytes(trailing));
        }

        let accepted = filter.is_none_or(|f| f.matches(walker.values()));
        if !accepted {
            trace!(collected = walker.values().len(), "rejected by filter");
        }
        debug!(rollbacks = walker.rollbacks(), accepted, "walk complete");
        Ok(accepted)
    }
}
