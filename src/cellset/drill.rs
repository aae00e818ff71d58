//! Drill-through row cursor.
//!
//! A [`RowCursor`] owns the exclusive row stream behind one cell and walks
//! Open, then Iterating, then Exhausted, with no way back. The underlying
//! stream is closed exactly once, whether the consumer drains every row,
//! hits an error, calls [`RowCursor::close`], or just drops the cursor.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::cellset::{ColumnMeta, RowStream};
use crate::query::value::CellValue;
use crate::types::Result;

/// Single-consumer cursor over the disaggregated rows behind one cell.
///
/// A cell without drill-through support produces a cursor that is born
/// exhausted: `fetch()` returns `None` and `rows()` is empty.
pub struct RowCursor {
    stream: Option<Box<dyn RowStream>>,
    columns: Option<Arc<Vec<ColumnMeta>>>,
}

impl fmt::Debug for RowCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowCursor")
            .field("has_stream", &self.stream.is_some())
            .finish_non_exhaustive()
    }
}

impl RowCursor {
    pub(crate) fn new(stream: Option<Box<dyn RowStream>>) -> Self {
        Self {
            stream,
            columns: None,
        }
    }

    /// Pulls the next row, or `None` once the stream is drained. After the
    /// first `None` the stream is released; further calls keep returning
    /// `None` without reopening anything.
    pub fn fetch(&mut self) -> Result<Option<Vec<CellValue>>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        match stream.try_next() {
            Ok(Some(row)) => Ok(Some(row)),
            Ok(None) => {
                self.release();
                Ok(None)
            }
            Err(err) => {
                self.release();
                Err(err)
            }
        }
    }

    /// Drains every remaining row through repeated [`fetch`](Self::fetch).
    pub fn rows(&mut self) -> Result<Vec<Vec<CellValue>>> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Column metadata, read lazily from the stream and cached. Metadata is
    /// snapshotted before the stream closes, so it keeps answering after
    /// exhaustion; a cursor born exhausted reports no columns.
    pub fn columns(&mut self) -> Result<Arc<Vec<ColumnMeta>>> {
        if let Some(cached) = &self.columns {
            return Ok(Arc::clone(cached));
        }
        let meta = match self.stream.as_ref() {
            Some(stream) => stream.column_metadata()?,
            None => Vec::new(),
        };
        let meta = Arc::new(meta);
        self.columns = Some(Arc::clone(&meta));
        Ok(meta)
    }

    /// True once the underlying stream has been released.
    pub fn is_exhausted(&self) -> bool {
        self.stream.is_none()
    }

    /// Abandons iteration and releases the stream now, propagating any
    /// close failure. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        self.snapshot_columns(stream.as_ref());
        stream.close()
    }

    fn release(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        self.snapshot_columns(stream.as_ref());
        if let Err(err) = stream.close() {
            // Release is best-effort on implicit paths; the failure is
            // reported through the log stream only.
            warn!(error = %err, "cellset.drill.close_failed");
        }
    }

    fn snapshot_columns(&mut self, stream: &dyn RowStream) {
        if self.columns.is_none() {
            if let Ok(meta) = stream.column_metadata() {
                self.columns = Some(Arc::new(meta));
            }
        }
    }
}

impl Drop for RowCursor {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AxialError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStream {
        rows: Vec<Vec<CellValue>>,
        cursor: usize,
        closes: Arc<AtomicUsize>,
        fail_close: bool,
    }

    impl RowStream for CountingStream {
        fn try_next(&mut self) -> Result<Option<Vec<CellValue>>> {
            let row = self.rows.get(self.cursor).cloned();
            self.cursor += 1;
            Ok(row)
        }

        fn column_metadata(&self) -> Result<Vec<ColumnMeta>> {
            Ok(vec![ColumnMeta {
                name: "id".into(),
                label: "id".into(),
                table: Some("sales_fact".into()),
                column_type: "INTEGER".into(),
            }])
        }

        fn close(&mut self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(AxialError::Resource("stream already gone".into()));
            }
            Ok(())
        }
    }

    fn cursor_with_rows(rows: usize, closes: &Arc<AtomicUsize>) -> RowCursor {
        RowCursor::new(Some(Box::new(CountingStream {
            rows: (0..rows).map(|i| vec![CellValue::Int(i as i64)]).collect(),
            cursor: 0,
            closes: Arc::clone(closes),
            fail_close: false,
        })))
    }

    #[test]
    fn exhaustion_is_idempotent_and_closes_once() -> Result<()> {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut cursor = cursor_with_rows(2, &closes);
        assert!(cursor.fetch()?.is_some());
        assert!(cursor.fetch()?.is_some());
        assert!(cursor.fetch()?.is_none());
        assert!(cursor.fetch()?.is_none());
        assert!(cursor.is_exhausted());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        drop(cursor);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn abandoned_cursor_closes_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        let cursor = cursor_with_rows(5, &closes);
        drop(cursor);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn columns_survive_exhaustion() -> Result<()> {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut cursor = cursor_with_rows(1, &closes);
        assert_eq!(cursor.rows()?.len(), 1);
        let columns = cursor.columns()?;
        assert_eq!(columns[0].table.as_deref(), Some("sales_fact"));
        Ok(())
    }

    #[test]
    fn failing_close_is_swallowed_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        let cursor = RowCursor::new(Some(Box::new(CountingStream {
            rows: Vec::new(),
            cursor: 0,
            closes: Arc::clone(&closes),
            fail_close: true,
        })));
        drop(cursor);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_close_propagates_failure() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut cursor = RowCursor::new(Some(Box::new(CountingStream {
            rows: Vec::new(),
            cursor: 0,
            closes: Arc::clone(&closes),
            fail_close: true,
        })));
        let err = cursor.close().unwrap_err();
        assert_eq!(err.code(), "Resource");
        assert!(cursor.is_exhausted());
        assert!(cursor.close().is_ok());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn born_exhausted_cursor_yields_nothing() -> Result<()> {
        let mut cursor = RowCursor::new(None);
        assert!(cursor.fetch()?.is_none());
        assert!(cursor.rows()?.is_empty());
        assert!(cursor.columns()?.is_empty());
        Ok(())
    }
}
