//! Per-thread scratch memory for rasterizing one triangle at a time.

use std::cell::Cell;

use crate::prim3d::rows::RowInterval;

thread_local! {
    static ROW_BUFFER: Cell<Vec<RowInterval>> = const { Cell::new(Vec::new()) };
}

/// Runs `f` with `len` row intervals borrowed from this thread's scratch buffer.
///
/// The buffer is taken out for the duration of the call and put back afterwards, so a nested
/// call gets a fresh buffer instead of aliasing the outer one. It only grows, so steady state
/// rasterization does not allocate.
pub fn with_row_buffer<R>(len: usize, f: impl FnOnce(&mut [RowInterval]) -> R) -> R {
    ROW_BUFFER.with(|cell| {
        let mut buffer = cell.take();
        if buffer.len() < len {
            buffer.resize(len, RowInterval::EMPTY);
        }
        let result = f(&mut buffer[..len]);
        cell.set(buffer);
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_is_reused_and_nesting_is_safe() {
        let first = with_row_buffer(8, |rows| {
            rows[0] = RowInterval { left: 1, right: 2 };
            rows.as_ptr()
        });
        let second = with_row_buffer(4, |rows| {
            assert_eq!(rows.len(), 4);
            let inner = with_row_buffer(2, |inner| inner.as_ptr());
            assert_ne!(inner, rows.as_ptr());
            rows.as_ptr()
        });
        assert_eq!(first, second);
    }
}
