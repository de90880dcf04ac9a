use std::ops::Range;

/// Делит `num_rows` строк на непрерывные, почти равные части по потокам.
///
/// Каждой части достаётся `ceil(num_rows / num_threads)` строк, последней —
/// остаток. Пустые части не создаются.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPlanner {
    num_rows: usize,
    rows_per_thread: usize,
}

impl RowPlanner {
    pub fn new(
        num_rows: usize,
        num_threads: usize,
    ) -> Self {
        let num_threads = num_threads.max(1);

        Self {
            num_rows,
            rows_per_thread: num_rows.div_ceil(num_threads),
        }
    }

    /// Диапазон строк потока `thread` или `None`, если строк для него нет.
    pub fn thread_info(
        &self,
        thread: usize,
    ) -> Option<Range<usize>> {
        let start = thread.checked_mul(self.rows_per_thread)?;

        if start >= self.num_rows {
            return None;
        }

        Some(start..(start + self.rows_per_thread).min(self.num_rows))
    }

    /// Все непустые части по порядку.
    pub fn partitions(&self) -> Vec<Range<usize>> {
        (0..)
            .map_while(|thread| self.thread_info(thread))
            .collect()
    }
}

/// Количество потоков: 0 означает «по числу ядер хоста».
pub fn resolve_num_threads(num_threads: usize) -> usize {
    if num_threads != 0 {
        return num_threads;
    }

    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
