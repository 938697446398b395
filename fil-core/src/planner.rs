use fil_types::{ChunkWindow, FilError, FilResult};

/// Спектров в одном окне по умолчанию (4096 × 24).
pub const DEFAULT_CHUNK_SPECTRA: u64 = 4096 * 24;

/// План чтения: последовательность окон, покрывающая `[start, total)` ровно
/// один раз. Вычисляется заново из трёх чисел, скрытого состояния нет.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total: u64,
    chunk: u64,
    start: u64,
}

/// Ленивый итератор окон [`ChunkPlan`].
#[derive(Debug, Clone)]
pub struct ChunkWindows {
    next: u64,
    end: u64,
    chunk: u64,
}

impl ChunkPlan {
    pub fn new(
        total: u64,
        chunk: u64,
    ) -> FilResult<Self> {
        if chunk == 0 {
            return Err(FilError::format_violation("chunk size must be > 0"));
        }

        Ok(Self {
            total,
            chunk,
            start: 0,
        })
    }

    /// План для оставшейся части после `done` уже записанных спектров.
    pub fn resume_from(
        self,
        done: u64,
    ) -> FilResult<Self> {
        if done > self.total {
            return Err(FilError::OutOfRange {
                start: done,
                len: 0,
                total: self.total,
            });
        }

        Ok(Self {
            start: done,
            ..self
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// `ceil((total - start) / chunk)`.
    pub fn window_count(&self) -> u64 {
        (self.total - self.start).div_ceil(self.chunk)
    }

    pub fn windows(&self) -> ChunkWindows {
        ChunkWindows {
            next: self.start,
            end: self.total,
            chunk: self.chunk,
        }
    }
}

impl IntoIterator for &ChunkPlan {
    type Item = ChunkWindow;
    type IntoIter = ChunkWindows;

    fn into_iter(self) -> Self::IntoIter {
        self.windows()
    }
}

impl Iterator for ChunkWindows {
    type Item = ChunkWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }

        let len = self.chunk.min(self.end - self.next);
        let window = ChunkWindow::new(self.next, len);
        self.next += len;

        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.end.saturating_sub(self.next)).div_ceil(self.chunk) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChunkWindows {}
