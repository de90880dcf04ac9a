use crate::{ChannelDescriptor, CphdError, CphdResult};

/// Размеры прямоугольной области: строки (векторы) × столбцы (отсчёты).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dims {
    pub rows: usize,
    pub cols: usize,
}

/// Запрос на чтение прямоугольной области канала.
///
/// Границы включительные; [`RegionRequest::ALL`] в `last_*` означает
/// «до последнего допустимого индекса».
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionRequest {
    pub channel: usize,
    pub first_vector: usize,
    pub last_vector: usize,
    pub first_sample: usize,
    pub last_sample: usize,
}

/// Запрос после проверки: все границы конкретные.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRegion {
    pub channel: usize,
    pub first_vector: usize,
    pub first_sample: usize,
    pub dims: Dims,
}

impl Dims {
    pub fn new(
        rows: usize,
        cols: usize,
    ) -> Self {
        Self { rows, cols }
    }

    /// Количество отсчётов в области.
    pub fn area(&self) -> usize {
        self.rows * self.cols
    }

    /// Линейный индекс отсчёта `(row, col)` в построчной раскладке.
    pub fn index(
        &self,
        row: usize,
        col: usize,
    ) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }
}

impl RegionRequest {
    /// Признак «до конца» для `last_vector` / `last_sample`.
    pub const ALL: usize = usize::MAX;

    pub fn new(
        channel: usize,
        first_vector: usize,
        last_vector: usize,
        first_sample: usize,
        last_sample: usize,
    ) -> Self {
        Self {
            channel,
            first_vector,
            last_vector,
            first_sample,
            last_sample,
        }
    }

    /// Весь канал целиком.
    pub fn whole_channel(channel: usize) -> Self {
        Self::new(channel, 0, Self::ALL, 0, Self::ALL)
    }

    /// Диапазон векторов на всю ширину канала.
    pub fn vectors(
        channel: usize,
        first_vector: usize,
        last_vector: usize,
    ) -> Self {
        Self::new(channel, first_vector, last_vector, 0, Self::ALL)
    }

    /// Проверяет запрос относительно описаний каналов и раскрывает `ALL`.
    pub fn resolve(
        &self,
        channels: &[ChannelDescriptor],
    ) -> CphdResult<ResolvedRegion> {
        let channel = channels
            .get(self.channel)
            .ok_or(CphdError::InvalidChannel {
                channel: self.channel,
                num_channels: channels.len(),
            })?;

        let (first_vector, last_vector) = resolve_range(
            "vectors",
            "first vector",
            "last vector",
            self.first_vector,
            self.last_vector,
            channel.num_vectors,
        )?;
        let (first_sample, last_sample) = resolve_range(
            "samples",
            "first sample",
            "last sample",
            self.first_sample,
            self.last_sample,
            channel.num_samples,
        )?;

        Ok(ResolvedRegion {
            channel: self.channel,
            first_vector,
            first_sample,
            dims: Dims::new(
                last_vector - first_vector + 1,
                last_sample - first_sample + 1,
            ),
        })
    }
}

fn resolve_range(
    what: &'static str,
    first_field: &'static str,
    last_field: &'static str,
    first: usize,
    last: usize,
    count: usize,
) -> CphdResult<(usize, usize)> {
    let max = count
        .checked_sub(1)
        .ok_or_else(|| CphdError::layout(format!("channel has no {what}")))?;

    if first > max {
        return Err(CphdError::InvalidIndex {
            field: first_field,
            index: first,
            max,
        });
    }

    let last = if last == RegionRequest::ALL { max } else { last };

    if last < first || last > max {
        return Err(CphdError::InvalidIndex {
            field: last_field,
            index: last,
            max,
        });
    }

    Ok((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> Vec<ChannelDescriptor> {
        vec![ChannelDescriptor::new(5, 10), ChannelDescriptor::new(3, 4)]
    }

    #[test]
    fn test_all_resolves_to_last_index() {
        let r = RegionRequest::new(0, 0, RegionRequest::ALL, 2, RegionRequest::ALL)
            .resolve(&channels())
            .unwrap();

        assert_eq!(r.dims, Dims::new(5, 8));
        assert_eq!(r.first_sample, 2);
    }

    #[test]
    fn test_first_vector_out_of_range() {
        let err = RegionRequest::vectors(0, 5, RegionRequest::ALL)
            .resolve(&channels())
            .unwrap_err();

        assert!(matches!(
            err,
            CphdError::InvalidIndex {
                field: "first vector",
                index: 5,
                max: 4
            }
        ));
    }

    #[test]
    fn test_last_before_first_rejected() {
        let err = RegionRequest::new(1, 2, 1, 0, 3)
            .resolve(&channels())
            .unwrap_err();
        assert!(matches!(err, CphdError::InvalidIndex { field: "last vector", .. }));

        let err = RegionRequest::new(1, 0, 2, 0, 4)
            .resolve(&channels())
            .unwrap_err();
        assert!(matches!(err, CphdError::InvalidIndex { field: "last sample", .. }));
    }

    #[test]
    fn test_sample_bounds_and_empty_channel() {
        let err = RegionRequest::new(0, 0, 1, 10, RegionRequest::ALL)
            .resolve(&channels())
            .unwrap_err();
        assert!(matches!(
            err,
            CphdError::InvalidIndex {
                field: "first sample",
                index: 10,
                max: 9
            }
        ));

        let err = RegionRequest::new(1, 0, 9, 0, 1)
            .resolve(&channels())
            .unwrap_err();
        assert!(matches!(err, CphdError::InvalidIndex { field: "last vector", index: 9, max: 2 }));

        let err = RegionRequest::whole_channel(0)
            .resolve(&[ChannelDescriptor::new(2, 0)])
            .unwrap_err();
        assert!(err.to_string().contains("channel has no samples"));
    }

    #[test]
    fn test_invalid_channel() {
        let err = RegionRequest::whole_channel(2)
            .resolve(&channels())
            .unwrap_err();

        assert!(matches!(
            err,
            CphdError::InvalidChannel {
                channel: 2,
                num_channels: 2
            }
        ));
    }

    #[test]
    fn test_dims_index() {
        let d = Dims::new(3, 4);
        assert_eq!(d.area(), 12);
        assert_eq!(d.index(2, 1), 9);
    }
}
