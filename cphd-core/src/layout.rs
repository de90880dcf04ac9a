//! Расчёт байтовых смещений каналов и support-массивов.
//!
//! Единственный источник истины для всех смещений: читатель и писатель
//! получают их только отсюда. Функции чистые, без ввода/вывода.

use cphd_types::{
    ChannelDescriptor, CphdError, CphdResult, DataDescriptor, SupportArrayDescriptor,
};

/// Раскладка каналов внутри блока сигнала.
#[derive(Debug, Clone)]
pub struct FileLayout {
    channels: Vec<ChannelDescriptor>,
    offsets: Vec<u64>,
    element_size: usize,
    compressed: bool,
    base: u64,
    size: u64,
}

/// Вычисляет абсолютные смещения начала каждого канала.
///
/// Для несжатых данных шаг равен `num_vectors * num_samples * element_size`
/// предыдущего канала. Для сжатых используется `compressed_size`, который
/// передаёт вызывающий и который здесь не перепроверяется.
pub fn compute_offsets(
    channels: &[ChannelDescriptor],
    base_offset: u64,
    element_size: usize,
    compressed: bool,
) -> CphdResult<Vec<u64>> {
    let mut offsets = Vec::with_capacity(channels.len());
    let mut next = base_offset;

    for (ii, channel) in channels.iter().enumerate() {
        offsets.push(next);
        next += channel_byte_size(ii, channel, element_size, compressed)?;
    }

    Ok(offsets)
}

/// Абсолютное смещение support-массива: база блока + его собственное смещение.
pub fn support_array_offset(
    block_base: u64,
    array: &SupportArrayDescriptor,
) -> u64 {
    block_base + array.array_byte_offset as u64
}

/// Проверяет, что массивы не перекрываются и не выходят за `block_size`.
pub fn validate_support_arrays<'a, I>(
    arrays: I,
    block_size: usize,
) -> CphdResult<()>
where
    I: IntoIterator<Item = &'a SupportArrayDescriptor>,
{
    let mut ranges: Vec<(usize, usize, &str)> = arrays
        .into_iter()
        .map(|a| (a.array_byte_offset, a.end(), a.id.as_str()))
        .collect();

    ranges.sort_unstable();

    for &(start, end, id) in &ranges {
        if end > block_size {
            return Err(CphdError::layout(format!(
                "support array '{id}' [{start}..{end}) exceeds support block size {block_size}"
            )));
        }
    }

    // Пустые массивы ничего не занимают и не должны разрывать соседние пары
    ranges.retain(|&(start, end, _)| start != end);

    for pair in ranges.windows(2) {
        let (a_start, a_end, a_id) = pair[0];
        let (b_start, b_end, b_id) = pair[1];

        if b_start < a_end {
            return Err(CphdError::layout(format!(
                "support arrays '{a_id}' [{a_start}..{a_end}) and '{b_id}' [{b_start}..{b_end}) overlap"
            )));
        }
    }

    Ok(())
}

fn channel_byte_size(
    index: usize,
    channel: &ChannelDescriptor,
    element_size: usize,
    compressed: bool,
) -> CphdResult<u64> {
    if compressed {
        channel.compressed_size.map(|s| s as u64).ok_or_else(|| {
            CphdError::layout(format!("channel {index} has no compressed size"))
        })
    } else {
        Ok((channel.area() * element_size) as u64)
    }
}

impl FileLayout {
    /// Строит раскладку блока сигнала, начинающегося с `base`.
    ///
    /// `size == 0` отключает проверку на выход за пределы блока.
    pub fn new(
        data: &DataDescriptor,
        base: u64,
        size: u64,
    ) -> CphdResult<Self> {
        let element_size = data.num_bytes_per_sample();
        let compressed = data.is_compressed();
        let offsets = compute_offsets(&data.channels, base, element_size, compressed)?;

        let layout = Self {
            channels: data.channels.clone(),
            offsets,
            element_size,
            compressed,
            base,
            size,
        };

        let end = layout.end()?;
        if size != 0 && end > base + size {
            return Err(CphdError::layout(format!(
                "channels end at byte {end}, past signal block end {}",
                base + size
            )));
        }

        Ok(layout)
    }

    pub fn num_channels(&self) -> usize {
        self.offsets.len()
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Начало блока сигнала.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Объявленный размер блока сигнала (0 — не задан).
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Все смещения каналов по порядку.
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Смещение начала канала.
    pub fn channel_offset(
        &self,
        channel: usize,
    ) -> CphdResult<u64> {
        self.offsets
            .get(channel)
            .copied()
            .ok_or(CphdError::InvalidChannel {
                channel,
                num_channels: self.offsets.len(),
            })
    }

    /// Размер канала в байтах.
    pub fn channel_size(
        &self,
        channel: usize,
    ) -> CphdResult<u64> {
        let desc = self.descriptor(channel)?;
        channel_byte_size(channel, desc, self.element_size, self.compressed)
    }

    /// Смещение отсчёта `(vector, sample)` канала `channel`.
    pub fn sample_offset(
        &self,
        channel: usize,
        vector: usize,
        sample: usize,
    ) -> CphdResult<u64> {
        let desc = self.descriptor(channel)?;

        if vector >= desc.num_vectors {
            return Err(CphdError::InvalidIndex {
                field: "vector",
                index: vector,
                max: desc.num_vectors.saturating_sub(1),
            });
        }

        if sample >= desc.num_samples {
            return Err(CphdError::InvalidIndex {
                field: "sample",
                index: sample,
                max: desc.num_samples.saturating_sub(1),
            });
        }

        let bytes_per_vector = (desc.num_samples * self.element_size) as u64;

        Ok(self.offsets[channel]
            + bytes_per_vector * vector as u64
            + (sample * self.element_size) as u64)
    }

    /// Конец последнего канала (исключительно).
    pub fn end(&self) -> CphdResult<u64> {
        match self.offsets.len() {
            0 => Ok(self.base),
            n => Ok(self.offsets[n - 1] + self.channel_size(n - 1)?),
        }
    }

    fn descriptor(
        &self,
        channel: usize,
    ) -> CphdResult<&ChannelDescriptor> {
        self.channels.get(channel).ok_or(CphdError::InvalidChannel {
            channel,
            num_channels: self.channels.len(),
        })
    }
}
