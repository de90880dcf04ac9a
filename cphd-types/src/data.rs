use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ChannelDescriptor, CphdError, CphdResult, SignalFormat, SupportArrayDescriptor};

/// Неизменяемая таблица раскладки данных, которую передаёт слой метаданных.
///
/// Разбор XML вне зоны ответственности движка: сюда приходят только
/// итоговые размеры каналов, support-массивов и PVP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDescriptor {
    /// Формат отсчётов блока сигнала
    pub signal_format: SignalFormat,
    /// Каналы в порядке следования в блоке сигнала
    pub channels: Vec<ChannelDescriptor>,
    /// Байт PVP на один вектор (кратно 8)
    pub num_bytes_pvp: usize,
    /// Идентификатор алгоритма сжатия (если блок сигнала сжат)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_compression_id: Option<String>,
    /// Support-массивы, упорядоченные по идентификатору
    #[serde(default)]
    pub support_arrays: BTreeMap<String, SupportArrayDescriptor>,
}

impl DataDescriptor {
    pub fn new(
        signal_format: SignalFormat,
        num_bytes_pvp: usize,
    ) -> Self {
        Self {
            signal_format,
            channels: Vec::new(),
            num_bytes_pvp,
            signal_compression_id: None,
            support_arrays: BTreeMap::new(),
        }
    }

    /// Добавляет канал (builder-стиль).
    pub fn with_channel(
        mut self,
        channel: ChannelDescriptor,
    ) -> Self {
        self.channels.push(channel);
        self
    }

    /// Добавляет support-массив (builder-стиль).
    pub fn with_support_array(
        mut self,
        array: SupportArrayDescriptor,
    ) -> Self {
        self.support_arrays.insert(array.id.clone(), array);
        self
    }

    /// Помечает блок сигнала как сжатый.
    pub fn with_compression<S: Into<String>>(
        mut self,
        id: S,
    ) -> Self {
        self.signal_compression_id = Some(id.into());
        self
    }

    pub fn from_json(s: &str) -> CphdResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json(&self) -> CphdResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn is_compressed(&self) -> bool {
        self.signal_compression_id.is_some()
    }

    pub fn num_bytes_per_sample(&self) -> usize {
        self.signal_format.bytes_per_sample()
    }

    /// Описание канала или ошибка границ.
    pub fn channel(
        &self,
        channel: usize,
    ) -> CphdResult<&ChannelDescriptor> {
        self.channels.get(channel).ok_or(CphdError::InvalidChannel {
            channel,
            num_channels: self.channels.len(),
        })
    }

    /// Размер сжатого канала, объявленный вызывающим (не проверяется).
    pub fn compressed_signal_size(
        &self,
        channel: usize,
    ) -> CphdResult<usize> {
        self.channel(channel)?.compressed_size.ok_or_else(|| {
            CphdError::layout(format!("channel {channel} has no compressed size"))
        })
    }

    /// Размер канала в блоке сигнала.
    pub fn channel_signal_size(
        &self,
        channel: usize,
    ) -> CphdResult<usize> {
        if self.is_compressed() {
            self.compressed_signal_size(channel)
        } else {
            Ok(self.channel(channel)?.area() * self.num_bytes_per_sample())
        }
    }

    /// Суммарный размер блока сигнала.
    pub fn signal_block_size(&self) -> CphdResult<usize> {
        (0..self.num_channels())
            .map(|ch| self.channel_signal_size(ch))
            .sum()
    }

    /// Размер PVP одного канала.
    pub fn pvp_channel_size(
        &self,
        channel: usize,
    ) -> CphdResult<usize> {
        Ok(self.channel(channel)?.num_vectors * self.num_bytes_pvp)
    }

    /// Суммарный размер PVP-блока.
    pub fn pvp_block_size(&self) -> usize {
        self.channels
            .iter()
            .map(|c| c.num_vectors * self.num_bytes_pvp)
            .sum()
    }

    /// Размер support-блока: конец самого дальнего массива.
    pub fn support_block_size(&self) -> usize {
        self.support_arrays
            .values()
            .map(SupportArrayDescriptor::end)
            .max()
            .unwrap_or(0)
    }

    pub fn support_array(
        &self,
        id: &str,
    ) -> CphdResult<&SupportArrayDescriptor> {
        self.support_arrays
            .get(id)
            .ok_or_else(|| CphdError::UnknownSupportArray(id.to_string()))
    }
}
