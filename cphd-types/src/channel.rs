use serde::{Deserialize, Serialize};

/// Описание одного канала сигнала.
///
/// Векторы — строки (импульсы), отсчёты — столбцы (элементы дальности).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// Количество векторов (строк)
    pub num_vectors: usize,
    /// Количество отсчётов в векторе (столбцов)
    pub num_samples: usize,
    /// Размер сжатого канала в байтах (только для сжатого блока сигнала)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<usize>,
}

impl ChannelDescriptor {
    pub fn new(
        num_vectors: usize,
        num_samples: usize,
    ) -> Self {
        Self {
            num_vectors,
            num_samples,
            compressed_size: None,
        }
    }

    /// Канал с заранее известным размером сжатых данных.
    pub fn compressed(
        num_vectors: usize,
        num_samples: usize,
        compressed_size: usize,
    ) -> Self {
        Self {
            num_vectors,
            num_samples,
            compressed_size: Some(compressed_size),
        }
    }

    /// Количество отсчётов во всём канале.
    pub fn area(&self) -> usize {
        self.num_vectors * self.num_samples
    }
}
