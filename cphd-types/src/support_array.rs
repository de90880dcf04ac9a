use serde::{Deserialize, Serialize};

/// Описание вспомогательного (support) массива.
///
/// `array_byte_offset` задаётся вызывающим относительно начала support-блока.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportArrayDescriptor {
    /// Уникальный идентификатор массива
    pub id: String,
    pub num_rows: usize,
    pub num_cols: usize,
    /// Размер одного элемента в байтах
    pub bytes_per_element: usize,
    /// Смещение массива внутри support-блока
    pub array_byte_offset: usize,
}

impl SupportArrayDescriptor {
    pub fn new<S: Into<String>>(
        id: S,
        num_rows: usize,
        num_cols: usize,
        bytes_per_element: usize,
        array_byte_offset: usize,
    ) -> Self {
        Self {
            id: id.into(),
            num_rows,
            num_cols,
            bytes_per_element,
            array_byte_offset,
        }
    }

    /// Количество элементов массива.
    pub fn num_elements(&self) -> usize {
        self.num_rows * self.num_cols
    }

    /// Размер массива в байтах.
    pub fn size(&self) -> usize {
        self.num_elements() * self.bytes_per_element
    }

    /// Конец массива (исключительно) относительно начала support-блока.
    pub fn end(&self) -> usize {
        self.array_byte_offset + self.size()
    }
}
