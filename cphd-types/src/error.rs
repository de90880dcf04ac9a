use thiserror::Error;

/// Результат для операций движка CPHD.
pub type CphdResult<T> = std::result::Result<T, CphdError>;

/// Типы ошибок чтения/записи широкополосных данных.
#[derive(Debug, Error)]
pub enum CphdError {
    /// Номер канала вне диапазона
    #[error("Invalid channel {channel}: file has {num_channels} channel(s)")]
    InvalidChannel { channel: usize, num_channels: usize },

    /// Индекс вектора/отсчёта вне диапазона или неверный порядок границ
    #[error("Invalid {field} {index}: valid range is 0..={max}")]
    InvalidIndex {
        field: &'static str,
        index: usize,
        max: usize,
    },

    /// Буфер назначения или scratch-буфер меньше необходимого
    #[error("Need at least {needed} bytes but only got {got}")]
    BufferTooSmall { needed: usize, got: usize },

    /// Количество масштабных коэффициентов не совпадает с числом строк
    #[error("Expected {expected} vector scale factors but got {found}")]
    ScaleFactorCount { expected: usize, found: usize },

    /// Неизвестный идентификатор support-массива
    #[error("Unknown support array: {0}")]
    UnknownSupportArray(String),

    /// Запись выходит за пределы блока сигнала
    #[error("Signal block overflow: {requested} bytes requested, {remaining} remaining")]
    SignalOverflow { requested: u64, remaining: u64 },

    /// Размер типа вызывающего не совпадает с размером элемента формата
    #[error("Incorrect buffer data type: element is {found} bytes, format expects {expected}")]
    ElementSizeMismatch { expected: usize, found: usize },

    /// Размер элемента вне {2, 4, 8}
    #[error("Unexpected element size {0}")]
    UnsupportedElementSize(usize),

    /// Неизвестное имя формата сигнала
    #[error("Unknown signal format: {0}")]
    UnknownSignalFormat(String),

    /// Операция писателя вызвана вне очереди или после закрытия
    #[error("Cannot {operation} in writer state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// Операция для несжатых данных вызвана на сжатом блоке
    #[error("Signal block is compressed: {0}")]
    Compressed(&'static str),

    /// Операция для сжатых данных вызвана на несжатом блоке
    #[error("Signal block is not compressed: {0}")]
    NotCompressed(&'static str),

    /// Нарушение раскладки блоков (перекрытие, выход за границы)
    #[error("Layout violation: {0}")]
    LayoutViolation(String),

    /// Повреждённый или некорректный заголовок файла
    #[error("Invalid file header: {0}")]
    InvalidHeader(String),

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибки разбора JSON-описаний
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CphdError {
    /// Удобные конструкторы
    pub fn layout<S: Into<String>>(s: S) -> Self {
        Self::LayoutViolation(s.into())
    }

    pub fn header<S: Into<String>>(s: S) -> Self {
        Self::InvalidHeader(s.into())
    }

    pub fn invalid_state<S: ToString>(
        operation: &'static str,
        state: S,
    ) -> Self {
        Self::InvalidState {
            operation,
            state: state.to_string(),
        }
    }

    /// Проверяет, что буфер вмещает `needed` байт.
    pub fn check_buffer(
        needed: usize,
        got: usize,
    ) -> CphdResult<()> {
        if got < needed {
            return Err(Self::BufferTooSmall { needed, got });
        }

        Ok(())
    }
}
