use cphd_types::CphdResult;
use serde::{Deserialize, Serialize};

/// Размер scratch-буфера записи по умолчанию (4 МиБ).
pub const DEFAULT_SCRATCH_SPACE_SIZE: usize = 4 * 1024 * 1024;

/// Настройки сессии записи.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Потоков для перестановки байт (0 = по числу CPU)
    pub num_threads: usize,
    /// Размер scratch-буфера little-endian записи (байт)
    pub scratch_space_size: usize,
    /// Гриф, пишется в заголовок файла
    pub classification: String,
    /// Условия распространения, пишутся в заголовок файла
    pub release_info: String,
}

/// Настройки чтения.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Потоков для перестановки и конвертации (0 = по числу CPU)
    pub num_threads: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl WriterConfig {
    /// Разбирает конфигурацию из JSON; отсутствующие поля берутся по умолчанию.
    pub fn from_json(s: &str) -> CphdResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn with_num_threads(
        mut self,
        num_threads: usize,
    ) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_scratch_space_size(
        mut self,
        size: usize,
    ) -> Self {
        self.scratch_space_size = size;
        self
    }
}

impl ReaderConfig {
    pub fn from_json(s: &str) -> CphdResult<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            scratch_space_size: DEFAULT_SCRATCH_SPACE_SIZE,
            classification: "UNCLASSIFIED".to_string(),
            release_info: "UNRESTRICTED".to_string(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
