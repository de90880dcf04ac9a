use serde::{Deserialize, Serialize};

use crate::{CphdError, CphdResult};

/// Формат комплексных отсчётов в блоке сигнала
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalFormat {
    /// 8-битные целые компоненты (I8, Q8) — 2 байта на отсчёт
    CI2,
    /// 16-битные целые компоненты (I16, Q16) — 4 байта на отсчёт
    CI4,
    /// 32-битные float компоненты (F32, F32) — 8 байт на отсчёт
    CF8,
}

impl SignalFormat {
    /// Восстанавливает формат по размеру комплексного отсчёта.
    pub fn from_bytes_per_sample(n: usize) -> CphdResult<Self> {
        match n {
            2 => Ok(SignalFormat::CI2),
            4 => Ok(SignalFormat::CI4),
            8 => Ok(SignalFormat::CF8),
            _ => Err(CphdError::UnsupportedElementSize(n)),
        }
    }

    /// Размер одного комплексного отсчёта в байтах
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SignalFormat::CI2 => 2, // 1 байт I + 1 байт Q
            SignalFormat::CI4 => 4, // 2 байта I + 2 байта Q
            SignalFormat::CF8 => 8, // 4 байта I + 4 байта Q
        }
    }

    /// Размер одной компоненты (I или Q) в байтах
    pub fn bytes_per_component(&self) -> usize {
        self.bytes_per_sample() / 2
    }

    /// `true`, если отсчёты уже в представлении `Complex<f32>`.
    pub fn is_native_float(&self) -> bool {
        matches!(self, SignalFormat::CF8)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalFormat::CI2 => "CI2",
            SignalFormat::CI4 => "CI4",
            SignalFormat::CF8 => "CF8",
        }
    }
}

impl std::fmt::Display for SignalFormat {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SignalFormat {
    type Err = CphdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CI2" => Ok(SignalFormat::CI2),
            "CI4" => Ok(SignalFormat::CI4),
            "CF8" => Ok(SignalFormat::CF8),
            _ => Err(CphdError::UnknownSignalFormat(s.to_string())),
        }
    }
}
