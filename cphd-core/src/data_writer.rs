//! Запись отсчётов в поток в big-endian порядке.
//!
//! На big-endian хосте данные пишутся как есть. На little-endian хосте
//! данные копируются порциями в scratch-буфер, там переставляются и только
//! потом уходят в поток: исходный буфер вызывающего не меняется.

use std::io::Write;

use cphd_types::{CphdError, CphdResult};
use log::debug;

use crate::byte_swap::{byte_swap, is_big_endian_system, is_swappable};
use crate::planner::resolve_num_threads;

/// Минимальный размер scratch-буфера: один элемент максимальной ширины.
pub const MIN_SCRATCH_SIZE: usize = 8;

/// Стратегия записи, выбираемая по порядку байт хоста.
#[derive(Debug)]
pub enum DataWriter {
    /// Порядок хоста совпадает с файловым: прямая запись.
    BigEndian,
    /// Перестановка через scratch-буфер.
    LittleEndian {
        scratch: Vec<u8>,
        num_threads: usize,
    },
}

impl DataWriter {
    /// Выбирает стратегию для текущего хоста.
    pub fn for_host(
        num_threads: usize,
        scratch_size: usize,
    ) -> CphdResult<Self> {
        if is_big_endian_system() {
            Ok(Self::big_endian())
        } else {
            Self::little_endian(num_threads, scratch_size)
        }
    }

    pub fn big_endian() -> Self {
        Self::BigEndian
    }

    pub fn little_endian(
        num_threads: usize,
        scratch_size: usize,
    ) -> CphdResult<Self> {
        CphdError::check_buffer(MIN_SCRATCH_SIZE, scratch_size)?;

        Ok(Self::LittleEndian {
            scratch: vec![0u8; scratch_size],
            num_threads: resolve_num_threads(num_threads),
        })
    }

    /// `true`, если запись идёт через перестановку байт.
    pub fn swaps(&self) -> bool {
        matches!(self, Self::LittleEndian { .. })
    }

    /// Пишет `num_elements` элементов по `element_size` байт.
    ///
    /// Элементы ширины, отличной от 2/4/8, пишутся без изменений.
    pub fn write<W: Write>(
        &mut self,
        out: &mut W,
        data: &[u8],
        num_elements: usize,
        element_size: usize,
    ) -> CphdResult<()> {
        let total = num_elements
            .checked_mul(element_size)
            .ok_or(CphdError::BufferTooSmall {
                needed: usize::MAX,
                got: data.len(),
            })?;
        CphdError::check_buffer(total, data.len())?;
        let data = &data[..total];

        match self {
            Self::BigEndian => out.write_all(data)?,
            Self::LittleEndian { .. } if !is_swappable(element_size) => out.write_all(data)?,
            Self::LittleEndian {
                scratch,
                num_threads,
            } => {
                let chunk_bytes = (scratch.len() / element_size) * element_size;

                debug!(
                    "Swapped write: {total} bytes, width {element_size}, {} chunk(s)",
                    total.div_ceil(chunk_bytes)
                );

                for chunk in data.chunks(chunk_bytes) {
                    let buf = &mut scratch[..chunk.len()];
                    buf.copy_from_slice(chunk);
                    byte_swap(buf, element_size, chunk.len() / element_size, *num_threads)?;
                    out.write_all(buf)?;
                }
            }
        }

        Ok(())
    }
}
