//! Перестановка байт внутри слов фиксированной ширины.
//!
//! Формат хранит блоки сигнала, PVP и support в порядке big-endian. На
//! little-endian хосте слова разворачиваются перед конвертацией и перед
//! записью.

use cphd_types::{CphdError, CphdResult};

use crate::planner::RowPlanner;

/// `true`, если порядок байт хоста совпадает с порядком формата.
pub fn is_big_endian_system() -> bool {
    cfg!(target_endian = "big")
}

/// `true` для ширин слова, которые умеет разворачивать [`byte_swap`].
pub fn is_swappable(element_size: usize) -> bool {
    matches!(element_size, 2 | 4 | 8)
}

/// Разворачивает байты в первых `num_elements` словах по `element_size` байт.
///
/// Поддерживаются только ширины 2, 4 и 8; для любой другой ширины вызов
/// ничего не делает. При `num_threads > 1` слова делятся на непрерывные
/// диапазоны, каждый поток работает только со своим срезом.
pub fn byte_swap(
    buffer: &mut [u8],
    element_size: usize,
    num_elements: usize,
    num_threads: usize,
) -> CphdResult<()> {
    if !is_swappable(element_size) {
        return Ok(());
    }

    let needed = element_size
        .checked_mul(num_elements)
        .ok_or(CphdError::BufferTooSmall {
            needed: usize::MAX,
            got: buffer.len(),
        })?;
    CphdError::check_buffer(needed, buffer.len())?;

    let buffer = &mut buffer[..needed];

    if num_threads <= 1 || num_elements < 2 {
        swap_words(buffer, element_size);
        return Ok(());
    }

    let partitions = RowPlanner::new(num_elements, num_threads).partitions();

    std::thread::scope(|scope| {
        let mut rest = buffer;

        for part in partitions {
            let (chunk, tail) = rest.split_at_mut(part.len() * element_size);
            rest = tail;
            scope.spawn(move || swap_words(chunk, element_size));
        }
    });

    Ok(())
}

fn swap_words(
    buffer: &mut [u8],
    element_size: usize,
) {
    for word in buffer.chunks_exact_mut(element_size) {
        word.reverse();
    }
}
