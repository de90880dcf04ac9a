//! Конвертация отсчётов CI2 / CI4 / CF8 в `Complex<f32>`.
//!
//! Вход — буфер в порядке байт хоста (перестановка уже выполнена, см.
//! [`crate::byte_swap`]), построчная раскладка `dims.rows × dims.cols`.

use cphd_types::{CphdError, CphdResult, Dims, SignalFormat};
use num_complex::Complex32;

use crate::planner::RowPlanner;

/// Конвертирует отсчёты без масштабирования.
pub fn promote(
    input: &[u8],
    format: SignalFormat,
    dims: Dims,
    num_threads: usize,
    output: &mut [Complex32],
) -> CphdResult<()> {
    convert(input, format, dims, None, num_threads, output)
}

/// Конвертирует отсчёты, умножая каждую строку на её коэффициент.
///
/// Если все коэффициенты ровно 1.0, выполняется обычный [`promote`]:
/// результат побитово совпадает с ним.
pub fn scale(
    input: &[u8],
    format: SignalFormat,
    dims: Dims,
    scale_factors: &[f64],
    num_threads: usize,
    output: &mut [Complex32],
) -> CphdResult<()> {
    if scale_factors.len() != dims.rows {
        return Err(CphdError::ScaleFactorCount {
            expected: dims.rows,
            found: scale_factors.len(),
        });
    }

    if all_ones(scale_factors) {
        return promote(input, format, dims, num_threads, output);
    }

    convert(input, format, dims, Some(scale_factors), num_threads, output)
}

/// `true`, если все коэффициенты равны 1.0 (масштабирование не нужно).
pub fn all_ones(scale_factors: &[f64]) -> bool {
    scale_factors.iter().all(|&f| f == 1.0)
}

fn convert(
    input: &[u8],
    format: SignalFormat,
    dims: Dims,
    scale_factors: Option<&[f64]>,
    num_threads: usize,
    output: &mut [Complex32],
) -> CphdResult<()> {
    let bytes_per_sample = format.bytes_per_sample();
    let area = dims.area();

    CphdError::check_buffer(area * bytes_per_sample, input.len())?;
    CphdError::check_buffer(
        area * std::mem::size_of::<Complex32>(),
        std::mem::size_of_val(output),
    )?;

    if area == 0 {
        return Ok(());
    }

    let input = &input[..area * bytes_per_sample];
    let output = &mut output[..area];

    if num_threads <= 1 || dims.rows < 2 {
        convert_rows(input, format, dims.cols, scale_factors, output);
        return Ok(());
    }

    let partitions = RowPlanner::new(dims.rows, num_threads).partitions();

    std::thread::scope(|scope| {
        let mut in_rest = input;
        let mut out_rest = output;

        for part in partitions {
            let samples = part.len() * dims.cols;
            let (in_block, in_tail) = in_rest.split_at(samples * bytes_per_sample);
            let (out_block, out_tail) = out_rest.split_at_mut(samples);
            in_rest = in_tail;
            out_rest = out_tail;

            let factors = scale_factors.map(|f| &f[part]);
            scope.spawn(move || convert_rows(in_block, format, dims.cols, factors, out_block));
        }
    });

    Ok(())
}

fn convert_rows(
    input: &[u8],
    format: SignalFormat,
    cols: usize,
    scale_factors: Option<&[f64]>,
    output: &mut [Complex32],
) {
    match format {
        SignalFormat::CI2 => convert_with(input, 2, cols, scale_factors, output, |b| {
            (f64::from(b[0] as i8), f64::from(b[1] as i8))
        }),
        SignalFormat::CI4 => convert_with(input, 4, cols, scale_factors, output, |b| {
            (
                f64::from(i16::from_ne_bytes([b[0], b[1]])),
                f64::from(i16::from_ne_bytes([b[2], b[3]])),
            )
        }),
        SignalFormat::CF8 => convert_with(input, 8, cols, scale_factors, output, |b| {
            (
                f64::from(f32::from_ne_bytes([b[0], b[1], b[2], b[3]])),
                f64::from(f32::from_ne_bytes([b[4], b[5], b[6], b[7]])),
            )
        }),
    }
}

fn convert_with<F>(
    input: &[u8],
    bytes_per_sample: usize,
    cols: usize,
    scale_factors: Option<&[f64]>,
    output: &mut [Complex32],
    decode: F,
) where
    F: Fn(&[u8]) -> (f64, f64),
{
    let in_rows = input.chunks_exact(cols * bytes_per_sample);
    let out_rows = output.chunks_exact_mut(cols);

    for (row, (in_row, out_row)) in in_rows.zip(out_rows).enumerate() {
        let samples = in_row.chunks_exact(bytes_per_sample).zip(out_row.iter_mut());

        match scale_factors {
            None => {
                for (raw, out) in samples {
                    let (re, im) = decode(raw);
                    *out = Complex32::new(re as f32, im as f32);
                }
            }
            Some(factors) => {
                let k = factors[row];
                for (raw, out) in samples {
                    let (re, im) = decode(raw);
                    *out = Complex32::new((re * k) as f32, (im * k) as f32);
                }
            }
        }
    }
}
