//! Произвольное чтение блока сигнала.
//!
//! Сначала проверяется запрос и размер буфера, затем выполняется
//! seek + read, после чего байты приводятся к порядку хоста и (при
//! необходимости) конвертируются в `Complex<f32>`.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

use cphd_types::{CphdError, CphdResult, DataDescriptor, RegionRequest, ResolvedRegion};
use log::debug;
use num_complex::Complex32;

use crate::{
    byte_swap::{byte_swap, is_big_endian_system},
    codec,
    config::ReaderConfig,
    layout::FileLayout,
    planner::resolve_num_threads,
};

/// Читатель широкополосных данных одного файла.
///
/// Позиция потока — изменяемое состояние, поэтому все чтения требуют
/// `&mut self`.
pub struct Wideband<R: Read + Seek> {
    stream: R,
    data: DataDescriptor,
    layout: FileLayout,
    element_size: usize,
    config: ReaderConfig,
}

impl Wideband<File> {
    /// Открывает файл; `start_wb`/`size_wb` — начало и размер блока сигнала.
    pub fn open<P: AsRef<Path>>(
        path: P,
        data: DataDescriptor,
        start_wb: u64,
        size_wb: u64,
    ) -> CphdResult<Self> {
        Self::new(File::open(path)?, data, start_wb, size_wb)
    }
}

impl<R: Read + Seek> Wideband<R> {
    /// Создаёт читатель над произвольным потоком с произвольным доступом.
    pub fn new(
        stream: R,
        data: DataDescriptor,
        start_wb: u64,
        size_wb: u64,
    ) -> CphdResult<Self> {
        let layout = FileLayout::new(&data, start_wb, size_wb)?;
        let element_size = data.num_bytes_per_sample();

        debug!(
            "Wideband: {} channel(s), format {}, offsets {:?}",
            layout.num_channels(),
            data.signal_format,
            layout.offsets()
        );

        Ok(Self {
            stream,
            data,
            layout,
            element_size,
            config: ReaderConfig::default(),
        })
    }

    /// Задаёт настройки чтения: `num_threads = 0` в вызовах берётся из них.
    pub fn with_config(
        mut self,
        config: ReaderConfig,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn data(&self) -> &DataDescriptor {
        &self.data
    }

    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }

    /// Байт на один комплексный отсчёт.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Смещение отсчёта `(vector, sample)` в файле.
    pub fn file_offset(
        &self,
        channel: usize,
        vector: usize,
        sample: usize,
    ) -> CphdResult<u64> {
        self.layout.sample_offset(channel, vector, sample)
    }

    /// Смещение начала канала в файле.
    pub fn channel_offset(
        &self,
        channel: usize,
    ) -> CphdResult<u64> {
        self.layout.channel_offset(channel)
    }

    /// Проверяет запрос и раскрывает [`RegionRequest::ALL`].
    pub fn check_read_inputs(
        &self,
        region: &RegionRequest,
    ) -> CphdResult<ResolvedRegion> {
        region.resolve(&self.data.channels)
    }

    /// Читает область в `out` (порядок байт хоста, формат файла).
    pub fn read(
        &mut self,
        region: &RegionRequest,
        num_threads: usize,
        out: &mut [u8],
    ) -> CphdResult<()> {
        self.ensure_uncompressed()?;

        let region = self.check_read_inputs(region)?;
        let area = region.dims.area();
        let needed = area * self.element_size;

        CphdError::check_buffer(needed, out.len())?;

        let out = &mut out[..needed];
        self.read_impl(&region, out)?;
        let num_threads = self.threads(num_threads);
        self.normalize_samples(out, area, num_threads)
    }

    /// Читает область в новый буфер.
    pub fn read_to_vec(
        &mut self,
        region: &RegionRequest,
        num_threads: usize,
    ) -> CphdResult<Vec<u8>> {
        let dims = self.check_read_inputs(region)?.dims;
        let mut out = vec![0u8; dims.area() * self.element_size];

        self.read(region, num_threads, &mut out)?;

        Ok(out)
    }

    /// Читает сжатый канал целиком.
    ///
    /// Сжатые данные непрозрачны: адресации подобластей нет, а перестановка
    /// байт трактует весь канал как одно слово и поэтому затрагивает только
    /// каналы длиной 2, 4 или 8 байт.
    pub fn read_compressed(
        &mut self,
        channel: usize,
        out: &mut [u8],
    ) -> CphdResult<()> {
        if !self.data.is_compressed() {
            return Err(CphdError::NotCompressed("whole-channel compressed read"));
        }

        let size = self.data.compressed_signal_size(channel)?;
        CphdError::check_buffer(size, out.len())?;

        let offset = self.layout.channel_offset(channel)?;
        let out = &mut out[..size];

        self.stream.seek(SeekFrom::Start(offset))?;
        self.stream.read_exact(out)?;

        debug!("Read compressed channel {channel}: {size} bytes at {offset}");

        if !is_big_endian_system() {
            byte_swap(out, size, 1, 1)?;
        }

        Ok(())
    }

    /// Читает сжатый канал в новый буфер.
    pub fn read_compressed_to_vec(
        &mut self,
        channel: usize,
    ) -> CphdResult<Vec<u8>> {
        if !self.data.is_compressed() {
            return Err(CphdError::NotCompressed("whole-channel compressed read"));
        }

        let mut out = vec![0u8; self.data.compressed_signal_size(channel)?];
        self.read_compressed(channel, &mut out)?;

        Ok(out)
    }

    /// Читает область сразу в `Complex<f32>`, умножая строки на коэффициенты.
    ///
    /// `scratch` нужен, когда требуется масштабирование или формат не CF8:
    /// не меньше `rows * cols * element_size` байт. Для CF8 без
    /// масштабирования данные читаются прямо в `out`.
    pub fn read_scaled(
        &mut self,
        region: &RegionRequest,
        scale_factors: &[f64],
        num_threads: usize,
        scratch: &mut [u8],
        out: &mut [Complex32],
    ) -> CphdResult<()> {
        self.ensure_uncompressed()?;

        let region = self.check_read_inputs(region)?;
        let dims = region.dims;

        if scale_factors.len() != dims.rows {
            return Err(CphdError::ScaleFactorCount {
                expected: dims.rows,
                found: scale_factors.len(),
            });
        }

        let area = dims.area();
        CphdError::check_buffer(
            area * std::mem::size_of::<Complex32>(),
            std::mem::size_of_val(out),
        )?;

        let format = self.data.signal_format;
        let needs_scaling = !codec::all_ones(scale_factors);
        let num_threads = self.threads(num_threads);
        let out = &mut out[..area];

        if needs_scaling || !format.is_native_float() {
            let needed = area * self.element_size;
            CphdError::check_buffer(needed, scratch.len())?;

            let scratch = &mut scratch[..needed];
            self.read_impl(&region, scratch)?;
            self.normalize_samples(scratch, area, num_threads)?;

            if needs_scaling {
                codec::scale(scratch, format, dims, scale_factors, num_threads, out)
            } else {
                codec::promote(scratch, format, dims, num_threads, out)
            }
        } else {
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(out);
            self.read_impl(&region, bytes)?;
            self.normalize_samples(bytes, area, num_threads)
        }
    }

    /// Как [`Wideband::read_scaled`], но буферы выделяются сами.
    pub fn read_complex(
        &mut self,
        region: &RegionRequest,
        scale_factors: &[f64],
        num_threads: usize,
    ) -> CphdResult<Vec<Complex32>> {
        let area = self.check_read_inputs(region)?.dims.area();
        let needs_scratch =
            !codec::all_ones(scale_factors) || !self.data.signal_format.is_native_float();

        let mut scratch = vec![0u8; if needs_scratch { area * self.element_size } else { 0 }];
        let mut out = vec![Complex32::default(); area];

        self.read_scaled(region, scale_factors, num_threads, &mut scratch, &mut out)?;

        Ok(out)
    }

    fn threads(
        &self,
        num_threads: usize,
    ) -> usize {
        match num_threads {
            0 => resolve_num_threads(self.config.num_threads),
            n => n,
        }
    }

    fn ensure_uncompressed(&self) -> CphdResult<()> {
        if self.data.is_compressed() {
            return Err(CphdError::Compressed(
                "region reads need an uncompressed signal block",
            ));
        }

        Ok(())
    }

    /// Сырые байты области; `out` уже имеет точный размер.
    fn read_impl(
        &mut self,
        region: &ResolvedRegion,
        out: &mut [u8],
    ) -> CphdResult<()> {
        let num_samples = self.data.channels[region.channel].num_samples;
        let mut offset =
            self.layout
                .sample_offset(region.channel, region.first_vector, region.first_sample)?;

        if region.dims.cols == num_samples {
            // Полная ширина: один seek и одно чтение
            self.stream.seek(SeekFrom::Start(offset))?;
            self.stream.read_exact(out)?;
        } else {
            // Часть столбцов: строки в файле не смежны, читаем построчно
            let bytes_per_vector_aoi = region.dims.cols * self.element_size;
            let bytes_per_vector_file = (num_samples * self.element_size) as u64;

            for row in out.chunks_exact_mut(bytes_per_vector_aoi) {
                self.stream.seek(SeekFrom::Start(offset))?;
                self.stream.read_exact(row)?;
                offset += bytes_per_vector_file;
            }
        }

        Ok(())
    }

    /// Приводит компоненты к порядку байт хоста (ширина — половина отсчёта).
    fn normalize_samples(
        &self,
        buf: &mut [u8],
        area: usize,
        num_threads: usize,
    ) -> CphdResult<()> {
        if is_big_endian_system() || self.element_size <= 2 {
            return Ok(());
        }

        byte_swap(buf, self.element_size / 2, area * 2, num_threads)
    }
}
