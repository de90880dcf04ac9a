//! Запись CPHD файла: заголовок → XML → PVP → support → сигнал.
//!
//! Порядок секций задаётся машиной состояний [`WriterState`]; вызов не по
//! порядку сразу завершается ошибкой `InvalidState`.

use std::{
    fs::File,
    io::{BufWriter, Seek, SeekFrom, Write},
    path::Path,
};

use bytemuck::Pod;
use cphd_types::{CphdError, CphdResult, DataDescriptor};
use log::{debug, info, warn};

use crate::{
    config::WriterConfig,
    data_writer::DataWriter,
    file_header::{FileHeader, SECTION_TERMINATOR},
    layout::{validate_support_arrays, FileLayout},
    pvp::{PvpBlock, PVP_SCALAR_SIZE},
};

/// Этап записи файла.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Created,
    MetadataWritten,
    PvpWritten,
    SupportWritten,
    SignalWritten,
    Closed,
}

/// Писатель CPHD файла поверх потока с произвольным доступом.
pub struct CphdWriter<W: Write + Seek> {
    stream: Option<BufWriter<W>>,
    data: DataDescriptor,
    xml: String,
    header: FileHeader,
    layout: FileLayout,
    data_writer: DataWriter,
    state: WriterState,
    /// Позиция курсора после последней записи
    bytes_written: u64,
    /// Записано байт блока сигнала
    signal_written: u64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl CphdWriter<File> {
    /// Создаёт (перезаписывает) файл по пути `path`.
    pub fn create<P: AsRef<Path>>(
        path: P,
        data: DataDescriptor,
        xml: &str,
        config: &WriterConfig,
    ) -> CphdResult<Self> {
        let path = path.as_ref();
        info!("Creating CPHD file {}", path.display());

        Self::new(File::create(path)?, data, xml, config)
    }
}

impl<W: Write + Seek> CphdWriter<W> {
    /// Вычисляет раскладку файла; в поток пока ничего не пишется.
    pub fn new(
        stream: W,
        data: DataDescriptor,
        xml: &str,
        config: &WriterConfig,
    ) -> CphdResult<Self> {
        let support_size = data.support_block_size();
        validate_support_arrays(data.support_arrays.values(), support_size)?;

        let mut header = FileHeader {
            classification: config.classification.clone(),
            release_info: config.release_info.clone(),
            ..FileHeader::default()
        };
        header.set(
            xml.len() as u64,
            data.pvp_block_size() as u64,
            support_size as u64,
            data.signal_block_size()? as u64,
        );

        let layout = FileLayout::new(
            &data,
            header.signal_block_byte_offset,
            header.signal_block_size,
        )?;
        let data_writer = DataWriter::for_host(config.num_threads, config.scratch_space_size)?;

        debug!(
            "CPHD layout: pvp @{} ({} B), support @{} ({} B), signal @{} ({} B), swap={}",
            header.pvp_block_byte_offset,
            header.pvp_block_size,
            header.support_block_byte_offset,
            header.support_block_size,
            header.signal_block_byte_offset,
            header.signal_block_size,
            data_writer.swaps()
        );

        Ok(Self {
            stream: Some(BufWriter::new(stream)),
            data,
            xml: xml.to_string(),
            header,
            layout,
            data_writer,
            state: WriterState::Created,
            bytes_written: 0,
            signal_written: 0,
        })
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn data(&self) -> &DataDescriptor {
        &self.data
    }

    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }

    /// Позиция курсора после последней записи.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Заголовок, XML, терминатор и выравнивание.
    pub fn write_metadata(&mut self) -> CphdResult<()> {
        self.check_state("write_metadata", &[WriterState::Created])?;

        let header = self.header.serialize()?;
        let pad = vec![0u8; self.header.pad_bytes() as usize];
        let Some(stream) = self.stream.as_mut() else {
            return Err(CphdError::invalid_state("write_metadata", self.state));
        };

        stream.seek(SeekFrom::Start(0))?;
        stream.write_all(&header)?;
        stream.write_all(self.xml.as_bytes())?;
        stream.write_all(&SECTION_TERMINATOR)?;
        stream.write_all(&pad)?;

        self.bytes_written = self.header.pvp_block_byte_offset;
        self.state = WriterState::MetadataWritten;

        debug!("Metadata written: XML {} bytes", self.header.xml_block_size);

        Ok(())
    }

    /// PVP всех каналов подряд, 8-байтовыми словами.
    pub fn write_pvp_data(
        &mut self,
        pvp: &PvpBlock,
    ) -> CphdResult<()> {
        self.check_state("write_pvp_data", &[WriterState::MetadataWritten])?;
        pvp.validate_against(&self.data)?;

        let offset = self.header.pvp_block_byte_offset;
        let Some(stream) = self.stream.as_mut() else {
            return Err(CphdError::invalid_state("write_pvp_data", self.state));
        };

        stream.seek(SeekFrom::Start(offset))?;
        for ch in 0..pvp.num_channels() {
            let bytes = pvp.channel_bytes(ch)?;
            self.data_writer
                .write(stream, bytes, bytes.len() / PVP_SCALAR_SIZE, PVP_SCALAR_SIZE)?;
        }

        self.bytes_written = offset + self.header.pvp_block_size;
        self.state = WriterState::PvpWritten;

        debug!("PVP block written: {} bytes", self.header.pvp_block_size);

        Ok(())
    }

    /// Весь support-блок: каждый массив на своём смещении.
    ///
    /// Промежутки между массивами в `support` не пишутся и остаются нулями.
    pub fn write_support_data(
        &mut self,
        support: &[u8],
    ) -> CphdResult<()> {
        self.check_state("write_support_data", &[WriterState::PvpWritten])?;
        CphdError::check_buffer(self.header.support_block_size as usize, support.len())?;

        let base = self.header.support_block_byte_offset;
        let end = base + self.header.support_block_size;
        let Some(stream) = self.stream.as_mut() else {
            return Err(CphdError::invalid_state("write_support_data", self.state));
        };

        for array in self.data.support_arrays.values() {
            stream.seek(SeekFrom::Start(base + array.array_byte_offset as u64))?;
            self.data_writer.write(
                stream,
                &support[array.array_byte_offset..array.end()],
                array.num_elements(),
                array.bytes_per_element,
            )?;
        }

        stream.seek(SeekFrom::Start(end))?;

        self.bytes_written = end;
        self.state = WriterState::SupportWritten;

        debug!(
            "Support block written: {} array(s), {} bytes",
            self.data.support_arrays.len(),
            self.header.support_block_size
        );

        Ok(())
    }

    /// Один support-массив по идентификатору.
    pub fn write_support_array(
        &mut self,
        id: &str,
        array_data: &[u8],
    ) -> CphdResult<()> {
        self.check_state(
            "write_support_array",
            &[WriterState::PvpWritten, WriterState::SupportWritten],
        )?;

        let array = self.data.support_array(id)?.clone();
        CphdError::check_buffer(array.size(), array_data.len())?;

        let offset = self.header.support_block_byte_offset + array.array_byte_offset as u64;
        let Some(stream) = self.stream.as_mut() else {
            return Err(CphdError::invalid_state("write_support_array", self.state));
        };

        stream.seek(SeekFrom::Start(offset))?;
        self.data_writer
            .write(stream, array_data, array.num_elements(), array.bytes_per_element)?;

        self.bytes_written = offset + array.size() as u64;
        self.state = WriterState::SupportWritten;

        debug!("Support array '{id}' written: {} bytes", array.size());

        Ok(())
    }

    /// Дописывает `num_elements` отсчётов несжатого сигнала.
    ///
    /// Размер `T` должен совпадать с размером отсчёта формата
    /// (`Complex<i8>` для CI2, `Complex<i16>` для CI4, `Complex<f32>` для CF8).
    /// Повторные вызовы продолжают с места, где закончил предыдущий.
    pub fn write_signal_data<T: Pod>(
        &mut self,
        data: &[T],
        num_elements: usize,
    ) -> CphdResult<()> {
        self.check_state(
            "write_signal_data",
            &[
                WriterState::PvpWritten,
                WriterState::SupportWritten,
                WriterState::SignalWritten,
            ],
        )?;

        if self.data.is_compressed() {
            return Err(CphdError::Compressed(
                "use write_compressed_signal_data for a compressed signal block",
            ));
        }

        let bytes_per_sample = self.data.num_bytes_per_sample();
        if std::mem::size_of::<T>() != bytes_per_sample {
            return Err(CphdError::ElementSizeMismatch {
                expected: bytes_per_sample,
                found: std::mem::size_of::<T>(),
            });
        }

        let requested = num_elements
            .checked_mul(bytes_per_sample)
            .ok_or(CphdError::BufferTooSmall {
                needed: usize::MAX,
                got: std::mem::size_of_val(data),
            })? as u64;
        let remaining = self.header.signal_block_size - self.signal_written;
        if requested > remaining {
            return Err(CphdError::SignalOverflow {
                requested,
                remaining,
            });
        }

        let first_write = self.state != WriterState::SignalWritten;
        let offset = self.header.signal_block_byte_offset;
        let Some(stream) = self.stream.as_mut() else {
            return Err(CphdError::invalid_state("write_signal_data", self.state));
        };

        if first_write {
            stream.seek(SeekFrom::Start(offset))?;
        }

        // Компоненты I и Q переставляются по отдельности
        self.data_writer.write(
            stream,
            bytemuck::cast_slice(data),
            num_elements * 2,
            bytes_per_sample / 2,
        )?;

        self.signal_written += requested;
        self.bytes_written = offset + self.signal_written;
        self.state = WriterState::SignalWritten;

        Ok(())
    }

    /// Пишет сжатые данные канала `channel` целиком на его смещение.
    ///
    /// Размер берётся из описания канала и не проверяется на соответствие
    /// содержимому.
    pub fn write_compressed_signal_data(
        &mut self,
        data: &[u8],
        channel: usize,
    ) -> CphdResult<()> {
        self.check_state(
            "write_compressed_signal_data",
            &[
                WriterState::PvpWritten,
                WriterState::SupportWritten,
                WriterState::SignalWritten,
            ],
        )?;

        if !self.data.is_compressed() {
            return Err(CphdError::NotCompressed("write_compressed_signal_data"));
        }

        let size = self.data.compressed_signal_size(channel)?;
        CphdError::check_buffer(size, data.len())?;

        let offset = self.layout.channel_offset(channel)?;
        let Some(stream) = self.stream.as_mut() else {
            return Err(CphdError::invalid_state("write_compressed_signal_data", self.state));
        };

        stream.seek(SeekFrom::Start(offset))?;
        // Непрозрачные данные: весь канал как одно слово
        self.data_writer.write(stream, &data[..size], 1, size)?;

        self.signal_written += size as u64;
        self.bytes_written = offset + size as u64;
        self.state = WriterState::SignalWritten;

        debug!("Compressed channel {channel} written: {size} bytes");

        Ok(())
    }

    /// Записывает файл целиком: метаданные, PVP, support (если есть), сигнал.
    ///
    /// Для сжатого блока `signal` — конкатенация сжатых каналов по порядку.
    pub fn write<T: Pod>(
        &mut self,
        pvp: &PvpBlock,
        signal: &[T],
        support: Option<&[u8]>,
    ) -> CphdResult<()> {
        self.write_metadata()?;
        self.write_pvp_data(pvp)?;

        if let Some(support) = support {
            self.write_support_data(support)?;
        }

        if self.data.is_compressed() {
            let bytes: &[u8] = bytemuck::cast_slice(signal);
            let mut start = 0;

            for ch in 0..self.data.num_channels() {
                let size = self.data.compressed_signal_size(ch)?;
                CphdError::check_buffer(start + size, bytes.len())?;
                self.write_compressed_signal_data(&bytes[start..start + size], ch)?;
                start += size;
            }
        } else {
            let num_elements = self.header.signal_block_size as usize / self.data.num_bytes_per_sample();
            self.write_signal_data(signal, num_elements)?;
        }

        Ok(())
    }

    /// Сбрасывает буферы и освобождает поток. Повторный вызов ничего не делает.
    pub fn close(&mut self) -> CphdResult<()> {
        if self.state == WriterState::Closed {
            return Ok(());
        }

        if self.state != WriterState::SignalWritten {
            warn!("Closing CPHD writer before signal data was written (state: {})", self.state);
        }

        let previous = self.state;
        self.state = WriterState::Closed;

        if let Some(mut stream) = self.stream.take() {
            stream.flush()?;
        }

        info!(
            "CPHD writer closed after {previous}: {} of {} bytes",
            self.bytes_written,
            self.header.file_size()
        );

        Ok(())
    }

    fn check_state(
        &self,
        operation: &'static str,
        allowed: &[WriterState],
    ) -> CphdResult<()> {
        if !allowed.contains(&self.state) {
            return Err(CphdError::invalid_state(operation, self.state));
        }

        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for WriterState {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let name = match self {
            WriterState::Created => "created",
            WriterState::MetadataWritten => "metadata written",
            WriterState::PvpWritten => "PVP written",
            WriterState::SupportWritten => "support written",
            WriterState::SignalWritten => "signal written",
            WriterState::Closed => "closed",
        };

        f.write_str(name)
    }
}

impl<W: Write + Seek> Drop for CphdWriter<W> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close CPHD writer: {e}");
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
