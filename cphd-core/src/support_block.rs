use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

use cphd_types::{CphdError, CphdResult, DataDescriptor, SupportArrayDescriptor};
use log::debug;

use crate::{
    byte_swap::{byte_swap, is_big_endian_system},
    config::ReaderConfig,
    layout::{support_array_offset, validate_support_arrays},
    planner::resolve_num_threads,
};

/// Читатель support-блока: массивы по идентификатору, в порядке байт хоста.
pub struct SupportBlock<R: Read + Seek> {
    stream: R,
    data: DataDescriptor,
    block_offset: u64,
    block_size: u64,
    config: ReaderConfig,
}

impl SupportBlock<File> {
    /// Открывает файл и готовит чтение support-блока.
    pub fn open<P: AsRef<Path>>(
        path: P,
        data: DataDescriptor,
        block_offset: u64,
        block_size: u64,
    ) -> CphdResult<Self> {
        Self::new(File::open(path)?, data, block_offset, block_size)
    }
}

impl<R: Read + Seek> SupportBlock<R> {
    /// Проверяет таблицу массивов относительно размера блока.
    pub fn new(
        stream: R,
        data: DataDescriptor,
        block_offset: u64,
        block_size: u64,
    ) -> CphdResult<Self> {
        validate_support_arrays(data.support_arrays.values(), block_size as usize)?;

        Ok(Self {
            stream,
            data,
            block_offset,
            block_size,
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

    /// Смещение массива в файле.
    pub fn file_offset(
        &self,
        id: &str,
    ) -> CphdResult<u64> {
        Ok(support_array_offset(
            self.block_offset,
            self.data.support_array(id)?,
        ))
    }

    /// Читает массив `id` в `out`.
    pub fn read(
        &mut self,
        id: &str,
        num_threads: usize,
        out: &mut [u8],
    ) -> CphdResult<()> {
        let array = self.data.support_array(id)?.clone();
        let size = array.size();

        CphdError::check_buffer(size, out.len())?;

        self.stream
            .seek(SeekFrom::Start(support_array_offset(self.block_offset, &array)))?;
        self.stream.read_exact(&mut out[..size])?;

        debug!("Read support array '{id}' ({size} bytes)");

        let num_threads = self.threads(num_threads);
        normalize(&array, &mut out[..size], num_threads)
    }

    /// Читает массив `id` в новый буфер.
    pub fn read_to_vec(
        &mut self,
        id: &str,
        num_threads: usize,
    ) -> CphdResult<Vec<u8>> {
        let mut out = vec![0u8; self.data.support_array(id)?.size()];
        self.read(id, num_threads, &mut out)?;

        Ok(out)
    }

    /// Читает весь блок, переставляя байты каждого массива на своём месте.
    pub fn read_all(
        &mut self,
        num_threads: usize,
    ) -> CphdResult<Vec<u8>> {
        let mut block = vec![0u8; self.block_size as usize];

        self.stream.seek(SeekFrom::Start(self.block_offset))?;
        self.stream.read_exact(&mut block)?;

        let num_threads = self.threads(num_threads);
        for array in self.data.support_arrays.values() {
            let range = array.array_byte_offset..array.end();
            normalize(array, &mut block[range], num_threads)?;
        }

        Ok(block)
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
}

fn normalize(
    array: &SupportArrayDescriptor,
    buf: &mut [u8],
    num_threads: usize,
) -> CphdResult<()> {
    if is_big_endian_system() {
        return Ok(());
    }

    byte_swap(buf, array.bytes_per_element, array.num_elements(), num_threads)
}
