//! Блок параметров векторов (PVP): по строке 8-байтовых скаляров на вектор.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};
use cphd_types::{CphdError, CphdResult, DataDescriptor};

/// Размер одного скаляра PVP в байтах.
pub const PVP_SCALAR_SIZE: usize = 8;

/// Параметры векторов всех каналов в порядке байт хоста.
#[derive(Debug, Clone, PartialEq)]
pub struct PvpBlock {
    num_params: usize,
    num_vectors: Vec<usize>,
    channels: Vec<Vec<f64>>,
}

impl PvpBlock {
    /// Создаёт блок, заполненный нулями, по таблице каналов.
    pub fn new(data: &DataDescriptor) -> CphdResult<Self> {
        let num_params = num_params(data)?;
        let num_vectors: Vec<usize> = data.channels.iter().map(|c| c.num_vectors).collect();
        let channels = num_vectors.iter().map(|n| vec![0.0; n * num_params]).collect();

        Ok(Self {
            num_params,
            num_vectors,
            channels,
        })
    }

    /// Читает PVP всех каналов начиная с `pvp_offset`.
    pub fn read_from<R: Read + Seek>(
        stream: &mut R,
        data: &DataDescriptor,
        pvp_offset: u64,
    ) -> CphdResult<Self> {
        let mut block = Self::new(data)?;

        stream.seek(SeekFrom::Start(pvp_offset))?;
        for values in &mut block.channels {
            stream.read_f64_into::<BigEndian>(values)?;
        }

        Ok(block)
    }

    /// Скаляров на один вектор.
    pub fn num_params(&self) -> usize {
        self.num_params
    }

    /// Байт на один вектор.
    pub fn num_bytes_pvp(&self) -> usize {
        self.num_params * PVP_SCALAR_SIZE
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_vectors(
        &self,
        channel: usize,
    ) -> CphdResult<usize> {
        self.check_channel(channel)?;
        Ok(self.num_vectors[channel])
    }

    /// Размер PVP канала в байтах.
    pub fn channel_size(
        &self,
        channel: usize,
    ) -> CphdResult<usize> {
        Ok(self.num_vectors(channel)? * self.num_bytes_pvp())
    }

    /// Размер всего блока в байтах.
    pub fn total_size(&self) -> usize {
        self.num_vectors.iter().sum::<usize>() * self.num_bytes_pvp()
    }

    /// Параметры одного вектора.
    pub fn vector(
        &self,
        channel: usize,
        vector: usize,
    ) -> CphdResult<&[f64]> {
        let range = self.vector_range(channel, vector)?;
        Ok(&self.channels[channel][range])
    }

    pub fn vector_mut(
        &mut self,
        channel: usize,
        vector: usize,
    ) -> CphdResult<&mut [f64]> {
        let range = self.vector_range(channel, vector)?;
        Ok(&mut self.channels[channel][range])
    }

    pub fn get(
        &self,
        channel: usize,
        vector: usize,
        param: usize,
    ) -> CphdResult<f64> {
        self.check_param(param)?;
        Ok(self.vector(channel, vector)?[param])
    }

    pub fn set(
        &mut self,
        channel: usize,
        vector: usize,
        param: usize,
        value: f64,
    ) -> CphdResult<()> {
        self.check_param(param)?;
        self.vector_mut(channel, vector)?[param] = value;
        Ok(())
    }

    /// Байтовое представление PVP канала (порядок байт хоста).
    pub fn channel_bytes(
        &self,
        channel: usize,
    ) -> CphdResult<&[u8]> {
        self.check_channel(channel)?;
        Ok(bytemuck::cast_slice(&self.channels[channel]))
    }

    /// Проверяет, что форма блока совпадает с таблицей каналов.
    pub fn validate_against(
        &self,
        data: &DataDescriptor,
    ) -> CphdResult<()> {
        let expected = num_params(data)?;
        if expected != self.num_params {
            return Err(CphdError::layout(format!(
                "PVP block has {} parameters per vector, descriptor expects {expected}",
                self.num_params
            )));
        }

        let vectors: Vec<usize> = data.channels.iter().map(|c| c.num_vectors).collect();
        if vectors != self.num_vectors {
            return Err(CphdError::layout(format!(
                "PVP block vectors per channel {:?} do not match descriptor {vectors:?}",
                self.num_vectors
            )));
        }

        Ok(())
    }

    fn check_channel(
        &self,
        channel: usize,
    ) -> CphdResult<()> {
        if channel >= self.channels.len() {
            return Err(CphdError::InvalidChannel {
                channel,
                num_channels: self.channels.len(),
            });
        }

        Ok(())
    }

    fn check_param(
        &self,
        param: usize,
    ) -> CphdResult<()> {
        if param >= self.num_params {
            return Err(CphdError::InvalidIndex {
                field: "PVP parameter",
                index: param,
                max: self.num_params.saturating_sub(1),
            });
        }

        Ok(())
    }

    fn vector_range(
        &self,
        channel: usize,
        vector: usize,
    ) -> CphdResult<std::ops::Range<usize>> {
        let num_vectors = self.num_vectors(channel)?;

        if vector >= num_vectors {
            return Err(CphdError::InvalidIndex {
                field: "vector",
                index: vector,
                max: num_vectors.saturating_sub(1),
            });
        }

        let start = vector * self.num_params;
        Ok(start..start + self.num_params)
    }
}

fn num_params(data: &DataDescriptor) -> CphdResult<usize> {
    if data.num_bytes_pvp % PVP_SCALAR_SIZE != 0 {
        return Err(CphdError::layout(format!(
            "num_bytes_pvp {} is not a multiple of {PVP_SCALAR_SIZE}",
            data.num_bytes_pvp
        )));
    }

    Ok(data.num_bytes_pvp / PVP_SCALAR_SIZE)
}
