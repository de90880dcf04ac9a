//! Движок широкополосных данных CPHD
//!
//! Раскладка каналов в блоке сигнала, перестановка байт, конвертация
//! отсчётов CI2/CI4/CF8 в `Complex<f32>`, чтение произвольных областей и
//! последовательная запись файла.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use cphd_core::{CphdWriter, FileHeader, PvpBlock, Wideband, WriterConfig};
//! use cphd_types::{ChannelDescriptor, DataDescriptor, RegionRequest, SignalFormat};
//! use num_complex::Complex;
//! use std::fs::File;
//!
//! let data = DataDescriptor::new(SignalFormat::CI4, 8).with_channel(ChannelDescriptor::new(4, 3));
//! let pvp = PvpBlock::new(&data)?;
//! let signal = vec![Complex::<i16>::new(1, -1); 12];
//!
//! let mut writer = CphdWriter::create("phase.cphd", data.clone(), "<CPHD/>", &WriterConfig::default())?;
//! writer.write(&pvp, &signal, None)?;
//! writer.close()?;
//!
//! let header = FileHeader::read_from(&mut File::open("phase.cphd")?)?;
//! let mut wb = Wideband::open(
//!     "phase.cphd",
//!     data,
//!     header.signal_block_byte_offset,
//!     header.signal_block_size,
//! )?;
//! let samples = wb.read_complex(&RegionRequest::whole_channel(0), &[1.0; 4], 0)?;
//! assert_eq!(samples.len(), 12);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod byte_swap;
pub mod codec;
pub mod config;
pub mod data_writer;
pub mod file_header;
pub mod layout;
pub mod planner;
pub mod pvp;
pub mod support_block;
pub mod wideband;
pub mod writer;

pub use byte_swap::*;
pub use config::*;
pub use data_writer::*;
pub use file_header::*;
pub use layout::*;
pub use planner::*;
pub use pvp::*;
pub use support_block::*;
pub use wideband::*;
pub use writer::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
