use std::{fs, fs::File, path::Path};

use bytemuck::Pod;
use cphd_core::{
    CphdWriter, FileHeader, PvpBlock, SupportBlock, Wideband, WriterConfig, WriterState,
};
use cphd_types::{
    ChannelDescriptor, CphdError, DataDescriptor, RegionRequest, SignalFormat,
    SupportArrayDescriptor,
};
use num_complex::{Complex, Complex32};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tempfile::NamedTempFile;

// ===========================================================================
// Helpers
// ===========================================================================

const XML: &str = "<CPHD><Data>integration</Data></CPHD>";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// PVP с детерминированным содержимым: значение = ch*1000 + v*10 + p.
fn deterministic_pvp(data: &DataDescriptor) -> PvpBlock {
    let mut pvp = PvpBlock::new(data).unwrap();

    for (ch, channel) in data.channels.iter().enumerate() {
        for v in 0..channel.num_vectors {
            for p in 0..pvp.num_params() {
                pvp.set(ch, v, p, (ch * 1000 + v * 10 + p) as f64 + 0.5).unwrap();
            }
        }
    }

    pvp
}

fn write_file<T: Pod>(
    path: &Path,
    data: &DataDescriptor,
    signal: &[T],
    support: Option<&[u8]>,
) -> FileHeader {
    let mut writer = CphdWriter::create(path, data.clone(), XML, &WriterConfig::default()).unwrap();
    writer.write(&deterministic_pvp(data), signal, support).unwrap();

    let header = writer.header().clone();
    writer.close().unwrap();

    header
}

fn open_wideband(
    path: &Path,
    data: &DataDescriptor,
) -> Wideband<File> {
    let header = FileHeader::read_from(&mut File::open(path).unwrap()).unwrap();

    Wideband::open(
        path,
        data.clone(),
        header.signal_block_byte_offset,
        header.signal_block_size,
    )
    .unwrap()
}

fn random_ci4(
    seed: u64,
    n: usize,
) -> Vec<Complex<i16>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| Complex::new(rng.gen(), rng.gen())).collect()
}

// ===========================================================================
// Round trip
// ===========================================================================

#[test]
fn test_round_trip_ci2() {
    init_logger();
    let tmp = NamedTempFile::new().unwrap();
    let data = DataDescriptor::new(SignalFormat::CI2, 16).with_channel(ChannelDescriptor::new(6, 5));

    let mut rng = StdRng::seed_from_u64(2);
    let signal: Vec<Complex<i8>> = (0..30).map(|_| Complex::new(rng.gen(), rng.gen())).collect();
    write_file(tmp.path(), &data, &signal, None);

    let mut wb = open_wideband(tmp.path(), &data);
    let raw = wb.read_to_vec(&RegionRequest::whole_channel(0), 2).unwrap();
    assert_eq!(raw, bytemuck::cast_slice::<_, u8>(&signal));

    let promoted = wb.read_complex(&RegionRequest::whole_channel(0), &[1.0; 6], 2).unwrap();
    for (p, s) in promoted.iter().zip(&signal) {
        assert_eq!(*p, Complex32::new(f32::from(s.re), f32::from(s.im)));
    }
}

#[test]
fn test_round_trip_ci4() {
    init_logger();
    let tmp = NamedTempFile::new().unwrap();
    let data = DataDescriptor::new(SignalFormat::CI4, 8)
        .with_channel(ChannelDescriptor::new(7, 9))
        .with_channel(ChannelDescriptor::new(3, 4));

    let signal = random_ci4(4, 7 * 9 + 3 * 4);
    write_file(tmp.path(), &data, &signal, None);

    let mut wb = open_wideband(tmp.path(), &data);

    let ch0 = wb.read_to_vec(&RegionRequest::whole_channel(0), 3).unwrap();
    let ch0: Vec<Complex<i16>> = bytemuck::pod_collect_to_vec(&ch0[..]);
    assert_eq!(ch0, signal[..63]);

    let ch1 = wb.read_to_vec(&RegionRequest::whole_channel(1), 3).unwrap();
    let ch1: Vec<Complex<i16>> = bytemuck::pod_collect_to_vec(&ch1[..]);
    assert_eq!(ch1, signal[63..]);
}

#[test]
fn test_round_trip_cf8() {
    init_logger();
    let tmp = NamedTempFile::new().unwrap();
    let data = DataDescriptor::new(SignalFormat::CF8, 8).with_channel(ChannelDescriptor::new(10, 16));

    let mut rng = StdRng::seed_from_u64(8);
    let signal: Vec<Complex32> = (0..160)
        .map(|_| Complex32::new(rng.gen_range(-1e3..1e3), rng.gen_range(-1e3..1e3)))
        .collect();
    write_file(tmp.path(), &data, &signal, None);

    let mut wb = open_wideband(tmp.path(), &data);
    let read = wb.read_complex(&RegionRequest::whole_channel(0), &[1.0; 10], 4).unwrap();

    for (r, s) in read.iter().zip(&signal) {
        assert!((r - s).norm() <= 1e-6, "{r} != {s}");
    }
}

// ===========================================================================
// Чтение областей
// ===========================================================================

#[test]
fn test_scaled_rows_through_file() {
    init_logger();
    let tmp = NamedTempFile::new().unwrap();
    let data = DataDescriptor::new(SignalFormat::CI4, 8).with_channel(ChannelDescriptor::new(4, 3));

    // Строка r заполнена (r+1, r+1)
    let signal: Vec<Complex<i16>> = (0..4)
        .flat_map(|r| std::iter::repeat(Complex::new(r + 1, r + 1)).take(3))
        .collect();
    write_file(tmp.path(), &data, &signal, None);

    let mut wb = open_wideband(tmp.path(), &data);
    let out = wb
        .read_complex(&RegionRequest::whole_channel(0), &[1.0, 2.0, 1.0, 2.0], 2)
        .unwrap();

    let expected = [1.0, 4.0, 3.0, 8.0];
    for (row, chunk) in out.chunks(3).enumerate() {
        assert!(chunk.iter().all(|c| *c == Complex32::new(expected[row], expected[row])));
    }
}

#[test]
fn test_full_width_equals_two_half_width_reads() {
    init_logger();
    let tmp = NamedTempFile::new().unwrap();
    let (rows, cols) = (33, 20);
    let data = DataDescriptor::new(SignalFormat::CI4, 8).with_channel(ChannelDescriptor::new(rows, cols));

    write_file(tmp.path(), &data, &random_ci4(11, rows * cols), None);
    let mut wb = open_wideband(tmp.path(), &data);

    let full = wb.read_to_vec(&RegionRequest::whole_channel(0), 4).unwrap();
    let left = wb
        .read_to_vec(&RegionRequest::new(0, 0, RegionRequest::ALL, 0, cols / 2 - 1), 4)
        .unwrap();
    let right = wb
        .read_to_vec(&RegionRequest::new(0, 0, RegionRequest::ALL, cols / 2, RegionRequest::ALL), 1)
        .unwrap();

    let half = cols / 2 * 4;
    let joined: Vec<u8> = left
        .chunks_exact(half)
        .zip(right.chunks_exact(half))
        .flat_map(|(l, r)| l.iter().chain(r).copied())
        .collect();

    assert_eq!(joined, full);
}

#[test]
fn test_sub_region_of_second_channel() {
    init_logger();
    let tmp = NamedTempFile::new().unwrap();
    let data = DataDescriptor::new(SignalFormat::CI4, 8)
        .with_channel(ChannelDescriptor::new(2, 2))
        .with_channel(ChannelDescriptor::new(5, 6));

    let signal: Vec<Complex<i16>> = (0..4 + 30).map(|i| Complex::new(i, -i)).collect();
    write_file(tmp.path(), &data, &signal, None);

    let mut wb = open_wideband(tmp.path(), &data);
    let out = wb.read_complex(&RegionRequest::new(1, 3, 4, 2, 3), &[1.0, 0.5], 1).unwrap();

    // Канал 1 начинается с индекса 4; отсчёт (v, s) = 4 + v*6 + s
    let expected: Vec<Complex32> = [(24, 1.0), (25, 1.0), (30, 0.5), (31, 0.5)]
        .iter()
        .map(|&(i, k)| Complex32::new(i as f32 * k, -i as f32 * k))
        .collect();
    assert_eq!(out, expected);
}

// ===========================================================================
// Заголовок, PVP, support
// ===========================================================================

#[test]
fn test_header_pvp_and_support_round_trip() {
    init_logger();
    let tmp = NamedTempFile::new().unwrap();
    let data = DataDescriptor::new(SignalFormat::CI4, 24)
        .with_channel(ChannelDescriptor::new(3, 4))
        .with_support_array(SupportArrayDescriptor::new("AntGainPhase", 2, 2, 8, 0))
        .with_support_array(SupportArrayDescriptor::new("DwellTime", 1, 3, 4, 40));

    let gain: Vec<f64> = vec![0.25, -1.5, 3.0, 1e-9];
    let dwell: Vec<u32> = vec![7, 0xDEAD_BEEF, 42];
    let mut support = vec![0u8; data.support_block_size()];
    support[..32].copy_from_slice(bytemuck::cast_slice(&gain));
    support[40..52].copy_from_slice(bytemuck::cast_slice(&dwell));

    let written = write_file(tmp.path(), &data, &random_ci4(1, 12), Some(&support[..]));

    let mut file = File::open(tmp.path()).unwrap();
    let header = FileHeader::read_from(&mut file).unwrap();
    assert_eq!(header, written);
    assert_eq!(fs::metadata(tmp.path()).unwrap().len(), header.file_size());

    let pvp = PvpBlock::read_from(&mut file, &data, header.pvp_block_byte_offset).unwrap();
    assert_eq!(pvp, deterministic_pvp(&data));
    assert_eq!(pvp.get(0, 2, 1).unwrap(), 21.5);

    let mut block = SupportBlock::open(
        tmp.path(),
        data.clone(),
        header.support_block_byte_offset,
        header.support_block_size,
    )
    .unwrap();

    let read_gain: Vec<f64> = bytemuck::pod_collect_to_vec(&block.read_to_vec("AntGainPhase", 0).unwrap()[..]);
    assert_eq!(read_gain, gain);

    let read_dwell: Vec<u32> = bytemuck::pod_collect_to_vec(&block.read_to_vec("DwellTime", 2).unwrap()[..]);
    assert_eq!(read_dwell, dwell);

    let all = block.read_all(1).unwrap();
    assert_eq!(all, support);
}

#[test]
fn test_header_carries_config_markings() {
    init_logger();
    let tmp = NamedTempFile::new().unwrap();
    let data = DataDescriptor::new(SignalFormat::CI2, 8).with_channel(ChannelDescriptor::new(1, 4));
    let config = WriterConfig::from_json(r#"{"classification": "TEST ONLY", "num_threads": 2}"#).unwrap();

    {
        let mut writer = CphdWriter::create(tmp.path(), data.clone(), XML, &config).unwrap();
        writer.write(&PvpBlock::new(&data).unwrap(), &[Complex::<i8>::new(1, 2); 4], None).unwrap();
        // close() вызывается в Drop
    }

    let header = FileHeader::read_from(&mut File::open(tmp.path()).unwrap()).unwrap();
    assert_eq!(header.classification, "TEST ONLY");
    assert_eq!(header.release_info, "UNRESTRICTED");

    let xml_start = header.xml_block_byte_offset as usize;
    let raw = fs::read(tmp.path()).unwrap();
    assert_eq!(&raw[xml_start..xml_start + XML.len()], XML.as_bytes());
}

// ===========================================================================
// Сжатые каналы
// ===========================================================================

#[test]
fn test_compressed_round_trip() {
    init_logger();
    let tmp = NamedTempFile::new().unwrap();

    let plain: Vec<Vec<u8>> = (0..2u64)
        .map(|seed| bytemuck::cast_slice::<_, u8>(&random_ci4(seed, 64)).to_vec())
        .collect();
    let packed: Vec<Vec<u8>> = plain.iter().map(|p| lz4_flex::compress_prepend_size(p)).collect();

    let data = DataDescriptor::new(SignalFormat::CI4, 8)
        .with_compression("LZ4")
        .with_channel(ChannelDescriptor::compressed(8, 8, packed[0].len()))
        .with_channel(ChannelDescriptor::compressed(8, 8, packed[1].len()));

    let signal = packed.concat();
    let header = write_file(tmp.path(), &data, &signal, None);
    assert_eq!(header.signal_block_size as usize, signal.len());

    let mut wb = open_wideband(tmp.path(), &data);
    for (ch, expected) in plain.iter().enumerate() {
        let payload = wb.read_compressed_to_vec(ch).unwrap();
        assert_eq!(payload, packed[ch]);
        assert_eq!(&lz4_flex::decompress_size_prepended(&payload).unwrap(), expected);
    }

    assert!(matches!(
        wb.read_to_vec(&RegionRequest::whole_channel(0), 1).unwrap_err(),
        CphdError::Compressed(_)
    ));
}

// ===========================================================================
// Машина состояний
// ===========================================================================

#[test]
fn test_writer_state_machine_on_file() {
    init_logger();
    let tmp = NamedTempFile::new().unwrap();
    let data = DataDescriptor::new(SignalFormat::CI4, 8).with_channel(ChannelDescriptor::new(2, 2));
    let signal = random_ci4(5, 4);

    let mut writer = CphdWriter::create(tmp.path(), data.clone(), XML, &WriterConfig::default()).unwrap();
    assert_eq!(writer.state(), WriterState::Created);

    assert!(matches!(
        writer.write_support_data(&[]).unwrap_err(),
        CphdError::InvalidState { operation: "write_support_data", .. }
    ));

    writer.write(&PvpBlock::new(&data).unwrap(), &signal, None).unwrap();
    assert_eq!(writer.state(), WriterState::SignalWritten);

    // Повторная запись всего файла невозможна
    assert!(writer.write(&PvpBlock::new(&data).unwrap(), &signal, None).is_err());

    writer.close().unwrap();
    assert!(writer.write_metadata().is_err());

    let mut wb = open_wideband(tmp.path(), &data);
    let read: Vec<Complex<i16>> =
        bytemuck::pod_collect_to_vec(&wb.read_to_vec(&RegionRequest::whole_channel(0), 0).unwrap()[..]);
    assert_eq!(read, signal);
}

#[test]
fn test_descriptor_json_drives_writer() {
    init_logger();
    let tmp = NamedTempFile::new().unwrap();
    let json = DataDescriptor::new(SignalFormat::CF8, 16)
        .with_channel(ChannelDescriptor::new(2, 3))
        .to_json()
        .unwrap();
    let data = DataDescriptor::from_json(&json).unwrap();

    let signal: Vec<Complex32> = (0..6).map(|i| Complex32::new(i as f32, 0.5)).collect();
    write_file(tmp.path(), &data, &signal, None);

    let mut wb = open_wideband(tmp.path(), &data);
    let out = wb.read_complex(&RegionRequest::vectors(0, 1, 1), &[2.0], 0).unwrap();
    assert_eq!(out, vec![Complex32::new(6.0, 1.0), Complex32::new(8.0, 1.0), Complex32::new(10.0, 1.0)]);
}
