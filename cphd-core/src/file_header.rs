//! Заголовок файла: текст `KEY := VALUE` фиксированного размера 512 байт.
//!
//! Раскладка файла:
//!
//! ```text
//! [0..512)               заголовок (текст + "\f\n" + нули)
//! [512..512+xml)         XML метаданные
//! +2                     "\f\n"
//! pad                    нули до границы 8 байт
//! PVP   блок             big-endian, 8-байтовые скаляры
//! SUPPORT блок           массивы по своим смещениям
//! SIGNAL  блок           каналы подряд
//! ```

use std::io::{Read, Write};

use cphd_types::{CphdError, CphdResult};

/// Размер фиксированного заголовка
pub const FILE_HEADER_SIZE: usize = 512;

/// Строка версии формата
pub const CPHD_VERSION: &str = "CPHD/1.0";

/// Терминатор секции (form feed + перевод строки)
pub const SECTION_TERMINATOR: [u8; 2] = [0x0C, b'\n'];

/// Выравнивание начала PVP-блока
pub const BLOCK_ALIGNMENT: u64 = 8;

const XML_BLOCK_SIZE: &str = "XML_BLOCK_SIZE";
const XML_BLOCK_BYTE_OFFSET: &str = "XML_BLOCK_BYTE_OFFSET";
const PVP_BLOCK_SIZE: &str = "PVP_BLOCK_SIZE";
const PVP_BLOCK_BYTE_OFFSET: &str = "PVP_BLOCK_BYTE_OFFSET";
const SUPPORT_BLOCK_SIZE: &str = "SUPPORT_BLOCK_SIZE";
const SUPPORT_BLOCK_BYTE_OFFSET: &str = "SUPPORT_BLOCK_BYTE_OFFSET";
const SIGNAL_BLOCK_SIZE: &str = "SIGNAL_BLOCK_SIZE";
const SIGNAL_BLOCK_BYTE_OFFSET: &str = "SIGNAL_BLOCK_BYTE_OFFSET";
const CLASSIFICATION: &str = "CLASSIFICATION";
const RELEASE_INFO: &str = "RELEASE_INFO";

/// Заголовок файла с размерами и смещениями всех блоков.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Строка версии (`CPHD/1.0`)
    pub version: String,
    pub xml_block_size: u64,
    pub xml_block_byte_offset: u64,
    pub pvp_block_size: u64,
    pub pvp_block_byte_offset: u64,
    pub support_block_size: u64,
    pub support_block_byte_offset: u64,
    pub signal_block_size: u64,
    pub signal_block_byte_offset: u64,
    /// Гриф
    pub classification: String,
    /// Ограничения на распространение
    pub release_info: String,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            version: CPHD_VERSION.to_string(),
            xml_block_size: 0,
            xml_block_byte_offset: 0,
            pvp_block_size: 0,
            pvp_block_byte_offset: 0,
            support_block_size: 0,
            support_block_byte_offset: 0,
            signal_block_size: 0,
            signal_block_byte_offset: 0,
            classification: "UNCLASSIFIED".to_string(),
            release_info: "UNRESTRICTED".to_string(),
        }
    }
}

impl FileHeader {
    /// Заполняет размеры блоков и вычисляет все смещения.
    pub fn set(
        &mut self,
        xml_size: u64,
        pvp_size: u64,
        support_size: u64,
        signal_size: u64,
    ) {
        self.xml_block_size = xml_size;
        self.xml_block_byte_offset = FILE_HEADER_SIZE as u64;

        let xml_end = self.xml_block_byte_offset + xml_size + SECTION_TERMINATOR.len() as u64;

        self.pvp_block_size = pvp_size;
        self.pvp_block_byte_offset = xml_end.next_multiple_of(BLOCK_ALIGNMENT);

        self.support_block_size = support_size;
        self.support_block_byte_offset = self.pvp_block_byte_offset + pvp_size;

        self.signal_block_size = signal_size;
        self.signal_block_byte_offset = self.support_block_byte_offset + support_size;
    }

    /// Нулевые байты между терминатором XML и началом PVP-блока.
    pub fn pad_bytes(&self) -> u64 {
        let xml_end = self.xml_block_byte_offset
            + self.xml_block_size
            + SECTION_TERMINATOR.len() as u64;

        self.pvp_block_byte_offset.saturating_sub(xml_end)
    }

    /// Полный размер файла.
    pub fn file_size(&self) -> u64 {
        self.signal_block_byte_offset + self.signal_block_size
    }

    /// Сериализация заголовка в 512 байт.
    pub fn serialize(&self) -> CphdResult<[u8; FILE_HEADER_SIZE]> {
        for (key, value) in [
            (CLASSIFICATION, &self.classification),
            (RELEASE_INFO, &self.release_info),
        ] {
            if value.contains(['\n', '\x0C']) {
                return Err(CphdError::header(format!(
                    "{key} must be a single line"
                )));
            }
        }

        let mut text = format!("{}\n", self.version);
        for (key, value) in self.numeric_fields() {
            text.push_str(&format!("{key} := {value}\n"));
        }
        text.push_str(&format!("{CLASSIFICATION} := {}\n", self.classification));
        text.push_str(&format!("{RELEASE_INFO} := {}\n", self.release_info));

        let bytes = text.as_bytes();
        let total = bytes.len() + SECTION_TERMINATOR.len();
        if total > FILE_HEADER_SIZE {
            return Err(CphdError::header(format!(
                "header text is {total} bytes, limit is {FILE_HEADER_SIZE}"
            )));
        }

        let mut buf = [0u8; FILE_HEADER_SIZE];
        buf[..bytes.len()].copy_from_slice(bytes);
        buf[bytes.len()..total].copy_from_slice(&SECTION_TERMINATOR);

        // [total..512] — reserved, уже нули
        Ok(buf)
    }

    /// Десериализация заголовка из 512 байт.
    pub fn deserialize(buf: &[u8; FILE_HEADER_SIZE]) -> CphdResult<Self> {
        let end = buf
            .windows(SECTION_TERMINATOR.len())
            .position(|w| w == SECTION_TERMINATOR)
            .ok_or_else(|| CphdError::header("missing section terminator"))?;

        let text = std::str::from_utf8(&buf[..end])
            .map_err(|e| CphdError::header(format!("header is not UTF-8: {e}")))?;

        let mut lines = text.lines();
        let version = lines
            .next()
            .map(str::trim)
            .filter(|v| v.starts_with("CPHD/"))
            .ok_or_else(|| CphdError::header("missing CPHD version line"))?;

        let mut header = FileHeader {
            version: version.to_string(),
            ..FileHeader::default()
        };
        let mut seen = Vec::new();

        for line in lines.filter(|l| !l.trim().is_empty()) {
            let (key, value) = line
                .split_once(":=")
                .ok_or_else(|| CphdError::header(format!("malformed line '{line}'")))?;
            let (key, value) = (key.trim(), value.trim());

            match key {
                CLASSIFICATION => header.classification = value.to_string(),
                RELEASE_INFO => header.release_info = value.to_string(),
                _ => match header.numeric_field_mut(key) {
                    Some(field) => {
                        *field = value.parse().map_err(|e| {
                            CphdError::header(format!("{key} value '{value}': {e}"))
                        })?;
                    }
                    None => {
                        log::debug!("Ignoring unknown header key {key}");
                        continue;
                    }
                },
            }

            seen.push(key.to_string());
        }

        for key in [
            XML_BLOCK_SIZE,
            XML_BLOCK_BYTE_OFFSET,
            PVP_BLOCK_SIZE,
            PVP_BLOCK_BYTE_OFFSET,
            SIGNAL_BLOCK_SIZE,
            SIGNAL_BLOCK_BYTE_OFFSET,
            CLASSIFICATION,
            RELEASE_INFO,
        ] {
            if !seen.iter().any(|s| s == key) {
                return Err(CphdError::header(format!("missing key {key}")));
            }
        }

        Ok(header)
    }

    /// Читает и проверяет заголовок из начала потока.
    pub fn read_from<R: Read>(reader: &mut R) -> CphdResult<Self> {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        reader.read_exact(&mut buf)?;

        Self::deserialize(&buf)
    }

    /// Записывает 512 байт заголовка.
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
    ) -> CphdResult<()> {
        writer.write_all(&self.serialize()?)?;
        Ok(())
    }

    fn numeric_fields(&self) -> [(&'static str, u64); 8] {
        [
            (XML_BLOCK_SIZE, self.xml_block_size),
            (XML_BLOCK_BYTE_OFFSET, self.xml_block_byte_offset),
            (PVP_BLOCK_SIZE, self.pvp_block_size),
            (PVP_BLOCK_BYTE_OFFSET, self.pvp_block_byte_offset),
            (SUPPORT_BLOCK_SIZE, self.support_block_size),
            (SUPPORT_BLOCK_BYTE_OFFSET, self.support_block_byte_offset),
            (SIGNAL_BLOCK_SIZE, self.signal_block_size),
            (SIGNAL_BLOCK_BYTE_OFFSET, self.signal_block_byte_offset),
        ]
    }

    fn numeric_field_mut(
        &mut self,
        key: &str,
    ) -> Option<&mut u64> {
        match key {
            XML_BLOCK_SIZE => Some(&mut self.xml_block_size),
            XML_BLOCK_BYTE_OFFSET => Some(&mut self.xml_block_byte_offset),
            PVP_BLOCK_SIZE => Some(&mut self.pvp_block_size),
            PVP_BLOCK_BYTE_OFFSET => Some(&mut self.pvp_block_byte_offset),
            SUPPORT_BLOCK_SIZE => Some(&mut self.support_block_size),
            SUPPORT_BLOCK_BYTE_OFFSET => Some(&mut self.support_block_byte_offset),
            SIGNAL_BLOCK_SIZE => Some(&mut self.signal_block_size),
            SIGNAL_BLOCK_BYTE_OFFSET => Some(&mut self.signal_block_byte_offset),
            _ => None,
        }
    }
}
