//! Builds bundles in memory for tests and benches.
#![allow(dead_code)]

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

pub const FLAG_ALIGN: i32 = 0x4000;

/// One type tree record
#[derive(Debug, Clone)]
pub struct Node {
    pub depth: u8,
    pub type_name: String,
    pub name: String,
    pub size: i32,
    pub flags: i32,
    pub is_array: bool,
}

pub fn node(depth: u8, type_name: &str, name: &str, size: i32) -> Node {
    Node {
        depth,
        type_name: type_name.into(),
        name: name.into(),
        size,
        flags: 0,
        is_array: false,
    }
}

impl Node {
    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn aligned(mut self) -> Self {
        self.flags |= FLAG_ALIGN;
        self
    }
}

/// `MyObject { int a; int b; vector bytes<UInt8> }`
pub fn sample_schema() -> Vec<Node> {
    vec![
        node(0, "MyObject", "Base", -1),
        node(1, "int", "a", 4),
        node(1, "int", "b", 4),
        node(1, "vector", "bytes", -1).aligned(),
        node(2, "Array", "Array", -1).array(),
        node(3, "int", "size", 4),
        node(3, "UInt8", "data", 1),
    ]
}

/// `Link { PPtr<Object> target }`, pointer ids are 8 bytes from format 14
pub fn link_schema() -> Vec<Node> {
    vec![
        node(0, "Link", "Base", -1),
        node(1, "PPtr<Object>", "target", 12),
        node(2, "int", "m_FileID", 4),
        node(2, "SInt64", "m_PathID", 8),
    ]
}

/// Little endian data for [`sample_schema`]
pub fn sample_data(a: i32, b: i32, bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_i32::<LittleEndian>(a).unwrap();
    out.write_i32::<LittleEndian>(b).unwrap();
    out.write_i32::<LittleEndian>(bytes.len() as i32).unwrap();
    out.extend_from_slice(bytes);
    pad(&mut out, 4);
    out
}

/// Little endian data for [`link_schema`]
pub fn link_data(file_id: i32, path_id: i64) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_i32::<LittleEndian>(file_id).unwrap();
    out.write_i64::<LittleEndian>(path_id).unwrap();
    out
}

fn pad(out: &mut Vec<u8>, alignment: usize) {
    while out.len() % alignment != 0 {
        out.push(0);
    }
}

fn write_tree<E: ByteOrder>(out: &mut Vec<u8>, nodes: &[Node]) {
    let mut strings = Vec::new();
    let mut intern = |s: &str| {
        let offset = strings.len() as i32;
        strings.extend_from_slice(s.as_bytes());
        strings.push(0);
        offset
    };

    let mut records = Vec::new();
    for (i, n) in nodes.iter().enumerate() {
        records.write_i16::<E>(1).unwrap();
        records.write_u8(n.depth).unwrap();
        records.write_u8(n.is_array as u8).unwrap();
        records.write_i32::<E>(intern(&n.type_name)).unwrap();
        records.write_i32::<E>(intern(&n.name)).unwrap();
        records.write_i32::<E>(n.size).unwrap();
        records.write_i32::<E>(i as i32).unwrap();
        records.write_i32::<E>(n.flags).unwrap();
    }

    out.write_u32::<E>(nodes.len() as u32).unwrap();
    out.write_u32::<E>(strings.len() as u32).unwrap();
    out.extend_from_slice(&records);
    out.extend_from_slice(&strings);
}

/// A serialized member
///
/// Object data is written as given, so it has to match the member's endianness.
#[derive(Debug, Clone)]
pub struct MemberBuilder {
    pub format: i32,
    pub big_endian: bool,
    pub long_ids: bool,
    pub types: Vec<(i32, Vec<Node>)>,
    pub objects: Vec<(i64, i32, Vec<u8>)>,
    pub refs: Vec<String>,
}

impl MemberBuilder {
    pub fn new(format: i32) -> Self {
        Self {
            format,
            big_endian: false,
            long_ids: false,
            types: Vec::new(),
            objects: Vec::new(),
            refs: Vec::new(),
        }
    }

    pub fn with_type(mut self, class_id: i32, nodes: Vec<Node>) -> Self {
        self.types.push((class_id, nodes));
        self
    }

    pub fn with_object(mut self, path_id: i64, class_id: i32, data: Vec<u8>) -> Self {
        self.objects.push((path_id, class_id, data));
        self
    }

    pub fn with_ref(mut self, file_path: &str) -> Self {
        self.refs.push(file_path.into());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        if self.big_endian {
            self.build_with::<BigEndian>()
        } else {
            self.build_with::<LittleEndian>()
        }
    }

    fn build_with<E: ByteOrder>(&self) -> Vec<u8> {
        let format = self.format;
        let mut out = vec![0; 16];
        if format >= 9 {
            out.extend_from_slice(&[self.big_endian as u8, 0, 0, 0]);
        }
        let metadata_start = out.len();

        out.extend_from_slice(b"2019.4.31f1\0");
        out.write_u32::<E>(19).unwrap();
        if format >= 13 {
            out.write_u8(1).unwrap();
            out.write_i32::<E>(self.types.len() as i32).unwrap();
            for (class_id, nodes) in &self.types {
                out.write_i32::<E>(*class_id).unwrap();
                if format >= 17 {
                    out.write_u8(0).unwrap();
                    out.write_i16::<E>(-1).unwrap();
                }
                out.extend_from_slice(&[0x5A; 16]);
                write_tree::<E>(&mut out, nodes);
            }
        } else {
            out.write_i32::<E>(self.types.len() as i32).unwrap();
            for (class_id, nodes) in &self.types {
                out.write_i32::<E>(*class_id).unwrap();
                write_tree::<E>(&mut out, nodes);
            }
        }

        if (7..=13).contains(&format) {
            out.write_i32::<E>(self.long_ids as i32).unwrap();
        }
        let wide = self.long_ids || format >= 14;

        out.write_i32::<E>(self.objects.len() as i32).unwrap();
        let mut offset = 0u32;
        for (path_id, class_id, data) in &self.objects {
            if format >= 14 {
                pad(&mut out, 4);
            }
            if wide {
                out.write_i64::<E>(*path_id).unwrap();
            } else {
                out.write_i32::<E>(*path_id as i32).unwrap();
            }
            out.write_u32::<E>(offset).unwrap();
            out.write_u32::<E>(data.len() as u32).unwrap();
            if format >= 17 {
                let index = self
                    .types
                    .iter()
                    .position(|(id, _)| id == class_id)
                    .expect("object type declared");
                out.write_i32::<E>(index as i32).unwrap();
            } else {
                out.write_i32::<E>(*class_id).unwrap();
                out.write_i16::<E>(*class_id as i16).unwrap();
            }
            let padding = match format {
                i32::MIN..=10 => 2,
                11..=14 => 2,
                15..=16 => 3,
                _ => 0,
            };
            out.extend(std::iter::repeat(0).take(padding));
            offset += data.len() as u32;
            pad_offset(&mut offset);
        }

        if format >= 15 {
            out.write_i32::<E>(0).unwrap();
            pad(&mut out, 4);
        }

        if format >= 6 {
            out.write_i32::<E>(self.refs.len() as i32).unwrap();
            for file_path in &self.refs {
                out.push(0);
                out.extend_from_slice(&[0x22; 16]);
                out.write_i32::<E>(0).unwrap();
                out.extend_from_slice(file_path.as_bytes());
                out.push(0);
            }
        }
        out.push(0);

        let metadata_size = out.len() - metadata_start;
        pad(&mut out, 16);
        let data_offset = out.len();
        for (_, _, data) in &self.objects {
            out.extend_from_slice(data);
            pad(&mut out, 8);
        }

        let mut header = Vec::new();
        header.write_i32::<BigEndian>(metadata_size as i32).unwrap();
        header.write_i32::<BigEndian>(out.len() as i32).unwrap();
        header.write_i32::<BigEndian>(format).unwrap();
        header.write_i32::<BigEndian>(data_offset as i32).unwrap();
        out[..16].copy_from_slice(&header);
        out
    }
}

fn pad_offset(offset: &mut u32) {
    *offset = (*offset + 7) & !7;
}

/// Block compression used by [`BundleBuilder`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Codec {
    None,
    Lzma,
    Lz4,
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Codec {
    fn code(self) -> u32 {
        match self {
            Codec::None => 0,
            Codec::Lzma => 1,
            Codec::Lz4 => 2,
        }
    }

    fn compress(self, data: &[u8]) -> Vec<u8> {
        match self {
            Codec::None => data.to_vec(),
            Codec::Lz4 => lz4_flex::block::compress(data),
            Codec::Lzma => {
                let mut out = Vec::new();
                lzma_rs::lzma_compress_with_options(
                    &mut std::io::Cursor::new(data),
                    &mut out,
                    &lzma_rs::compress::Options {
                        unpacked_size: lzma_rs::compress::UnpackedSize::SkipWritingToHeader,
                    },
                )
                .unwrap();
                out
            }
        }
    }
}

/// How the logical stream is cut into blocks
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Blocks {
    /// Fixed size chunks of the concatenated stream
    Chunks(usize),
    /// One block per member
    PerMember,
}

/// A bundle archive
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    pub signature: String,
    pub members: Vec<(String, Vec<u8>)>,
    pub blocks: Blocks,
    pub codec: Codec,
    pub info_codec: Codec,
    pub info_at_end: bool,
}

impl Default for BundleBuilder {
    fn default() -> Self {
        Self {
            signature: "UnityFS".into(),
            members: Vec::new(),
            blocks: Blocks::PerMember,
            codec: Codec::None,
            info_codec: Codec::None,
            info_at_end: false,
        }
    }
}

impl BundleBuilder {
    pub fn with_member(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.members.push((name.into(), bytes));
        self
    }

    /// Uncompressed sizes of the blocks the stream is cut into
    pub fn block_sizes(&self) -> Vec<usize> {
        match self.blocks {
            Blocks::PerMember => self.members.iter().map(|(_, b)| b.len()).collect(),
            Blocks::Chunks(size) => {
                let total: usize = self.members.iter().map(|(_, b)| b.len()).sum();
                let mut sizes = vec![size; total / size];
                if total % size != 0 {
                    sizes.push(total % size);
                }
                sizes
            }
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let stream: Vec<u8> = self.members.iter().flat_map(|(_, b)| b.clone()).collect();

        let mut blocks = Vec::new();
        let mut data = Vec::new();
        let mut start = 0;
        for size in self.block_sizes() {
            let compressed = self.codec.compress(&stream[start..start + size]);
            blocks.push((size as u32, compressed.len() as u32));
            data.extend_from_slice(&compressed);
            start += size;
        }

        let mut info = vec![0x42; 16];
        info.write_u32::<BigEndian>(blocks.len() as u32).unwrap();
        for (uncompressed, compressed) in &blocks {
            info.write_u32::<BigEndian>(*uncompressed).unwrap();
            info.write_u32::<BigEndian>(*compressed).unwrap();
            info.write_u16::<BigEndian>(self.codec.code() as u16 | 0x40).unwrap();
        }
        info.write_u32::<BigEndian>(self.members.len() as u32).unwrap();
        let mut offset = 0i64;
        for (name, bytes) in &self.members {
            info.write_i64::<BigEndian>(offset).unwrap();
            info.write_i64::<BigEndian>(bytes.len() as i64).unwrap();
            info.write_u32::<BigEndian>(4).unwrap();
            info.extend_from_slice(name.as_bytes());
            info.push(0);
            offset += bytes.len() as i64;
        }
        let info_compressed = self.info_codec.compress(&info);

        let mut flags = self.info_codec.code() | 0x40;
        if self.info_at_end {
            flags |= 0x80;
        }

        let mut out = self.signature.as_bytes().to_vec();
        out.push(0);
        out.write_u32::<BigEndian>(6).unwrap();
        out.extend_from_slice(b"5.x.x\0");
        out.extend_from_slice(b"2019.4.31f1\0");
        let size_at = out.len();
        out.write_i64::<BigEndian>(0).unwrap();
        out.write_u32::<BigEndian>(info_compressed.len() as u32).unwrap();
        out.write_u32::<BigEndian>(info.len() as u32).unwrap();
        out.write_u32::<BigEndian>(flags).unwrap();

        if self.info_at_end {
            out.extend_from_slice(&data);
            out.extend_from_slice(&info_compressed);
        } else {
            out.extend_from_slice(&info_compressed);
            out.extend_from_slice(&data);
        }

        let total = out.len() as i64;
        out[size_at..size_at + 8].copy_from_slice(&total.to_be_bytes());
        out
    }
}
