//! NWA (RealLive PCM) decoding.
//!
//! An NWA stream is a 44-byte header followed either by raw PCM (compression
//! level -1) or by a table of block offsets and the delta-coded blocks they
//! point at. The decoder yields a WAV file: [`WavHeader`] then PCM samples,
//! decoding one block per refill.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use super::{DecodeError, DecodedStream, Decoder, WavHeader};

/// Longest stream accepted, in blocks.
const MAX_BLOCKS: i32 = 1_000_000;

/// Largest block accepted, in samples.
const MAX_BLOCK_SAMPLES: i32 = 1 << 20;

/// Samples per block assumed for uncompressed streams.
const RAW_BLOCK_SAMPLES: i32 = 65536;

/// Parsed and validated NWA header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NwaHeader {
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_rate: u32,
    /// -1 for raw PCM, otherwise 0..=5.
    pub compression_level: i32,
    pub use_run_length: bool,
    pub blocks: usize,
    /// PCM bytes after decoding.
    pub data_size: usize,
    /// Size of the whole compressed stream, header included.
    pub compressed_size: usize,
    pub sample_count: usize,
    /// Samples per block.
    pub block_size: usize,
    /// Samples in the last block.
    pub rest_size: usize,
}

impl NwaHeader {
    pub const SIZE: usize = 0x2c;

    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::SIZE {
            return Err(DecodeError::Truncated {
                needed: Self::SIZE,
                available: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let channels = cursor.read_i16::<LittleEndian>()?;
        let bits_per_sample = cursor.read_i16::<LittleEndian>()?;
        let sample_rate = cursor.read_i32::<LittleEndian>()?;
        let compression_level = cursor.read_i32::<LittleEndian>()?;
        let use_run_length = cursor.read_i32::<LittleEndian>()?;
        let mut blocks = cursor.read_i32::<LittleEndian>()?;
        let data_size = cursor.read_i32::<LittleEndian>()?;
        let compressed_size = cursor.read_i32::<LittleEndian>()?;
        let sample_count = cursor.read_i32::<LittleEndian>()?;
        let mut block_size = cursor.read_i32::<LittleEndian>()?;
        let mut rest_size = cursor.read_i32::<LittleEndian>()?;

        if channels != 1 && channels != 2 {
            return Err(DecodeError::InvalidHeader("channel count must be 1 or 2"));
        }
        if bits_per_sample != 8 && bits_per_sample != 16 {
            return Err(DecodeError::InvalidHeader("bits per sample must be 8 or 16"));
        }
        if !(-1..=5).contains(&compression_level) {
            return Err(DecodeError::Unsupported(format!(
                "compression level {compression_level}"
            )));
        }
        if sample_rate <= 0 {
            return Err(DecodeError::InvalidHeader("sample rate must be positive"));
        }
        if data_size < 0 || sample_count < 0 {
            return Err(DecodeError::InvalidHeader("negative data size"));
        }

        let bytes_per_sample = i32::from(bits_per_sample / 8);
        if i64::from(data_size) != i64::from(sample_count) * i64::from(bytes_per_sample) {
            return Err(DecodeError::InvalidHeader(
                "data size does not match sample count",
            ));
        }

        if compression_level == -1 {
            let raw_block_bytes = RAW_BLOCK_SAMPLES * bytes_per_sample;
            block_size = RAW_BLOCK_SAMPLES;
            rest_size = (data_size % raw_block_bytes) / bytes_per_sample;
            blocks = data_size / raw_block_bytes + i32::from(rest_size > 0);
        }
        if blocks <= 0 || blocks > MAX_BLOCKS {
            return Err(DecodeError::InvalidHeader("block count out of range"));
        }

        if compression_level != -1 {
            if block_size <= 0 || rest_size < 0 || rest_size > block_size {
                return Err(DecodeError::InvalidHeader("invalid block size"));
            }
            if block_size > MAX_BLOCK_SAMPLES {
                return Err(DecodeError::InvalidHeader("block size too large"));
            }
            let expected =
                i64::from(blocks - 1) * i64::from(block_size) + i64::from(rest_size);
            if expected != i64::from(sample_count) {
                return Err(DecodeError::InvalidHeader(
                    "block layout does not match sample count",
                ));
            }
            if (compressed_size as i64) < Self::SIZE as i64 {
                return Err(DecodeError::InvalidHeader("compressed size too small"));
            }
        }

        // All values were checked non-negative above.
        Ok(Self {
            channels: channels as u16,
            bits_per_sample: bits_per_sample as u16,
            sample_rate: sample_rate as u32,
            compression_level,
            use_run_length: use_run_length != 0,
            blocks: blocks as usize,
            data_size: data_size as usize,
            compressed_size: compressed_size.max(0) as usize,
            sample_count: sample_count as usize,
            block_size: block_size as usize,
            rest_size: rest_size as usize,
        })
    }

    pub fn is_compressed(&self) -> bool {
        self.compression_level != -1
    }

    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample / 8)
    }

    pub fn wav_header(&self) -> WavHeader {
        WavHeader {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            data_size: self.data_size as u32,
        }
    }

    /// Samples decoded from block `block`.
    fn block_samples(&self, block: usize) -> usize {
        if block + 1 == self.blocks {
            self.rest_size
        } else {
            self.block_size
        }
    }

    /// Read the absolute offset of every compressed block.
    fn block_offsets(&self, data: &[u8]) -> Result<Vec<usize>, DecodeError> {
        let table_end = Self::SIZE + self.blocks * 4;
        if data.len() < table_end {
            return Err(DecodeError::Truncated {
                needed: table_end,
                available: data.len(),
            });
        }
        if data.len() < self.compressed_size {
            return Err(DecodeError::Truncated {
                needed: self.compressed_size,
                available: data.len(),
            });
        }

        let mut cursor = Cursor::new(&data[Self::SIZE..table_end]);
        let mut offsets = Vec::with_capacity(self.blocks);
        let mut previous = table_end;
        for _ in 0..self.blocks {
            let offset = usize::try_from(cursor.read_i32::<LittleEndian>()?)
                .map_err(|_| DecodeError::InvalidHeader("negative block offset"))?;
            if offset < previous || offset >= self.compressed_size {
                return Err(DecodeError::InvalidHeader("block offset out of range"));
            }
            offsets.push(offset);
            previous = offset;
        }
        Ok(offsets)
    }
}

/// Decoder for NWA streams, producing WAV output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NwaDecoder;

impl Decoder for NwaDecoder {
    fn decode(&self, input: Arc<[u8]>) -> Result<DecodedStream, DecodeError> {
        let header = NwaHeader::parse(&input)?;

        let body = if header.is_compressed() {
            Body::Blocks {
                offsets: header.block_offsets(&input)?,
                next: 0,
            }
        } else {
            let end = NwaHeader::SIZE + header.data_size;
            if input.len() < end {
                return Err(DecodeError::Truncated {
                    needed: end,
                    available: input.len(),
                });
            }
            Body::Raw {
                next: NwaHeader::SIZE,
                end,
            }
        };

        Ok(Box::new(NwaStream {
            buf: header.wav_header().to_bytes(),
            pos: 0,
            input,
            header,
            body,
        }))
    }
}

enum Body {
    Raw { next: usize, end: usize },
    Blocks { offsets: Vec<usize>, next: usize },
}

struct NwaStream {
    input: Arc<[u8]>,
    header: NwaHeader,
    body: Body,
    buf: Vec<u8>,
    pos: usize,
}

impl NwaStream {
    /// Load the next chunk of output into `buf`. Returns false at end of stream.
    fn refill(&mut self) -> Result<bool, DecodeError> {
        self.buf.clear();
        self.pos = 0;

        match &mut self.body {
            Body::Raw { next, end } => {
                if *next == *end {
                    return Ok(false);
                }
                let chunk_end =
                    (*next + RAW_BLOCK_SAMPLES as usize * self.header.bytes_per_sample()).min(*end);
                self.buf.extend_from_slice(&self.input[*next..chunk_end]);
                *next = chunk_end;
            }
            Body::Blocks { offsets, next } => {
                let block = *next;
                if block == offsets.len() {
                    return Ok(false);
                }
                let start = offsets[block];
                let end = offsets
                    .get(block + 1)
                    .copied()
                    .unwrap_or(self.header.compressed_size);
                decode_block(
                    &self.header,
                    block,
                    &self.input[start..end],
                    self.header.block_samples(block),
                    &mut self.buf,
                )?;
                *next += 1;
            }
        }
        Ok(true)
    }
}

impl Read for NwaStream {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        while self.pos == self.buf.len() {
            if !self.refill().map_err(DecodeError::into_io)? {
                return Ok(0);
            }
        }
        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Little-endian bit reader; reads past the end yield zero bits.
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read(&mut self, bits: u32) -> u32 {
        let byte = self.pos / 8;
        let shift = self.pos % 8;
        let lo = u32::from(self.data.get(byte).copied().unwrap_or(0));
        let hi = u32::from(self.data.get(byte + 1).copied().unwrap_or(0));
        self.pos += bits as usize;
        ((lo | (hi << 8)) >> shift) & ((1 << bits) - 1)
    }

    fn exhausted(&self) -> bool {
        self.pos / 8 >= self.data.len()
    }
}

/// (bit width, shift) of a delta for type code `code` at compression `level`.
fn delta_params(level: i32, code: u32) -> (u32, u32) {
    let level = level as u32;
    match (code, level >= 3) {
        (7, true) => (8, 9),
        (7, false) => (8 - level, 9 + level),
        (_, true) => (level + 3, 1 + code),
        (_, false) => (5 - level, 2 + code + level),
    }
}

fn apply_delta(bits: &mut BitReader<'_>, predictor: &mut i32, width: u32, shift: u32) {
    let sign = 1u32 << (width - 1);
    let value = bits.read(width);
    let magnitude = ((value & (sign - 1)) << shift) as i32;
    if value & sign != 0 {
        *predictor = predictor.wrapping_sub(magnitude);
    } else {
        *predictor = predictor.wrapping_add(magnitude);
    }
}

fn decode_block(
    header: &NwaHeader,
    block: usize,
    data: &[u8],
    samples: usize,
    out: &mut Vec<u8>,
) -> Result<(), DecodeError> {
    let width = header.bytes_per_sample();
    let channels = usize::from(header.channels);
    let seed_len = width * channels;
    if data.len() < seed_len {
        return Err(DecodeError::CorruptBlock {
            block,
            reason: "missing predictor seed",
        });
    }

    let mut predictor = [0i32; 2];
    for (channel, seed) in data[..seed_len].chunks_exact(width).enumerate() {
        predictor[channel] = match width {
            1 => i32::from(seed[0] as i8),
            _ => i32::from(i16::from_le_bytes([seed[0], seed[1]])),
        };
    }

    out.reserve(samples * width);
    let start = out.len();
    let mut bits = BitReader::new(&data[seed_len..]);
    let mut channel = 0;
    let mut run = 0u32;

    for _ in 0..samples {
        if run == 0 {
            // A pending run still repeats after the last code byte.
            if bits.exhausted() {
                break;
            }
            match bits.read(3) {
                7 => {
                    if bits.read(1) == 1 {
                        predictor[channel] = 0;
                    } else {
                        let (w, s) = delta_params(header.compression_level, 7);
                        apply_delta(&mut bits, &mut predictor[channel], w, s);
                    }
                }
                0 => {
                    if header.use_run_length {
                        run = bits.read(1);
                        if run == 1 {
                            run = bits.read(2);
                            if run == 3 {
                                run = bits.read(8);
                            }
                        }
                    }
                }
                code => {
                    let (w, s) = delta_params(header.compression_level, code);
                    apply_delta(&mut bits, &mut predictor[channel], w, s);
                }
            }
        } else {
            run -= 1;
        }

        match width {
            1 => out.push(predictor[channel] as u8),
            _ => out.extend_from_slice(&(predictor[channel] as i16).to_le_bytes()),
        }
        if channels == 2 {
            channel ^= 1;
        }
    }

    // Blocks whose bit stream ends early are padded with silence.
    out.resize(start + samples * width, 0);
    Ok(())
}
