/// Canonical 44-byte RIFF/WAVE header for integer PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    pub const SIZE: usize = 44;

    pub fn to_bytes(&self) -> Vec<u8> {
        let block_align = self.channels * (self.bits_per_sample / 8);
        let byte_rate = self.sample_rate * block_align as u32;

        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&self.data_size.wrapping_add(36).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&self.channels.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&self.bits_per_sample.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&self.data_size.to_le_bytes());
        out
    }
}
