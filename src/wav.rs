//! WAV encoder: 16-bit linear PCM in a standard 44-byte RIFF/WAVE container.

const BITS_PER_SAMPLE: u16 = 16;
const HEADER_LEN: usize = 44;

/// Convert a float sample to int16: clamp to `[-1, 1]`, scale by 32767, round.
///
/// NaN encodes as silence.
pub fn to_pcm16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Encode mono samples.
pub fn encode_mono(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let pcm: Vec<i16> = samples.iter().map(|&s| to_pcm16(s)).collect();
    encode_pcm16(&pcm, sample_rate, 1)
}

/// Encode two parallel channels, interleaved left/right per frame.
///
/// If the channels differ in length the shorter one is padded with silence.
pub fn encode_stereo(left: &[f32], right: &[f32], sample_rate: u32) -> Vec<u8> {
    let frames = left.len().max(right.len());
    let mut pcm = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        pcm.push(to_pcm16(left.get(i).copied().unwrap_or(0.0)));
        pcm.push(to_pcm16(right.get(i).copied().unwrap_or(0.0)));
    }
    encode_pcm16(&pcm, sample_rate, 2)
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
pub fn encode_pcm16(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * block_align as u32;
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(HEADER_LEN + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

/// Playback length of `frames` at `sample_rate`, rounded to whole milliseconds.
pub fn duration_ms(frames: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    (frames as f64 / sample_rate as f64 * 1000.0).round() as u64
}
