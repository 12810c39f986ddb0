use base64::Engine;

/// Scale between a signed 16-bit sample and the normalized float range.
pub const PCM16_SCALE: f32 = 32768.0;

/// Decodes a base64 fragment into raw little-endian PCM16 bytes.
pub fn decode_pcm16(base64_fragment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(base64_fragment)
}

/// Encodes a slice of i16 samples into a base64 string.
pub fn encode_i16(pcm16: &[i16]) -> String {
    base64::engine::general_purpose::STANDARD.encode(pcm16.to_binary())
}

/// Converts one PCM16 sample to a float in [-1, 1).
pub fn sample_to_f32(sample: i16) -> f32 {
    f32::from(sample) / PCM16_SCALE
}

/// Converts little-endian PCM16 bytes to f32 samples. A trailing odd byte is ignored.
pub fn pcm16_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| sample_to_f32(i16::from_le_bytes([chunk[0], chunk[1]])))
        .collect()
}

/// Converts a slice of i16 samples to a vector of f32 samples.
pub fn convert_i16_to_f32(pcm16: &[i16]) -> Vec<f32> {
    pcm16.iter().map(|&sample| sample_to_f32(sample)).collect()
}

/// A trait for converting audio sample types to a binary representation (Vec<u8>).
pub trait ToBinary {
    fn to_binary(&self) -> Vec<u8>;
}

impl ToBinary for [i16] {
    fn to_binary(&self) -> Vec<u8> {
        self.iter()
            .flat_map(|&sample| sample.to_le_bytes())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes_stay_in_range() {
        let samples = convert_i16_to_f32(&[i16::MIN, 0, i16::MAX]);
        assert_eq!(samples[0], -1.0);
        assert_eq!(samples[1], 0.0);
        assert!(samples[2] < 1.0);
        assert_eq!(samples[2], 32767.0 / 32768.0);
    }

    #[test]
    fn base64_fragment_decodes_to_le_bytes() {
        let encoded = encode_i16(&[1, -2]);
        let bytes = decode_pcm16(&encoded).unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0xFE, 0xFF]);
        assert_eq!(pcm16_bytes_to_f32(&bytes), convert_i16_to_f32(&[1, -2]));
    }

    #[test]
    fn odd_trailing_byte_is_ignored() {
        assert_eq!(pcm16_bytes_to_f32(&[0x00, 0x40, 0x7F]), vec![0.5]);
    }

    #[test]
    fn invalid_base64_is_an_error() {
        assert!(decode_pcm16("not base64!").is_err());
    }
}
