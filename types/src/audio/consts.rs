use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Sample rate the agent uses when the metadata does not say otherwise.
pub const DEFAULT_PCM_SAMPLE_RATE: u32 = 16000;

/// Audio encoding announced in the conversation metadata, e.g. "pcm_16000".
#[derive(Debug, Clone, PartialEq)]
pub enum AudioFormat {
    Pcm(u32),
    Ulaw(u32),
    Custom(String),
}

impl AudioFormat {
    pub fn sample_rate(&self) -> Option<u32> {
        match self {
            AudioFormat::Pcm(rate) | AudioFormat::Ulaw(rate) => Some(*rate),
            AudioFormat::Custom(_) => None,
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        AudioFormat::Pcm(DEFAULT_PCM_SAMPLE_RATE)
    }
}

impl Serialize for AudioFormat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            AudioFormat::Pcm(rate) => serializer.serialize_str(&format!("pcm_{rate}")),
            AudioFormat::Ulaw(rate) => serializer.serialize_str(&format!("ulaw_{rate}")),
            AudioFormat::Custom(s) => serializer.serialize_str(s),
        }
    }
}

impl FromStr for AudioFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = s.split_once('_').and_then(|(codec, rate)| {
            let rate = rate.parse::<u32>().ok()?;
            match codec {
                "pcm" => Some(AudioFormat::Pcm(rate)),
                "ulaw" => Some(AudioFormat::Ulaw(rate)),
                _ => None,
            }
        });
        Ok(parsed.unwrap_or_else(|| AudioFormat::Custom(s.to_string())))
    }
}

impl<'de> Deserialize<'de> for AudioFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(AudioFormat::from_str(&s).unwrap_or_else(|never| match never {}))
    }
}

#[cfg(test)]
mod test {

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct AudioConsts {
        #[serde(skip_serializing_if = "Option::is_none")]
        audio_format: Option<super::AudioFormat>,
    }

    #[test]
    fn test_serialize() {
        let consts = AudioConsts {
            audio_format: Some(super::AudioFormat::Pcm(16000)),
        };
        let json = serde_json::to_string(&consts).unwrap();
        assert_eq!(json, r#"{"audio_format":"pcm_16000"}"#);

        let consts = AudioConsts {
            audio_format: Some(super::AudioFormat::Ulaw(8000)),
        };
        let json = serde_json::to_string(&consts).unwrap();
        assert_eq!(json, r#"{"audio_format":"ulaw_8000"}"#);

        let consts = AudioConsts { audio_format: None };
        let json = serde_json::to_string(&consts).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_deserialize() {
        let json = r#"{"audio_format":"pcm_24000"}"#;
        let consts: AudioConsts = serde_json::from_str(json).unwrap();
        assert_eq!(consts.audio_format, Some(super::AudioFormat::Pcm(24000)));
        assert_eq!(consts.audio_format.unwrap().sample_rate(), Some(24000));

        let json = r#"{"audio_format":"opus_48000_64"}"#;
        let consts: AudioConsts = serde_json::from_str(json).unwrap();
        assert_eq!(
            consts.audio_format,
            Some(super::AudioFormat::Custom("opus_48000_64".to_string()))
        );

        let json = r#"{"audio_format":"pcm_fast"}"#;
        let consts: AudioConsts = serde_json::from_str(json).unwrap();
        assert_eq!(
            consts.audio_format,
            Some(super::AudioFormat::Custom("pcm_fast".to_string()))
        );
    }
}
