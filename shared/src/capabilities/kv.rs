use thiserror::Error;

use crate::model::Section;

/// Key under which the last active tab is remembered across launches.
pub const ACTIVE_SECTION_KEY: &str = "settings:active_section";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    #[error("stored value could not be decoded: {message}")]
    Decode { message: String },

    #[error("unknown section '{0}'")]
    UnknownSection(String),
}

pub fn encode_section(section: Section) -> Result<Vec<u8>, KvError> {
    serde_json::to_vec(section.as_str()).map_err(|e| KvError::Decode {
        message: e.to_string(),
    })
}

/// Accepts both the JSON string written by `encode_section` and a bare
/// UTF-8 section name as older web builds stored it.
pub fn decode_section(bytes: &[u8]) -> Result<Section, KvError> {
    let raw = match serde_json::from_slice::<String>(bytes) {
        Ok(raw) => raw,
        Err(_) => std::str::from_utf8(bytes)
            .map_err(|e| KvError::Decode {
                message: e.to_string(),
            })?
            .trim()
            .to_string(),
    };
    Section::parse(&raw).ok_or(KvError::UnknownSection(raw))
}
