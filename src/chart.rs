use base64::{engine::general_purpose::STANDARD, Engine as _};
use iced::widget::image::Handle;
use std::collections::{HashMap, HashSet};

/// Decode a `data:image/...;base64,` chart reference into raw image bytes.
/// Anything else (plain URLs, other encodings) is not decodable here.
pub fn decode_data_uri(reference: &str) -> Option<Vec<u8>> {
    let rest = reference.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.starts_with("image/") || !meta.ends_with(";base64") {
        return None;
    }
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).ok()
}

/// Image handles for chart references, decoded once and reused across frames.
#[derive(Debug, Default)]
pub struct ChartCache {
    handles: HashMap<String, Handle>,
}

impl ChartCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and keep `reference` if it is a data URI. Returns whether an
    /// image is available for it afterwards.
    pub fn remember(&mut self, reference: &str) -> bool {
        if self.handles.contains_key(reference) {
            return true;
        }
        match decode_data_uri(reference) {
            Some(bytes) => {
                self.handles
                    .insert(reference.to_string(), Handle::from_bytes(bytes));
                true
            }
            None => false,
        }
    }

    pub fn get(&self, reference: &str) -> Option<&Handle> {
        self.handles.get(reference)
    }

    /// Drop every handle whose reference is not in `live`.
    pub fn retain_live<'a>(&mut self, live: impl IntoIterator<Item = &'a str>) {
        let live: HashSet<&str> = live.into_iter().collect();
        self.handles.retain(|reference, _| live.contains(reference.as_str()));
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.handles.len()
    }
}
