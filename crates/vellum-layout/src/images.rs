//! Image request bookkeeping
//!
//! Each URL is requested from the host once. Pending requests stay
//! zero-sized until the host completes them.

use std::collections::HashMap;

use crate::{ImageStatus, LayoutHost, RequestId, Size};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageState {
    Pending(RequestId),
    Ready(Size),
    Failed,
}

impl ImageState {
    /// Size to lay the image out with, if known
    pub fn size(&self) -> Option<Size> {
        match self {
            ImageState::Ready(size) => Some(*size),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<String, ImageState>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `url`, asking the host on first use
    pub fn resolve(&mut self, host: &dyn LayoutHost, url: &str) -> ImageState {
        if let Some(state) = self.entries.get(url) {
            return *state;
        }
        let state = match host.load_image(url) {
            ImageStatus::Ready(size) => ImageState::Ready(size),
            ImageStatus::Pending(id) => {
                tracing::debug!(url, request = id.0, "image pending");
                ImageState::Pending(id)
            }
            ImageStatus::Failed => {
                tracing::warn!(url, "image failed to load");
                ImageState::Failed
            }
        };
        self.entries.insert(url.to_string(), state);
        state
    }

    pub fn get(&self, url: &str) -> Option<ImageState> {
        self.entries.get(url).copied()
    }

    /// Mark a pending request as loaded; returns false for unknown requests
    pub fn complete(&mut self, request: RequestId, size: Size) -> bool {
        let mut found = false;
        for state in self.entries.values_mut() {
            if *state == ImageState::Pending(request) {
                *state = ImageState::Ready(size);
                found = true;
            }
        }
        found
    }

    /// Number of requests still outstanding
    pub fn pending(&self) -> usize {
        self.entries.values().filter(|s| matches!(s, ImageState::Pending(_))).count()
    }
}
