//! Shared, immutable per-process state

use std::sync::Arc;

use vellum_css::{MASTER_CSS, Stylesheet, parse_stylesheet};

use crate::Config;

/// Master stylesheet and configuration shared by documents.
///
/// Built once, then handed to any number of documents on any thread.
#[derive(Debug, Clone)]
pub struct Context {
    master: Arc<Stylesheet>,
    config: Config,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Context {
    /// Context with the bundled master stylesheet
    pub fn new(config: Config) -> Self {
        Self::with_master_css(MASTER_CSS, config)
    }

    /// Context with a replacement master stylesheet
    pub fn with_master_css(css: &str, config: Config) -> Self {
        let master = parse_stylesheet(css);
        tracing::debug!(rules = master.len(), "master stylesheet loaded");
        Self { master: Arc::new(master), config }
    }

    pub fn master(&self) -> &Arc<Stylesheet> {
        &self.master
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
