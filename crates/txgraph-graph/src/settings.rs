use crate::adapter::ParallelEdgePolicy;
use crate::interaction::InteractionConfig;
use crate::layout::LayoutConfig;
use crate::style::EncodingConfig;
use crate::viewport::ViewportConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use txgraph_core::{GraphError, GraphResult};

const APP_DIR: &str = "txgraph";
const SETTINGS_FILE: &str = "graph_view.json";

/// Every tunable of the graph view. Missing sections and fields take their
/// defaults, so partial files are valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphViewSettings {
    pub encoding: EncodingConfig,
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub interaction: InteractionConfig,
    pub parallel_edges: ParallelEdgePolicy,
}

impl GraphViewSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Loads from the user config directory, falling back to defaults.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::info!("No config directory, using default graph settings");
                Self::default()
            }
        }
    }

    /// Loads from `path`. Missing, unreadable or invalid files give defaults.
    pub fn load_from(path: &Path) -> Self {
        tracing::info!("Loading graph settings from {:?}", path);
        if !path.exists() {
            tracing::info!("Settings file not found, using defaults");
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_json_str(&content) {
                Ok(settings) => {
                    tracing::debug!("Graph settings loaded: {:?}", settings);
                    settings
                }
                Err(e) => {
                    tracing::error!("Failed to parse graph settings: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!("Failed to read graph settings file: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_json_str(json: &str) -> GraphResult<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| GraphError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> GraphResult<()> {
        let encoding = &self.encoding;
        if encoding.min_node_size > encoding.max_node_size {
            return Err(GraphError::Settings(
                "minNodeSize exceeds maxNodeSize".to_string(),
            ));
        }
        if encoding.min_opacity > encoding.max_opacity {
            return Err(GraphError::Settings(
                "minOpacity exceeds maxOpacity".to_string(),
            ));
        }
        if encoding.min_edge_width > encoding.max_edge_width {
            return Err(GraphError::Settings(
                "minEdgeWidth exceeds maxEdgeWidth".to_string(),
            ));
        }
        if encoding.edge_width_divisor <= 0.0 {
            return Err(GraphError::Settings(
                "edgeWidthDivisor must be positive".to_string(),
            ));
        }
        let viewport = &self.viewport;
        if viewport.min_zoom <= 0.0 || viewport.min_zoom > viewport.max_zoom {
            return Err(GraphError::Settings(format!(
                "invalid zoom range [{}, {}]",
                viewport.min_zoom, viewport.max_zoom
            )));
        }
        if self.layout.timeout_ms == 0 {
            return Err(GraphError::Settings(
                "layout timeoutMs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> GraphResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| GraphError::Settings(e.to_string()))?;
        }
        let content =
            serde_json::to_string_pretty(self).map_err(|e| GraphError::Settings(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| GraphError::Settings(e.to_string()))
    }

    pub fn save(&self) -> GraphResult<()> {
        let path = Self::default_path()
            .ok_or_else(|| GraphError::Settings("no config directory".to_string()))?;
        self.save_to(&path)
    }
}
