// Catalog change events, drained by the host with Catalog::take_events()

use serde::Serialize;

use super::FileKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CatalogEvent {
    Rescanned {
        video_count: usize,
    },
    VideoAdded {
        base_name: String,
    },
    VideoUpdated {
        base_name: String,
    },
    VideoRemoved {
        base_name: String,
    },
    FileAdded {
        base_name: String,
        name: String,
        kind: FileKind,
    },
    ReframeAdded {
        base_name: String,
        reframe_name: String,
    },
    ReframeUpdated {
        base_name: String,
        old_reframe_name: String,
        reframe_name: String,
    },
    ReframeRemoved {
        base_name: String,
        reframe_name: String,
    },
}

impl CatalogEvent {
    pub fn base_name(&self) -> Option<&str> {
        match self {
            CatalogEvent::Rescanned { .. } => None,
            CatalogEvent::VideoAdded { base_name }
            | CatalogEvent::VideoUpdated { base_name }
            | CatalogEvent::VideoRemoved { base_name }
            | CatalogEvent::FileAdded { base_name, .. }
            | CatalogEvent::ReframeAdded { base_name, .. }
            | CatalogEvent::ReframeUpdated { base_name, .. }
            | CatalogEvent::ReframeRemoved { base_name, .. } => Some(base_name),
        }
    }
}
