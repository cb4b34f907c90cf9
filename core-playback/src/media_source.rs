//! Opaque media source handles passed to the playback engine.

use crate::classifier::ContentType;
use crate::datasource::{DataSource, DataSourceFactory, DataSpec};
use crate::error::{PlaybackError, Result};
use crate::media_item::MediaItem;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Streaming protocols the engine opens with its own transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Rtmp,
    Rtsp,
}

impl Protocol {
    pub fn from_content_type(content_type: ContentType) -> Option<Self> {
        match content_type {
            ContentType::Rtmp => Some(Protocol::Rtmp),
            ContentType::Rtsp => Some(Protocol::Rtsp),
            _ => None,
        }
    }
}

/// Where the engine gets bytes from.
#[derive(Clone)]
pub enum SourceUpstream {
    /// Engine-native transport; no data source chain.
    Native(Protocol),
    /// Data source chain built by the helper.
    Chain(Arc<dyn DataSourceFactory>),
}

impl fmt::Debug for SourceUpstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceUpstream::Native(protocol) => f.debug_tuple("Native").field(protocol).finish(),
            SourceUpstream::Chain(factory) => f.debug_tuple("Chain").field(factory).finish(),
        }
    }
}

/// Immutable description of one playable item.
#[derive(Debug, Clone)]
pub struct MediaSource {
    id: Uuid,
    content_type: ContentType,
    item: MediaItem,
    upstream: SourceUpstream,
}

impl MediaSource {
    /// Source for RTMP/RTSP items.
    pub fn native(item: MediaItem, protocol: Protocol) -> Self {
        let content_type = match protocol {
            Protocol::Rtmp => ContentType::Rtmp,
            Protocol::Rtsp => ContentType::Rtsp,
        };
        Self {
            id: Uuid::new_v4(),
            content_type,
            item,
            upstream: SourceUpstream::Native(protocol),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn item(&self) -> &MediaItem {
        &self.item
    }

    pub fn uri(&self) -> &str {
        self.item.uri()
    }

    pub fn upstream(&self) -> &SourceUpstream {
        &self.upstream
    }

    pub fn data_source_factory(&self) -> Option<&Arc<dyn DataSourceFactory>> {
        match &self.upstream {
            SourceUpstream::Chain(factory) => Some(factory),
            SourceUpstream::Native(_) => None,
        }
    }

    /// New data source from the chain; `None` for native protocols.
    pub fn create_data_source(&self) -> Option<Box<dyn DataSource>> {
        self.data_source_factory()
            .map(|factory| factory.create_data_source())
    }

    /// Request for the whole item.
    pub fn data_spec(&self) -> DataSpec {
        DataSpec::new(self.item.uri())
    }
}

/// Demux-specific factory: binds a content type to a data source chain.
#[derive(Debug, Clone)]
pub struct MediaSourceFactory {
    content_type: ContentType,
    data_source_factory: Arc<dyn DataSourceFactory>,
}

impl MediaSourceFactory {
    pub fn dash(data_source_factory: Arc<dyn DataSourceFactory>) -> Self {
        Self::with_content_type(ContentType::Dash, data_source_factory)
    }

    pub fn hls(data_source_factory: Arc<dyn DataSourceFactory>) -> Self {
        Self::with_content_type(ContentType::Hls, data_source_factory)
    }

    pub fn progressive(data_source_factory: Arc<dyn DataSourceFactory>) -> Self {
        Self::with_content_type(ContentType::Progressive, data_source_factory)
    }

    fn with_content_type(
        content_type: ContentType,
        data_source_factory: Arc<dyn DataSourceFactory>,
    ) -> Self {
        Self {
            content_type,
            data_source_factory,
        }
    }

    /// Factory for a classified content type.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for RTMP/RTSP, which do not use a chain.
    pub fn for_content_type(
        content_type: ContentType,
        data_source_factory: Arc<dyn DataSourceFactory>,
    ) -> Result<Self> {
        match content_type {
            ContentType::Dash => Ok(Self::dash(data_source_factory)),
            ContentType::Hls => Ok(Self::hls(data_source_factory)),
            ContentType::Progressive => Ok(Self::progressive(data_source_factory)),
            ContentType::Rtmp | ContentType::Rtsp => Err(PlaybackError::InvalidArgument(format!(
                "{} sources are opened natively",
                content_type
            ))),
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn create_media_source(&self, item: MediaItem) -> MediaSource {
        MediaSource {
            id: Uuid::new_v4(),
            content_type: self.content_type,
            item,
            upstream: SourceUpstream::Chain(Arc::clone(&self.data_source_factory)),
        }
    }
}
