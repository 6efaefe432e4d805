use serde::{Deserialize, Serialize};

use crate::common::{NexlinkError, Result, types::UserId};

/// A playable track as returned by the node's search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    /// Length in seconds.
    #[serde(default)]
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Website the track was extracted from.
    #[serde(default, rename = "extractor", skip_serializing_if = "Option::is_none")]
    pub source_extractor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<UserId>,
    /// Seconds elapsed; only meaningful for the current track.
    #[serde(default, rename = "stream_time")]
    pub stream_position: u64,
}

impl Track {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Where the node should look for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchSource {
    #[default]
    #[serde(rename = "ytsearch")]
    YoutubeSearch,
    #[serde(rename = "scsearch")]
    SoundcloudSearch,
    /// The query is a playlist link.
    #[serde(rename = "ytplaylist")]
    YoutubePlaylist,
}

impl SearchSource {
    pub fn identifier(self) -> &'static str {
        match self {
            Self::YoutubeSearch => "ytsearch",
            Self::SoundcloudSearch => "scsearch",
            Self::YoutubePlaylist => "ytplaylist",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default)]
    pub source: SearchSource,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            source: SearchSource::default(),
        }
    }

    pub fn with_source(mut self, source: SearchSource) -> Self {
        self.source = source;
        self
    }

    /// Relative REST path of the search endpoint.
    pub fn path(&self) -> String {
        format!(
            "api/tracks/search?query={}&identifier={}",
            urlencoding::encode(&self.query),
            self.source.identifier()
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub extractor: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    NoResult,
    Tracks(Vec<Track>),
    Playlist { info: PlaylistInfo, tracks: Vec<Track> },
}

impl SearchResult {
    pub fn tracks(&self) -> &[Track] {
        match self {
            Self::NoResult => &[],
            Self::Tracks(tracks) | Self::Playlist { tracks, .. } => tracks,
        }
    }

    pub fn into_tracks(self) -> Vec<Track> {
        match self {
            Self::NoResult => Vec::new(),
            Self::Tracks(tracks) | Self::Playlist { tracks, .. } => tracks,
        }
    }
}

/// Body of `GET api/tracks/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Option<Vec<Track>>,
    #[serde(default)]
    pub playlist: Option<PlaylistInfo>,
}

impl SearchResponse {
    /// Normalizes the response and stamps every track with the requester.
    pub fn resolve(self, requester: Option<&UserId>) -> Result<SearchResult> {
        let mut tracks = self.results.ok_or(NexlinkError::EmptySearchResponse)?;

        for track in &mut tracks {
            track.requested_by = requester.cloned();
            track.stream_position = 0;
        }

        if tracks.is_empty() {
            return Ok(SearchResult::NoResult);
        }

        Ok(match self.playlist {
            Some(info) => SearchResult::Playlist { info, tracks },
            None => SearchResult::Tracks(tracks),
        })
    }
}
