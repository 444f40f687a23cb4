//! Fetch background tracks over HTTP(S) and decode them.
//!
//! The future is runtime-agnostic; hosts drive it with whatever executor
//! they already have.

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{NadaError, NadaResult};
use crate::params::BackgroundTrack;
use crate::session::ToneSession;

use super::decode::decode_track;
use super::track::SampleBuffer;

pub struct TrackFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl TrackFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        TrackFetcher {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        TrackFetcher::new(config.track_base_url.clone())
    }

    pub fn url_for(&self, track: BackgroundTrack) -> Option<String> {
        track.url(&self.base_url)
    }

    /// Download and decode one track.
    pub async fn fetch(&self, track: BackgroundTrack) -> NadaResult<SampleBuffer> {
        let url = self
            .url_for(track)
            .ok_or(NadaError::TrackNotLoaded { track })?;
        debug!(%url, "fetching background track");

        let fetch_err = |e: reqwest::Error| NadaError::TrackFetch {
            url: url.clone(),
            message: e.to_string(),
        };
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;
        let bytes = response.bytes().await.map_err(fetch_err)?;

        decode_track(&bytes)
    }

    /// Fetch a track and register it with the session. Failures are logged
    /// and returned; the session keeps playing tones either way.
    pub async fn load_into(&self, track: BackgroundTrack, session: &mut ToneSession) -> NadaResult<()> {
        match self.fetch(track).await {
            Ok(buffer) => session.register_track(track, buffer),
            Err(e) => {
                warn!(track = track.name(), error = %e, "background track load failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::pin;
    use std::task::{Context, Poll, Waker};

    use super::*;

    #[test]
    fn urls_follow_base() {
        let f = TrackFetcher::new("https://cdn.example/audio/");
        assert_eq!(
            f.url_for(BackgroundTrack::Piano).as_deref(),
            Some("https://cdn.example/audio/piano.mp3")
        );
        assert_eq!(f.url_for(BackgroundTrack::None), None);
    }

    #[test]
    fn none_track_fails_without_network() {
        let f = TrackFetcher::from_config(&EngineConfig::default());
        let mut fut = pin!(f.fetch(BackgroundTrack::None));
        let mut cx = Context::from_waker(Waker::noop());
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(Err(NadaError::TrackNotLoaded { track })) => {
                assert_eq!(track, BackgroundTrack::None)
            }
            other => panic!("expected immediate failure, got {:?}", other.map(|r| r.is_ok())),
        }
    }

    #[test]
    fn failed_load_leaves_session_playing() {
        let config = EngineConfig::default();
        let f = TrackFetcher::from_config(&config);
        let mut session = ToneSession::new(config);
        session.play();

        let mut cx = Context::from_waker(Waker::noop());
        {
            let mut fut = pin!(f.load_into(BackgroundTrack::None, &mut session));
            assert!(matches!(fut.as_mut().poll(&mut cx), Poll::Ready(Err(_))));
        }
        assert!(session.is_playing());
        assert!(!session.engine().tracks().contains(BackgroundTrack::None));
    }
}
