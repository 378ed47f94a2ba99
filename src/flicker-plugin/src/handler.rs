use crate::dispatch::{dispatch, Dispatch, Policy, Step};
use crate::error::{DispatchError, DispatchResult};
use crate::registry::{CapabilityIndex, LoadReport, LoadedProvider, ProviderRegistry};
use crate::session::{CancelToken, EpochKind, Session, SessionGuard};
use flicker_core::{
    AudioStream, DataStream, ExternalAudioStream, ExternalVideoStream, Playlist, PlaylistItem,
    PluginsConfig, ProviderDescriptor, ProviderError, SubtitlesStream, VideoStream,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// What a successful open produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    pub provider: String,
    pub items: usize,
}

/// Outcome of releasing every provider.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub attempted: usize,
    pub failures: Vec<(String, ProviderError)>,
}

/// A stream picked from the candidates, or one a provider sourced itself.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamSuggestion<'a, S, E> {
    Embedded(&'a S),
    External(E),
    Nothing,
}

impl<'a, S, E> StreamSuggestion<'a, S, E> {
    pub fn is_nothing(&self) -> bool {
        matches!(self, StreamSuggestion::Nothing)
    }
}

/// Owns the providers of one media session and dispatches capability calls
/// to them in priority order.
///
/// Lifecycle events, open attempts and item switches are driven by the
/// caller; cancellation can come from any thread through [`SessionGuard`].
pub struct ProviderHandler {
    id: u64,
    guard: Arc<SessionGuard>,
    registry: ProviderRegistry,
    playlist: Playlist,
}

impl ProviderHandler {
    pub fn new(descriptors: &[ProviderDescriptor], config: &PluginsConfig) -> Self {
        let id = NEXT_HANDLER_ID.fetch_add(1, Ordering::SeqCst);
        Self::with_id(id, descriptors, config)
    }

    pub fn with_id(id: u64, descriptors: &[ProviderDescriptor], config: &PluginsConfig) -> Self {
        let registry = ProviderRegistry::load(descriptors, config, id);
        tracing::debug!(
            handler = id,
            loaded = registry.len(),
            skipped = registry.report().skipped.len(),
            "provider handler created"
        );
        Self {
            id,
            guard: Arc::new(SessionGuard::new()),
            registry,
            playlist: Playlist::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Shared cancellation state; clone it to cancel from another thread.
    pub fn guard(&self) -> &Arc<SessionGuard> {
        &self.guard
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn playlist_mut(&mut self) -> &mut Playlist {
        &mut self.playlist
    }

    pub fn providers(&self) -> &[LoadedProvider] {
        self.registry.providers()
    }

    pub fn index(&self) -> &CapabilityIndex {
        self.registry.index()
    }

    pub fn load_report(&self) -> &LoadReport {
        self.registry.report()
    }

    fn token(&self, kind: EpochKind) -> CancelToken {
        self.guard.token(kind)
    }

    /// Providers that still receive lifecycle events; none after teardown.
    fn live_providers(&self) -> &[LoadedProvider] {
        if self.guard.is_released() {
            return &[];
        }
        self.registry.providers()
    }

    // Lifecycle

    pub fn on_initializing(&self, session: &mut Session) {
        self.guard.bump_open();
        session.clear();
        for provider in self.live_providers() {
            provider.instance().on_initializing();
        }
    }

    pub fn on_initialized(&mut self, session: &mut Session) {
        session.clear();
        self.playlist.reset();
        for provider in self.live_providers() {
            provider.instance().on_initialized();
        }
    }

    pub fn on_initializing_switch(&self) {
        self.guard.bump_item_switch();
        for provider in self.live_providers() {
            provider.instance().on_initializing_switch();
        }
    }

    pub fn on_initialized_switch(&self) {
        for provider in self.live_providers() {
            provider.instance().on_initialized_switch();
        }
    }

    /// Releases every provider once, in registration order. Later calls are
    /// no-ops, and every dispatch after it is cancelled.
    pub fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if !self.guard.release() {
            return report;
        }

        for provider in self.registry.providers() {
            report.attempted += 1;
            if let Err(err) = provider.instance().release() {
                tracing::error!(
                    handler = self.id,
                    provider = provider.name(),
                    error = %err,
                    "failed to release provider"
                );
                report.failures.push((provider.name().to_string(), err));
            }
        }

        report
    }

    // Open

    /// Asks each opener whether it takes the playlist input and lets the
    /// first one that does fill the playlist.
    pub fn open(&mut self, session: &mut Session) -> DispatchResult<Opened> {
        let token = self.token(EpochKind::Open);
        let playlist = &mut self.playlist;
        let outcome = dispatch(
            self.registry.index().open(),
            &token,
            Policy::FirstSuccessOrAbort,
            |opener| {
                if !opener.can_open(playlist) {
                    return Step::Skip;
                }
                Step::from_outcome(opener.open(playlist))
            },
        );

        match outcome {
            Dispatch::Found { winner, .. } => {
                let items = self.playlist.len();
                tracing::info!(
                    handler = self.id,
                    provider = winner.name(),
                    items,
                    "opened input"
                );
                session.claim(self.id);
                session.opened = Some(winner.clone());
                Ok(Opened {
                    provider: winner.name().to_string(),
                    items,
                })
            }
            other => {
                let err = other.into_result().err().unwrap_or(DispatchError::NoProvider);
                self.log_failure("open", &err);
                Err(err)
            }
        }
    }

    /// Opens the selected playlist item through the provider that won `open`
    /// on this handler.
    pub fn open_item(&mut self, session: &Session) -> DispatchResult<()> {
        let winner = session
            .opened_by(self.id)
            .ok_or(DispatchError::NoActiveProvider)?;
        let token = self.token(EpochKind::Item);
        if token.is_cancelled() {
            self.log_failure("open_item", &DispatchError::Cancelled);
            return Err(DispatchError::Cancelled);
        }

        let outcome = winner.handle().open_item(&mut self.playlist);
        if token.is_superseded() {
            self.log_failure("open_item", &DispatchError::Cancelled);
            return Err(DispatchError::Cancelled);
        }

        match outcome {
            Some(Ok(())) => {
                tracing::info!(
                    handler = self.id,
                    provider = winner.name(),
                    item = ?self.playlist.selected_index(),
                    "opened item"
                );
                Ok(())
            }
            Some(Err(err)) => {
                let err = DispatchError::Provider(err);
                self.log_failure("open_item", &err);
                Err(err)
            }
            None => {
                self.log_failure("open_item", &DispatchError::Cancelled);
                Err(DispatchError::Cancelled)
            }
        }
    }

    pub fn open_subtitles(
        &mut self,
        session: &mut Session,
        url: &str,
    ) -> DispatchResult<SubtitlesStream> {
        let token = self.token(EpochKind::Open);
        let outcome = dispatch(
            self.registry.index().open_subtitles(),
            &token,
            Policy::FirstSuccessOrAbort,
            |opener| Step::from_outcome(opener.open_subtitles(url)),
        );

        match outcome {
            Dispatch::Found { winner, value } => {
                tracing::info!(
                    handler = self.id,
                    provider = winner.name(),
                    url,
                    "opened subtitles"
                );
                session.claim(self.id);
                session.opened_subtitles = Some(winner.clone());
                Ok(value)
            }
            other => {
                let err = other.into_result().err().unwrap_or(DispatchError::NoProvider);
                self.log_failure("open_subtitles", &err);
                Err(err)
            }
        }
    }

    /// The opener delivered every item it is going to.
    pub fn on_playlist_completed(&mut self) {
        self.playlist.set_completed(true);
        if self.playlist.expecting_items() == 0 {
            let count = self.playlist.len();
            self.playlist.set_expecting_items(count);
        }
        if self.playlist.len() > 1 {
            tracing::debug!(
                handler = self.id,
                items = self.playlist.len(),
                "playlist completed"
            );
            self.playlist.update_prev_next_item();
        }
    }

    // Scrape

    /// Lets every scraper decorate `item`. Only cancellation stops the broadcast.
    pub fn scrape_item(&self, item: &mut PlaylistItem) -> DispatchResult<()> {
        let token = self.token(EpochKind::Item);
        self.scrape_with(&token, item)
    }

    fn scrape_with(&self, token: &CancelToken, item: &mut PlaylistItem) -> DispatchResult<()> {
        let outcome: Dispatch<'_, _, ()> = dispatch(
            self.registry.index().scrape_item(),
            token,
            Policy::Broadcast,
            |scraper| {
                scraper.scrape_item(item);
                Step::Skip
            },
        );
        if outcome.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }
        Ok(())
    }

    /// Scrapes every playlist item in order. Returns how many were scraped.
    pub fn scrape_playlist(&mut self) -> DispatchResult<usize> {
        let token = self.token(EpochKind::Item);
        let scrapers = self.registry.index().scrape_item();
        let mut scraped = 0;

        for item in self.playlist.items_mut() {
            let outcome: Dispatch<'_, _, ()> =
                dispatch(scrapers, &token, Policy::Broadcast, |scraper| {
                    scraper.scrape_item(item);
                    Step::Skip
                });
            if outcome.is_cancelled() {
                tracing::debug!(handler = self.id, scraped, "scrape cancelled");
                return Err(DispatchError::Cancelled);
            }
            scraped += 1;
        }

        Ok(scraped)
    }

    // Suggestions

    /// Index of the playlist item to play first.
    pub fn suggest_item(&self) -> Option<usize> {
        let token = self.token(EpochKind::Item);
        let playlist = &self.playlist;
        let outcome = dispatch(
            self.registry.index().suggest_playlist_item(),
            &token,
            Policy::FirstSuccess,
            |suggester| match suggester.suggest_item(playlist) {
                Some(index) if index < playlist.len() => Step::Yield(index),
                _ => Step::Skip,
            },
        );
        self.log_suggestion("playlist item", outcome)
    }

    pub fn suggest_audio<'a>(&self, streams: &'a [AudioStream]) -> Option<&'a AudioStream> {
        let token = self.token(EpochKind::Item);
        self.suggest_audio_with_token(&token, streams).found()
    }

    fn suggest_audio_with_token<'a>(
        &self,
        token: &CancelToken,
        streams: &'a [AudioStream],
    ) -> SuggestOutcome<&'a AudioStream> {
        if streams.is_empty() {
            return SuggestOutcome::Nothing;
        }
        let outcome = dispatch(
            self.registry.index().suggest_audio_stream(),
            token,
            Policy::FirstSuccess,
            |suggester| Step::from(suggester.suggest_audio(streams)),
        );
        SuggestOutcome::from_logged(self.id, "audio stream", outcome)
    }

    pub fn suggest_video<'a>(&self, streams: &'a [VideoStream]) -> Option<&'a VideoStream> {
        let token = self.token(EpochKind::Item);
        self.suggest_video_with_token(&token, streams).found()
    }

    fn suggest_video_with_token<'a>(
        &self,
        token: &CancelToken,
        streams: &'a [VideoStream],
    ) -> SuggestOutcome<&'a VideoStream> {
        if streams.is_empty() {
            return SuggestOutcome::Nothing;
        }
        let outcome = dispatch(
            self.registry.index().suggest_video_stream(),
            token,
            Policy::FirstSuccess,
            |suggester| Step::from(suggester.suggest_video(streams)),
        );
        SuggestOutcome::from_logged(self.id, "video stream", outcome)
    }

    pub fn suggest_external_audio(&self) -> Option<ExternalAudioStream> {
        let token = self.token(EpochKind::Item);
        self.suggest_external_audio_with_token(&token).found()
    }

    fn suggest_external_audio_with_token(
        &self,
        token: &CancelToken,
    ) -> SuggestOutcome<ExternalAudioStream> {
        let playlist = &self.playlist;
        let outcome = dispatch(
            self.registry.index().suggest_external_audio(),
            token,
            Policy::FirstSuccess,
            |suggester| Step::from(suggester.suggest_external_audio(playlist)),
        );
        SuggestOutcome::from_logged(self.id, "external audio", outcome)
    }

    pub fn suggest_external_video(&self) -> Option<ExternalVideoStream> {
        let token = self.token(EpochKind::Item);
        self.suggest_external_video_with_token(&token).found()
    }

    fn suggest_external_video_with_token(
        &self,
        token: &CancelToken,
    ) -> SuggestOutcome<ExternalVideoStream> {
        let playlist = &self.playlist;
        let outcome = dispatch(
            self.registry.index().suggest_external_video(),
            token,
            Policy::FirstSuccess,
            |suggester| Step::from(suggester.suggest_external_video(playlist)),
        );
        SuggestOutcome::from_logged(self.id, "external video", outcome)
    }

    /// Embedded audio first; external sources only when nothing was picked
    /// and the attempt was not cancelled.
    pub fn suggest_audio_with_fallback<'a>(
        &self,
        streams: &'a [AudioStream],
    ) -> StreamSuggestion<'a, AudioStream, ExternalAudioStream> {
        let token = self.token(EpochKind::Item);
        match self.suggest_audio_with_token(&token, streams) {
            SuggestOutcome::Found(stream) => StreamSuggestion::Embedded(stream),
            SuggestOutcome::Cancelled => StreamSuggestion::Nothing,
            SuggestOutcome::Nothing => match self.suggest_external_audio_with_token(&token) {
                SuggestOutcome::Found(stream) => StreamSuggestion::External(stream),
                _ => StreamSuggestion::Nothing,
            },
        }
    }

    pub fn suggest_video_with_fallback<'a>(
        &self,
        streams: &'a [VideoStream],
    ) -> StreamSuggestion<'a, VideoStream, ExternalVideoStream> {
        let token = self.token(EpochKind::Item);
        match self.suggest_video_with_token(&token, streams) {
            SuggestOutcome::Found(stream) => StreamSuggestion::Embedded(stream),
            SuggestOutcome::Cancelled => StreamSuggestion::Nothing,
            SuggestOutcome::Nothing => match self.suggest_external_video_with_token(&token) {
                SuggestOutcome::Found(stream) => StreamSuggestion::External(stream),
                _ => StreamSuggestion::Nothing,
            },
        }
    }

    /// Data streams have no suggesters: the first one, unless interrupted.
    pub fn suggest_data<'a>(&self, streams: &'a [DataStream]) -> Option<&'a DataStream> {
        if self.guard.is_interrupted() || self.guard.is_released() {
            return None;
        }
        streams.first()
    }

    fn log_suggestion<C: ?Sized, T: std::fmt::Debug>(
        &self,
        what: &'static str,
        outcome: Dispatch<'_, C, T>,
    ) -> Option<T> {
        SuggestOutcome::from_logged(self.id, what, outcome).found()
    }

    fn log_failure(&self, operation: &'static str, err: &DispatchError) {
        match err {
            DispatchError::Cancelled => {
                tracing::debug!(handler = self.id, operation, "cancelled")
            }
            err => tracing::warn!(handler = self.id, operation, error = %err, "dispatch failed"),
        }
    }
}

impl Drop for ProviderHandler {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// A suggestion dispatch with the provider borrow dropped.
enum SuggestOutcome<T> {
    Found(T),
    Nothing,
    Cancelled,
}

impl<T> SuggestOutcome<T> {
    fn from_logged<C: ?Sized>(handler: u64, what: &'static str, outcome: Dispatch<'_, C, T>) -> Self
    where
        T: std::fmt::Debug,
    {
        match outcome {
            Dispatch::Found { winner, value } => {
                tracing::info!(
                    handler,
                    provider = winner.name(),
                    suggestion = ?value,
                    "suggested {what}"
                );
                SuggestOutcome::Found(value)
            }
            Dispatch::Cancelled => {
                tracing::debug!(handler, "{what} suggestion cancelled");
                SuggestOutcome::Cancelled
            }
            Dispatch::Failed { .. } | Dispatch::Exhausted => SuggestOutcome::Nothing,
        }
    }

    fn found(self) -> Option<T> {
        match self {
            SuggestOutcome::Found(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flicker_core::{OpenCapability, Provider, ProviderResult};

    struct Single;

    impl OpenCapability for Single {
        fn can_open(&self, playlist: &Playlist) -> bool {
            playlist.input().is_some()
        }

        fn open(&self, playlist: &mut Playlist) -> Option<ProviderResult<()>> {
            let input = playlist.input()?.to_string();
            playlist.add_item(PlaylistItem::new(input.clone(), input));
            Some(Ok(()))
        }

        fn open_item(&self, _playlist: &mut Playlist) -> Option<ProviderResult<()>> {
            Some(Ok(()))
        }
    }

    impl Provider for Single {
        fn as_open(self: Arc<Self>) -> Option<Arc<dyn OpenCapability>> {
            Some(self)
        }
    }

    fn handler() -> ProviderHandler {
        let descriptors = vec![ProviderDescriptor::new("single", "1.0.0", |_| {
            Ok(Arc::new(Single) as Arc<dyn Provider>)
        })];
        ProviderHandler::new(&descriptors, &PluginsConfig::default())
    }

    #[test]
    fn handler_ids_are_unique() {
        let a = handler();
        let b = handler();
        assert_ne!(a.id(), b.id());
        let c = ProviderHandler::with_id(99, &[], &PluginsConfig::default());
        assert_eq!(c.id(), 99);
    }

    #[test]
    fn initialized_resets_playlist_and_winner() {
        let mut handler = handler();
        let mut session = Session::new();
        handler.on_initializing(&mut session);
        handler.on_initialized(&mut session);
        handler.playlist_mut().set_input("/tmp/movie.mkv");
        handler.open(&mut session).unwrap();
        assert_eq!(session.opened_provider(), Some("single"));

        handler.on_initialized(&mut session);
        assert!(session.opened_provider().is_none());
        assert!(handler.playlist().is_empty());
        assert!(handler.playlist().input().is_none());
    }

    #[test]
    fn completion_fills_expecting_items_and_neighbours() {
        let mut handler = handler();
        for url in ["a", "b", "c"] {
            handler.playlist_mut().add_item(PlaylistItem::new(url, url));
        }
        handler.playlist_mut().select_index(1);

        handler.on_playlist_completed();
        assert!(handler.playlist().completed());
        assert_eq!(handler.playlist().expecting_items(), 3);
        assert_eq!(handler.playlist().next_item().unwrap().url, "c");

        handler.playlist_mut().set_expecting_items(5);
        handler.on_playlist_completed();
        assert_eq!(handler.playlist().expecting_items(), 5);
    }

    #[test]
    fn suggest_data_respects_interrupt() {
        let handler = handler();
        let streams = vec![
            DataStream {
                index: 0,
                codec: "bin_data".into(),
            },
            DataStream {
                index: 1,
                codec: "bin_data".into(),
            },
        ];
        assert_eq!(handler.suggest_data(&streams).unwrap().index, 0);
        assert!(handler.suggest_data(&[]).is_none());

        handler.guard().interrupt();
        assert!(handler.suggest_data(&streams).is_none());
    }

    #[test]
    fn empty_candidates_skip_every_provider() {
        let handler = handler();
        assert!(handler.suggest_audio(&[]).is_none());
        assert!(handler.suggest_video(&[]).is_none());
        assert!(handler.suggest_audio_with_fallback(&[]).is_nothing());
    }

    #[test]
    fn teardown_runs_once() {
        let mut handler = handler();
        assert_eq!(handler.teardown().attempted, 1);
        assert_eq!(handler.teardown().attempted, 0);
    }

    #[test]
    fn nothing_dispatches_after_teardown() {
        let mut handler = handler();
        let mut session = Session::new();
        handler.playlist_mut().set_input("/tmp/movie.mkv");
        handler.open(&mut session).unwrap();
        handler.playlist_mut().select_index(0);
        handler.teardown();

        assert_eq!(handler.open(&mut session), Err(DispatchError::Cancelled));
        assert_eq!(handler.open_item(&session), Err(DispatchError::Cancelled));
        let data = [DataStream {
            index: 0,
            codec: "bin_data".into(),
        }];
        assert!(handler.suggest_data(&data).is_none());
    }
}
