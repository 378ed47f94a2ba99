use crate::models::{AudioStream, VideoStream};
use crate::playlist::Playlist;
use crate::provider::{OpenCapability, Provider};
use std::sync::Arc;
use thiserror::Error;

/// Expectations supplied by a provider implementation to run the shared contract suite.
#[derive(Debug, Clone, Default)]
pub struct ProviderContractExpectations {
    /// Inputs the Open probe must accept.
    pub accepted_inputs: Vec<String>,
    /// Inputs the Open probe must decline.
    pub rejected_inputs: Vec<String>,
    /// Candidates offered to SuggestAudioStream, when advertised.
    pub audio_candidates: Vec<AudioStream>,
    /// Candidates offered to SuggestVideoStream, when advertised.
    pub video_candidates: Vec<VideoStream>,
}

/// Errors surfaced by the provider contract test harness.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProviderContractError {
    #[error("provider implements both Open and OpenSubtitles")]
    AmbiguousOpen,
    #[error("accepted inputs were supplied but the provider has no Open capability")]
    MissingOpen,
    #[error("can_open gave different answers for input {input}")]
    ProbeUnstable { input: String },
    #[error("can_open declined expected input {input}")]
    ProbeDeclined { input: String },
    #[error("can_open accepted input {input} that should be declined")]
    ProbeAccepted { input: String },
    #[error("{capability} suggested a stream that is not one of the candidates")]
    ForeignSuggestion { capability: &'static str },
    #[error("{capability} suggested a stream from an empty candidate list")]
    SuggestionFromNothing { capability: &'static str },
}

/// Run the shared provider contract suite against a provider implementation.
///
/// Providers should call this from their crate-level tests with fixtures that
/// exist in their test setup.
pub fn run_provider_contract(
    provider: Arc<dyn Provider>,
    expectations: &ProviderContractExpectations,
) -> Result<(), ProviderContractError> {
    let open = Arc::clone(&provider).as_open();
    if open.is_some() && Arc::clone(&provider).as_open_subtitles().is_some() {
        return Err(ProviderContractError::AmbiguousOpen);
    }

    match open {
        Some(open) => verify_probe(open.as_ref(), expectations)?,
        None if !expectations.accepted_inputs.is_empty() => {
            return Err(ProviderContractError::MissingOpen)
        }
        None => {}
    }

    verify_suggestions(provider, expectations)
}

fn verify_probe(
    open: &dyn OpenCapability,
    expectations: &ProviderContractExpectations,
) -> Result<(), ProviderContractError> {
    let cases = expectations
        .accepted_inputs
        .iter()
        .map(|input| (input, true))
        .chain(expectations.rejected_inputs.iter().map(|input| (input, false)));

    for (input, expected) in cases {
        let mut playlist = Playlist::new();
        playlist.set_input(input.clone());

        let first = open.can_open(&playlist);
        let second = open.can_open(&playlist);
        if first != second {
            return Err(ProviderContractError::ProbeUnstable {
                input: input.clone(),
            });
        }
        match (expected, first) {
            (true, false) => {
                return Err(ProviderContractError::ProbeDeclined {
                    input: input.clone(),
                })
            }
            (false, true) => {
                return Err(ProviderContractError::ProbeAccepted {
                    input: input.clone(),
                })
            }
            _ => {}
        }
    }

    Ok(())
}

fn verify_suggestions(
    provider: Arc<dyn Provider>,
    expectations: &ProviderContractExpectations,
) -> Result<(), ProviderContractError> {
    if let Some(audio) = Arc::clone(&provider).as_suggest_audio_stream() {
        const CAPABILITY: &str = "suggest_audio";
        if audio.suggest_audio(&[]).is_some() {
            return Err(ProviderContractError::SuggestionFromNothing {
                capability: CAPABILITY,
            });
        }
        let candidates = &expectations.audio_candidates;
        if let Some(picked) = audio.suggest_audio(candidates) {
            if !candidates.iter().any(|c| std::ptr::eq(c, picked)) {
                return Err(ProviderContractError::ForeignSuggestion {
                    capability: CAPABILITY,
                });
            }
        }
    }

    if let Some(video) = provider.as_suggest_video_stream() {
        const CAPABILITY: &str = "suggest_video";
        if video.suggest_video(&[]).is_some() {
            return Err(ProviderContractError::SuggestionFromNothing {
                capability: CAPABILITY,
            });
        }
        let candidates = &expectations.video_candidates;
        if let Some(picked) = video.suggest_video(candidates) {
            if !candidates.iter().any(|c| std::ptr::eq(c, picked)) {
                return Err(ProviderContractError::ForeignSuggestion {
                    capability: CAPABILITY,
                });
            }
        }
    }

    Ok(())
}
