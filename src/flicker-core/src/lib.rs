pub mod config;
pub mod logging;
pub mod models;
pub mod paths;
pub mod playlist;
pub mod provider;
pub mod provider_contract;

pub use config::{Config, ConfigError, LogLevel, LoggingConfig, PluginsConfig, ValidationError};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use models::{
    AudioStream, DataStream, ExternalAudioStream, ExternalVideoStream, PlaylistItem,
    SubtitlesStream, VideoStream,
};
pub use paths::{AppDirs, DirsError};
pub use playlist::Playlist;
pub use provider::{
    ConstructProvider, OpenCapability, OpenSubtitlesCapability, Provider, ProviderContext,
    ProviderDescriptor, ProviderError, ProviderResult, ScrapeItemCapability,
    SuggestAudioStreamCapability, SuggestExternalAudioCapability, SuggestExternalVideoCapability,
    SuggestPlaylistItemCapability, SuggestVideoStreamCapability, DEFAULT_PRIORITY,
};

pub const APP_NAME: &str = "flicker";
pub const APP_AUTHOR: &str = "Flicker";
pub const APP_QUALIFIER: &str = "io";
