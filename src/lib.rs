// caces-vote - OMBEA voting-session coordination for CACES exam sessions
// This exposes the core components for the desktop app, the CLI and integration tests

pub mod config;
pub mod hardware;
pub mod observability;
pub mod question;
pub mod session;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{CacesVoteConfig, HardwareConfig, ObservabilityConfig, SessionSettings};
pub use hardware::{HardwareError, OmbeaClient, ResponseLink, VotingHardware};
pub use observability::{HardwareApiMetrics, HardwareApiStats, OperationTimer};
pub use question::{Answer, Question, QuestionType};
pub use session::{
    ConnectionStatus, CoordinatorSnapshot, Device, PollResults, ResponseSet, VotingCoordinator,
    VotingSession,
};
pub use telemetry::{create_session_span, generate_correlation_id, init_telemetry};
