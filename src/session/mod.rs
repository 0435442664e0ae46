//! OMBEA voting-session coordination: session and poll lifecycle, device responses,
//! test-mode simulation and poll countdown.

pub mod coordinator;
pub mod countdown;
pub mod devices;
pub mod results;
pub mod scheduler;
pub mod simulation;
pub mod state_machine;


pub use coordinator::{
    ConnectionStatus, CoordinatorSnapshot, VotingCoordinator, WeakCoordinator,
    HARDWARE_NOT_READY, NO_ACTIVE_DEVICE, NO_ACTIVE_LINK, POLL_ALREADY_OPEN, SESSION_NOT_ACTIVE,
};
pub use devices::{Device, ResponseSet};
pub use results::{OptionTally, PollResults};
pub use scheduler::ScheduledTask;
pub use simulation::SimulationPlan;
pub use state_machine::{SessionPhase, VotingSession};
