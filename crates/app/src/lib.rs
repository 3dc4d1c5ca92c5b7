pub mod deploy;
pub mod events;
pub mod history;
pub mod resolver;

pub use deploy::{
    DeployError, DeployStatus, Deployer, DeploymentRequest, DeploymentTransaction,
    ValidationErrors,
};
pub use events::{AppEvent, EventBus};
pub use history::{DeployedToken, HistoryAggregator, HistoryError, HistoryService, filter_tokens};
pub use resolver::{NetworkResolver, NetworkStatus, ResolvedNetwork, SwitchError};
