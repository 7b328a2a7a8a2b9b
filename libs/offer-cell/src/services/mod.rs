pub mod acceptance;
pub mod decline;
pub mod dispatcher;
pub mod eligibility;
pub mod sweeper;

pub use acceptance::{AcceptanceResolver, ClaimOutcome};
pub use decline::DeclineResolver;
pub use dispatcher::OfferBatchDispatcher;
pub use eligibility::{matches_provider_preference, EligibilityFilter};
pub use sweeper::HoldTimerSweeper;
