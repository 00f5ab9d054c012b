pub mod actions;
pub mod competition;

pub use actions::{
    ActionError, ActionGetResponse, ActionLinks, ActionParameter, ActionPostRequest,
    ActionPostResponse, LinkedAction,
};
pub use competition::FinalizeCompetitionPath;
