pub mod competition;
pub mod transaction;

pub use competition::{
    ClaimPlaceholder, Competition, CompetitionId, CompetitionTerms, GetCompetition,
    InsertCompetition, ListCompetitions, Phase, RegistryError, RemoveCompetition,
    ReservePlaceholder, StartCompetition,
};
pub use transaction::{ParsedTransaction, TokenTransfer, TransactionKind};
