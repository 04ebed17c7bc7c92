use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    entrypoint::ProgramResult, log::sol_log_data, msg, program_error::ProgramError,
    pubkey::Pubkey,
};
use std::fmt;

/// Events observed by indexers and test harnesses
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    EntryRecorded { participant: Pubkey },
    RandomnessRequested { request_id: u64 },
    WinnerPicked { winner: Pubkey },
}

impl RaffleEvent {
    /// Log the event as text and as borsh-encoded program data
    pub fn emit(&self) -> ProgramResult {
        msg!("{}", self);
        let data = self
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        sol_log_data(&[&data]);
        Ok(())
    }
}

impl fmt::Display for RaffleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaffleEvent::EntryRecorded { participant } => {
                write!(f, "EntryRecorded: participant={}", participant)
            }
            RaffleEvent::RandomnessRequested { request_id } => {
                write!(f, "RandomnessRequested: request_id={}", request_id)
            }
            RaffleEvent::WinnerPicked { winner } => write!(f, "WinnerPicked: winner={}", winner),
        }
    }
}
