use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    /// The raffle account already holds a raffle
    #[error("Raffle is already initialized")]
    AlreadyInitialized,

    /// Constructor parameters rejected
    #[error("Invalid raffle configuration")]
    InvalidConfiguration,

    /// Entry payment below the entrance fee
    #[error("Payment is below the entrance fee")]
    InsufficientPayment,

    /// Entry payment above the entrance fee
    #[error("Payment exceeds the entrance fee")]
    ExcessPayment,

    /// Entry attempted while a winner is being calculated
    #[error("Raffle is not open")]
    NotOpen,

    /// No room left in the player list
    #[error("Raffle is full")]
    RaffleFull,

    /// Closure requested while the round is not eligible
    #[error("Upkeep not needed")]
    UpkeepNotNeeded,

    /// Coordinator program does not match the configured one
    #[error("Invalid randomness coordinator")]
    InvalidCoordinator,

    /// Fulfillment not signed by the coordinator authority
    #[error("Only the coordinator can fulfill")]
    UnauthorizedCoordinator,

    /// Coordinator returned no usable request id
    #[error("Coordinator did not return a request id")]
    MissingRequestId,

    /// Fulfillment for an id that is not the outstanding request
    #[error("Unknown randomness request")]
    UnknownRequest,

    /// Fulfillment delivered no random words
    #[error("No random words delivered")]
    MissingRandomWords,

    /// The pot could not be delivered to the winner
    #[error("Payout to winner failed")]
    PayoutFailed,

    /// Player index past the end of the player list
    #[error("Player index out of range")]
    IndexOutOfRange,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
