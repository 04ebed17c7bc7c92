// Program-derived addresses shared by the processor, builders and coordinators
use solana_program::pubkey::Pubkey;

/// Seed of the single raffle account
pub const RAFFLE_SEED: &[u8] = b"raffle";
/// Seed a coordinator uses for the authority that signs fulfillments
pub const COORDINATOR_AUTHORITY_SEED: &[u8] = b"vrf-coordinator";

/// Find the program derived address of the raffle
pub fn find_raffle_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[RAFFLE_SEED], program_id)
}

/// Find the authority a coordinator program signs fulfillments with
pub fn find_coordinator_authority(coordinator_program: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[COORDINATOR_AUTHORITY_SEED], coordinator_program)
}
