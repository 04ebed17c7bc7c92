// Shared harness: a mock randomness coordinator and a test bank wrapper
#![allow(dead_code)]

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_program,
};
use solana_program_test::*;
use solana_sdk::{
    account::Account,
    clock::Clock,
    instruction::InstructionError,
    signature::{Keypair, Signer},
    system_instruction,
    transaction::{Transaction, TransactionError},
    transaction_context::TransactionReturnData,
};

use autoraffle::{
    process_instruction,
    raffle_error::RaffleError,
    raffle_instruction,
    raffle_state::{Raffle, RaffleConfig, REQUEST_CONFIRMATIONS},
    utils::{find_coordinator_authority, find_raffle_address, COORDINATOR_AUTHORITY_SEED},
    vrf::RandomWordsRequest,
};

pub const MOCK_STATE_SEED: &[u8] = b"mock-coordinator-state";
const MOCK_STATE_LEN: usize = 128;

pub const GAS_LANE: [u8; 32] = [0xd8; 32];
pub const SUBSCRIPTION_ID: u64 = 588;
pub const CALLBACK_GAS_LIMIT: u32 = 500_000;

/// What the mock coordinator remembers between calls
#[derive(BorshSerialize, BorshDeserialize, Debug, Default)]
pub struct MockCoordinatorState {
    pub request_count: u64,
    pub last_request: Option<RandomWordsRequest>,
}

/// Instructions of the mock coordinator. Tag 0 matches
/// `CoordinatorInstruction::RequestRandomWords`.
#[derive(BorshSerialize, BorshDeserialize, Debug)]
pub enum MockCoordinatorInstruction {
    /// 0. `[signer]` consumer, 1. `[writable]` mock state
    RequestRandomWords(RandomWordsRequest),
    /// 0. `[]` authority PDA, 1. `[]` consumer program,
    /// 2. `[writable]` raffle, 3. `[writable]` winner
    FulfillRandomWords {
        request_id: u64,
        random_words: Vec<u64>,
    },
}

/// Hands out sequential request ids and forwards whatever fulfillment the
/// test asks for, so the raffle's own checks decide what is accepted.
pub fn process_mock_coordinator(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    let instruction = MockCoordinatorInstruction::try_from_slice(data)
        .map_err(|_| ProgramError::InvalidInstructionData)?;
    let account_info_iter = &mut accounts.iter();

    match instruction {
        MockCoordinatorInstruction::RequestRandomWords(request) => {
            let consumer_info = next_account_info(account_info_iter)?;
            let state_info = next_account_info(account_info_iter)?;
            if !consumer_info.is_signer {
                return Err(ProgramError::MissingRequiredSignature);
            }

            let mut state = MockCoordinatorState::deserialize(&mut &state_info.data.borrow()[..])
                .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
            state.request_count += 1;
            state.last_request = Some(request);
            state
                .serialize(&mut &mut state_info.data.borrow_mut()[..])
                .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;

            msg!("Mock coordinator issued request {}", state.request_count);
            set_return_data(&state.request_count.to_le_bytes());
            Ok(())
        }
        MockCoordinatorInstruction::FulfillRandomWords {
            request_id,
            random_words,
        } => {
            let authority_info = next_account_info(account_info_iter)?;
            let consumer_program_info = next_account_info(account_info_iter)?;
            let raffle_info = next_account_info(account_info_iter)?;
            let winner_info = next_account_info(account_info_iter)?;

            let (authority, bump) = find_coordinator_authority(program_id);
            if *authority_info.key != authority {
                return Err(ProgramError::InvalidSeeds);
            }

            let instruction = raffle_instruction::fulfill_random_words(
                consumer_program_info.key,
                authority_info.key,
                winner_info.key,
                request_id,
                random_words,
            );
            invoke_signed(
                &instruction,
                &[
                    authority_info.clone(),
                    raffle_info.clone(),
                    winner_info.clone(),
                    consumer_program_info.clone(),
                ],
                &[&[COORDINATOR_AUTHORITY_SEED, &[bump]]],
            )
        }
    }
}

/// Logs and return data of a simulated transaction
pub struct Simulation {
    pub logs: Vec<String>,
    pub return_data: Option<TransactionReturnData>,
}

pub fn custom_error(error: RaffleError) -> TransactionError {
    TransactionError::InstructionError(0, InstructionError::Custom(error as u32))
}

pub struct TestEnv {
    pub context: ProgramTestContext,
    pub program_id: Pubkey,
    pub coordinator_id: Pubkey,
    pub coordinator_state: Pubkey,
    pub raffle: Pubkey,
}

impl TestEnv {
    /// Start a bank with the raffle and the mock coordinator loaded
    pub async fn start() -> Self {
        Self::start_with_raffle_lamports(0).await
    }

    /// Start a bank where the raffle address already holds `lamports`
    /// as a plain system account
    pub async fn start_with_raffle_lamports(lamports: u64) -> Self {
        let program_id = Pubkey::new_unique();
        let coordinator_id = Pubkey::new_unique();

        let mut program_test =
            ProgramTest::new("autoraffle", program_id, processor!(process_instruction));
        program_test.add_program(
            "mock_vrf_coordinator",
            coordinator_id,
            processor!(process_mock_coordinator),
        );

        let (coordinator_state, _) =
            Pubkey::find_program_address(&[MOCK_STATE_SEED], &coordinator_id);
        program_test.add_account(
            coordinator_state,
            Account {
                lamports: 10_000_000,
                data: vec![0; MOCK_STATE_LEN],
                owner: coordinator_id,
                executable: false,
                rent_epoch: 0,
            },
        );

        let (raffle, _) = find_raffle_address(&program_id);
        if lamports > 0 {
            program_test.add_account(
                raffle,
                Account {
                    lamports,
                    data: vec![],
                    owner: system_program::id(),
                    executable: false,
                    rent_epoch: 0,
                },
            );
        }

        let context = program_test.start_with_context().await;

        Self {
            context,
            program_id,
            coordinator_id,
            coordinator_state,
            raffle,
        }
    }

    /// Start a bank and create the raffle with the given fee and interval
    pub async fn with_raffle(entrance_fee: u64, interval: u64) -> Self {
        let mut env = Self::start().await;
        let config = env.config(entrance_fee, interval);
        env.initialize(config).await.unwrap();
        env
    }

    pub fn config(&self, entrance_fee: u64, interval: u64) -> RaffleConfig {
        RaffleConfig {
            entrance_fee,
            interval,
            coordinator: self.coordinator_id,
            gas_lane: GAS_LANE,
            subscription_id: SUBSCRIPTION_ID,
            callback_gas_limit: CALLBACK_GAS_LIMIT,
            request_confirmations: REQUEST_CONFIRMATIONS,
        }
    }

    fn sign(&self, instructions: &[Instruction], signers: &[&Keypair]) -> Transaction {
        let mut all_signers = vec![&self.context.payer];
        all_signers.extend_from_slice(signers);
        Transaction::new_signed_with_payer(
            instructions,
            Some(&self.context.payer.pubkey()),
            &all_signers,
            self.context.last_blockhash,
        )
    }

    pub async fn process(
        &mut self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> Result<(), TransactionError> {
        let transaction = self.sign(instructions, signers);
        self.context
            .banks_client
            .process_transaction(transaction)
            .await
            .map_err(|e| e.unwrap())
    }

    /// Simulate a transaction that must succeed, without committing it
    pub async fn simulate(
        &mut self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> Simulation {
        let transaction = self.sign(instructions, signers);
        let outcome = self
            .context
            .banks_client
            .simulate_transaction(transaction)
            .await
            .unwrap();
        assert_eq!(outcome.result, Some(Ok(())));
        let details = outcome.simulation_details.unwrap();
        Simulation {
            logs: details.logs,
            return_data: details.return_data,
        }
    }

    /// Commit a transaction and return the logs it produced
    pub async fn process_logged(
        &mut self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> Vec<String> {
        let simulation = self.simulate(instructions, signers).await;
        self.process(instructions, signers).await.unwrap();
        simulation.logs
    }

    pub async fn initialize(&mut self, config: RaffleConfig) -> Result<(), TransactionError> {
        let payer = self.context.payer.pubkey();
        let instruction = raffle_instruction::initialize(&self.program_id, &payer, config);
        self.process(&[instruction], &[]).await
    }

    /// Create `count` players holding `lamports` each
    pub async fn funded_players(&mut self, count: usize, lamports: u64) -> Vec<Keypair> {
        let players: Vec<Keypair> = (0..count).map(|_| Keypair::new()).collect();
        let payer = self.context.payer.pubkey();
        let transfers: Vec<Instruction> = players
            .iter()
            .map(|player| system_instruction::transfer(&payer, &player.pubkey(), lamports))
            .collect();
        self.process(&transfers, &[]).await.unwrap();
        players
    }

    pub async fn enter(&mut self, player: &Keypair, payment: u64) -> Result<(), TransactionError> {
        let instruction =
            raffle_instruction::enter_raffle(&self.program_id, &player.pubkey(), payment);
        self.process(&[instruction], &[player]).await
    }

    pub async fn check_upkeep(&mut self, check_data: Vec<u8>) -> Result<(), TransactionError> {
        let instruction = raffle_instruction::check_upkeep(&self.program_id, check_data);
        self.process(&[instruction], &[]).await
    }

    pub fn perform_upkeep_instruction(&self, perform_data: Vec<u8>) -> Instruction {
        raffle_instruction::perform_upkeep(
            &self.program_id,
            &self.coordinator_id,
            &[AccountMeta::new(self.coordinator_state, false)],
            perform_data,
        )
    }

    pub async fn perform_upkeep(&mut self, perform_data: Vec<u8>) -> Result<(), TransactionError> {
        let instruction = self.perform_upkeep_instruction(perform_data);
        self.process(&[instruction], &[]).await
    }

    /// Mock coordinator instruction that delivers random words to the raffle
    pub fn fulfill_instruction(
        &self,
        request_id: u64,
        random_words: Vec<u64>,
        winner: &Pubkey,
    ) -> Instruction {
        let (authority, _) = find_coordinator_authority(&self.coordinator_id);
        let data = MockCoordinatorInstruction::FulfillRandomWords {
            request_id,
            random_words,
        }
        .try_to_vec()
        .unwrap();
        Instruction {
            program_id: self.coordinator_id,
            accounts: vec![
                AccountMeta::new_readonly(authority, false),
                AccountMeta::new_readonly(self.program_id, false),
                AccountMeta::new(self.raffle, false),
                AccountMeta::new(*winner, false),
            ],
            data,
        }
    }

    /// Deliver random words through the mock coordinator
    pub async fn fulfill(
        &mut self,
        request_id: u64,
        random_words: Vec<u64>,
        winner: &Pubkey,
    ) -> Result<(), TransactionError> {
        let instruction = self.fulfill_instruction(request_id, random_words, winner);
        self.process(&[instruction], &[]).await
    }

    pub async fn advance_clock(&mut self, seconds: i64) {
        let mut clock: Clock = self.context.banks_client.get_sysvar().await.unwrap();
        clock.unix_timestamp += seconds;
        self.context.set_sysvar(&clock);
    }

    pub async fn now(&mut self) -> i64 {
        let clock: Clock = self.context.banks_client.get_sysvar().await.unwrap();
        clock.unix_timestamp
    }

    pub async fn raffle_state(&mut self) -> Raffle {
        let account = self
            .context
            .banks_client
            .get_account(self.raffle)
            .await
            .unwrap()
            .unwrap();
        Raffle::unpack(&account.data).unwrap()
    }

    pub async fn coordinator_state(&mut self) -> MockCoordinatorState {
        let account = self
            .context
            .banks_client
            .get_account(self.coordinator_state)
            .await
            .unwrap()
            .unwrap();
        MockCoordinatorState::deserialize(&mut &account.data[..]).unwrap()
    }

    pub async fn balance(&mut self, address: &Pubkey) -> u64 {
        self.context.banks_client.get_balance(*address).await.unwrap()
    }
}
