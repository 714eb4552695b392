//! Runs one complete encrypted election: configure, issue keys, vote, tally, reveal.

use clap::Parser;
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use paillier_tally::election::DEFAULT_SLOT_SIZE;
use paillier_tally::records::{load_json, save_json};
use paillier_tally::{
    aggregate, AggregateRecord, BallotBox, Election, ElectionConfig, ElectionResult,
    PaillierAuthority, PaillierConfig, PaillierError, PrivateKey, PrivateKeyRecord, PublicKey,
    PublicKeyRecord, Result, TallyResult,
};

const CONFIG_FILE: &str = "election_config.json";
const PUBLIC_KEY_FILE: &str = "public_key.json";
const PRIVATE_KEY_FILE: &str = "private_key.json";
const BALLOT_BOX_FILE: &str = "ballot_box.json";
const AGGREGATE_FILE: &str = "encrypted_result.json";

#[derive(Parser, Debug)]
#[command(name = "paillier-tally", version, about = "Encrypted multi-candidate tally demo")]
struct Args {
    /// Candidate names, in ballot order
    #[arg(
        short,
        long = "candidate",
        default_values_t = ["Alice".to_string(), "Bob".to_string(), "Carol".to_string()]
    )]
    candidates: Vec<String>,

    /// Candidate index chosen by each voter, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [0usize, 2, 0, 1, 0])]
    votes: Vec<usize>,

    /// Per-candidate slot capacity; must exceed the number of ballots
    #[arg(long, default_value_t = DEFAULT_SLOT_SIZE)]
    slot_size: u64,

    /// Bit size of each secret prime
    #[arg(long, default_value_t = 128)]
    prime_bits: u64,

    /// Miller-Rabin rounds per prime candidate
    #[arg(long, default_value_t = 20)]
    rounds: usize,

    /// Write every exchanged record to this directory and tally from the files
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Prints debug messages
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let verb = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(err) = CombinedLogger::init(vec![TermLogger::new(
        verb,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]) {
        eprintln!("failed to initialise logging: {}", err);
    }

    match run(&args) {
        Ok(result) if result.overflow => {
            error!("tally failed its integrity check; results above are not trustworthy");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ElectionResult> {
    let config = ElectionConfig::new(args.candidates.iter().cloned(), args.slot_size)?;
    let mut election = Election::new(config)?;

    info!("generating key pair ({}-bit primes)...", args.prime_bits);
    election.issue_keys(&PaillierConfig {
        prime_bits: args.prime_bits,
        primality_rounds: args.rounds,
    })?;

    election.open_voting()?;
    for &choice in &args.votes {
        election.cast_vote(choice)?;
    }
    info!("{} ballots cast", election.ballots().len());

    election.tally()?;

    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir)?;
        save_records(&election, dir)?;
        verify_from_records(dir)?;
    }

    let result = election.reveal()?.clone();
    print_result(&result);
    Ok(result)
}

fn save_records(election: &Election, dir: &Path) -> Result<()> {
    save_json(dir.join(CONFIG_FILE), election.config())?;
    save_json(dir.join(PUBLIC_KEY_FILE), &election.public_key_record()?)?;
    save_json(dir.join(PRIVATE_KEY_FILE), &election.private_key_record()?)?;
    save_json(dir.join(BALLOT_BOX_FILE), &election.ballot_box())?;
    save_json(dir.join(AGGREGATE_FILE), &election.aggregate_record()?)?;
    Ok(())
}

/// Replay the aggregator and authority roles from the files alone
fn verify_from_records(dir: &Path) -> Result<TallyResult> {
    let public_key = PublicKey::try_from(load_json::<PublicKeyRecord>(dir.join(PUBLIC_KEY_FILE))?)?;
    let ballots: BallotBox = load_json(dir.join(BALLOT_BOX_FILE))?;
    let recomputed = aggregate(&ballots.ballots, &public_key)?;

    let stored: AggregateRecord = load_json(dir.join(AGGREGATE_FILE))?;
    if stored.encrypted_sum != recomputed {
        return Err(PaillierError::MalformedRecord(format!(
            "{} does not match the aggregate of {}",
            AGGREGATE_FILE, BALLOT_BOX_FILE
        )));
    }

    let private_key =
        PrivateKey::try_from(load_json::<PrivateKeyRecord>(dir.join(PRIVATE_KEY_FILE))?)?;
    let authority = PaillierAuthority::from_parts(public_key, private_key)?;
    let config: ElectionConfig = load_json(dir.join(CONFIG_FILE))?;
    let codec = config.codec()?;

    let total = authority.decrypt(&stored.encrypted_sum)?;
    let tally = codec
        .decode_with_ballot_count(&total, ballots.len() as u64)
        .into_checked()?;
    info!("reloaded records decode to {:?}", tally.counts);
    Ok(tally)
}

fn print_result(result: &ElectionResult) {
    println!("\n{:<12} | {:<8} |", "Candidate", "Votes");
    println!("{}", "-".repeat(40));
    for (name, count) in &result.tallies {
        let bar = "#".repeat(usize::try_from(*count).unwrap_or(usize::MAX).min(50));
        println!("{:<12} | {:<8} | {}", name, count, bar);
    }
    println!("{}", "-".repeat(40));
    println!(
        "Counted {} votes from {} ballots",
        result.total_votes(),
        result.ballot_count
    );

    if result.overflow {
        println!("\nWARNING: residual data after decoding; possible overflow attack");
    } else {
        println!("\nIntegrity check passed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paillier_tally::Ciphertext;

    fn tallied_election(votes: &[usize], slot_size: u64) -> Election {
        let config = ElectionConfig::new(["Alice", "Bob", "Carol"], slot_size).unwrap();
        let mut election = Election::new(config).unwrap();
        election
            .issue_keys(&PaillierConfig {
                prime_bits: 64,
                primality_rounds: 20,
            })
            .unwrap();
        election.open_voting().unwrap();
        for &choice in votes {
            election.cast_vote(choice).unwrap();
        }
        election.tally().unwrap();
        election
    }

    #[test]
    fn test_records_replay_to_same_tally() {
        let dir = tempfile::tempdir().unwrap();
        let election = tallied_election(&[0, 2, 0], 1000);
        save_records(&election, dir.path()).unwrap();

        let tally = verify_from_records(dir.path()).unwrap();
        assert_eq!(tally.counts, vec![2, 0, 1]);
    }

    #[test]
    fn test_tampered_aggregate_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let election = tallied_election(&[1, 1], 1000);
        save_records(&election, dir.path()).unwrap();

        let mut record: AggregateRecord = load_json(dir.path().join(AGGREGATE_FILE)).unwrap();
        let forged = election.ballots()[0].value() * election.ballots()[0].value();
        record.encrypted_sum = Ciphertext::new(forged);
        save_json(dir.path().join(AGGREGATE_FILE), &record).unwrap();

        assert!(matches!(
            verify_from_records(dir.path()),
            Err(PaillierError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_overflowing_records_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let election = tallied_election(&[0, 0, 0], 3);
        save_records(&election, dir.path()).unwrap();

        assert!(matches!(
            verify_from_records(dir.path()),
            Err(PaillierError::DecodeOverflow { .. })
        ));
    }
}
