//! Integration tests for the Paillier tally library

use num_bigint::{BigUint, RandBigInt};
use rand::thread_rng;

use paillier_tally::records::{load_json, save_json};
use paillier_tally::{
    aggregate, aggregate_parallel, homomorphic_add, AggregateRecord, BallotBox, Ciphertext,
    Election, ElectionConfig, ElectionState, HomomorphicOperations, KeyPair, PaillierAuthority,
    PaillierConfig, PaillierError, PrivateKey, PrivateKeyRecord, PublicKey, PublicKeyRecord,
    VoteCodec,
};

fn authority(prime_bits: u64) -> PaillierAuthority {
    PaillierAuthority::new(KeyPair::generate(prime_bits).expect("Failed to generate keys"))
}

#[test]
fn test_round_trip_random_plaintexts() {
    let authority = authority(64);
    let n = authority.public_key().modulus().clone();
    let mut rng = thread_rng();

    for _ in 0..50 {
        let m = rng.gen_biguint_below(&n);
        let ct = authority.public().encrypt(&m).unwrap();
        assert_eq!(authority.decrypt(&ct).unwrap(), m);
    }
}

#[test]
fn test_homomorphism_random_plaintexts() {
    let authority = authority(64);
    let n = authority.public_key().modulus().clone();
    let n_squared = authority.public_key().modulus_squared().clone();
    let mut rng = thread_rng();

    for _ in 0..25 {
        let m1 = rng.gen_biguint_below(&n);
        let m2 = rng.gen_biguint_below(&n);

        let ct1 = authority.public().encrypt(&m1).unwrap();
        let ct2 = authority.public().encrypt(&m2).unwrap();
        let sum = homomorphic_add(&ct1, &ct2, &n_squared).unwrap();

        assert_eq!(authority.decrypt(&sum).unwrap(), (m1 + m2) % &n);
    }
}

#[test]
fn test_encryptions_differ_but_agree() {
    let authority = authority(64);
    let m = BigUint::from(123_456u32);

    let ciphertexts: Vec<Ciphertext> = (0..10)
        .map(|_| authority.public().encrypt(&m).unwrap())
        .collect();

    for (i, a) in ciphertexts.iter().enumerate() {
        for b in &ciphertexts[i + 1..] {
            assert_ne!(a, b);
        }
        assert_eq!(authority.decrypt(a).unwrap(), m);
    }
}

#[test]
fn test_fold_shape_does_not_change_sum() {
    let authority = authority(64);
    let paillier = authority.public();
    let values: Vec<BigUint> = [5u32, 11, 17, 23, 29].iter().map(|v| BigUint::from(*v)).collect();
    let cts = paillier.encrypt_batch(&values).unwrap();
    let expected = BigUint::from(85u32);

    // ((((c0 c1) c2) c3) c4)
    let left = aggregate(&cts, paillier.public_key()).unwrap();

    // (c0 (c1 (c2 (c3 c4))))
    let right = cts[..4].iter().rev().fold(cts[4].clone(), |acc, ct| {
        paillier.homomorphic_add(ct, &acc).unwrap()
    });

    // ((c4 c2) (c0 (c3 c1)))
    let pair_a = paillier.homomorphic_add(&cts[4], &cts[2]).unwrap();
    let pair_b = paillier.homomorphic_add(&cts[3], &cts[1]).unwrap();
    let pair_b = paillier.homomorphic_add(&cts[0], &pair_b).unwrap();
    let tree = paillier.homomorphic_add(&pair_a, &pair_b).unwrap();

    let parallel = aggregate_parallel(&cts, paillier.public_key()).unwrap();

    for ct in [&left, &right, &tree, &parallel] {
        assert_eq!(authority.decrypt(ct).unwrap(), expected);
    }
}

#[test]
fn test_three_candidate_tally_is_exact() {
    let authority = authority(64);
    let codec = VoteCodec::new(3, 1000).unwrap();
    codec.check_capacity(authority.public_key()).unwrap();

    let ballots: Vec<Ciphertext> = [0usize, 2, 0]
        .iter()
        .map(|&choice| codec.encode_ballot(choice, authority.public()).unwrap())
        .collect();

    let encrypted_sum = aggregate(&ballots, authority.public_key()).unwrap();
    let total = authority.decrypt(&encrypted_sum).unwrap();
    assert_eq!(total, BigUint::from(1_000_002u32));

    let tally = codec.decode_with_ballot_count(&total, ballots.len() as u64);
    assert_eq!(tally.counts, vec![2, 0, 1]);
    assert!(!tally.overflow);
}

#[test]
fn test_slot_overflow_is_reported() {
    let authority = authority(32);
    let codec = VoteCodec::new(3, 1000).unwrap();
    codec.check_capacity(authority.public_key()).unwrap();

    // 1000 ballots for candidate 0 fill its slot and carry into candidate 1
    let plaintexts = vec![codec.encode_choice(0).unwrap(); 1000];
    let ballots = authority.public().encrypt_batch(&plaintexts).unwrap();
    let encrypted_sum = aggregate_parallel(&ballots, authority.public_key()).unwrap();
    let total = authority.decrypt(&encrypted_sum).unwrap();

    let tally = codec.decode_with_ballot_count(&total, ballots.len() as u64);
    assert!(tally.overflow);
    assert!(matches!(
        tally.into_checked(),
        Err(PaillierError::DecodeOverflow { .. })
    ));
}

#[test]
fn test_top_slot_overflow_is_reported_without_ballot_count() {
    let authority = authority(32);
    let codec = VoteCodec::new(2, 10).unwrap();

    let plaintexts = vec![codec.encode_choice(1).unwrap(); 10];
    let ballots = authority.public().encrypt_batch(&plaintexts).unwrap();
    let encrypted_sum = aggregate(&ballots, authority.public_key()).unwrap();
    let total = authority.decrypt(&encrypted_sum).unwrap();

    assert!(matches!(
        codec.decode_checked(&total),
        Err(PaillierError::DecodeOverflow { .. })
    ));
}

#[test]
fn test_empty_aggregate_is_an_error() {
    let authority = authority(32);
    assert_eq!(
        aggregate(&[], authority.public_key()).unwrap_err(),
        PaillierError::EmptyAggregate
    );
    assert_eq!(
        aggregate_parallel(&[], authority.public_key()).unwrap_err(),
        PaillierError::EmptyAggregate
    );
}

#[test]
fn test_election_end_to_end() {
    let config = ElectionConfig::new(["Alice", "Bob", "Carol", "Dave"], 100).unwrap();
    let mut election = Election::new(config).unwrap();

    election
        .issue_keys(&PaillierConfig {
            prime_bits: 64,
            primality_rounds: 20,
        })
        .unwrap();
    election.open_voting().unwrap();

    let votes = [3usize, 1, 3, 0, 3, 1];
    for &choice in &votes {
        election.cast_vote(choice).unwrap();
    }

    election.tally().unwrap();
    let result = election.reveal().unwrap();

    assert_eq!(
        result.tallies,
        vec![
            ("Alice".to_string(), 1),
            ("Bob".to_string(), 2),
            ("Carol".to_string(), 0),
            ("Dave".to_string(), 3),
        ]
    );
    assert_eq!(result.ballot_count, 6);
    assert!(!result.overflow);
    assert_eq!(election.state(), ElectionState::Revealed);
}

#[test]
fn test_election_overflow_is_flagged() {
    let config = ElectionConfig::new(["Alice", "Bob"], 3).unwrap();
    let mut election = Election::new(config).unwrap();
    election
        .issue_keys(&PaillierConfig {
            prime_bits: 32,
            primality_rounds: 20,
        })
        .unwrap();
    election.open_voting().unwrap();

    for _ in 0..3 {
        election.cast_vote(0).unwrap();
    }
    election.tally().unwrap();

    let result = election.reveal().unwrap();
    assert!(result.overflow);
}

#[test]
fn test_external_ballots_from_public_key_record() {
    let config = ElectionConfig::new(["Yes", "No"], 1000).unwrap();
    let mut election = Election::new(config.clone()).unwrap();
    election
        .issue_keys(&PaillierConfig {
            prime_bits: 64,
            primality_rounds: 20,
        })
        .unwrap();
    election.open_voting().unwrap();

    // a voter client that only ever sees the public record
    let public_key = PublicKey::try_from(election.public_key_record().unwrap()).unwrap();
    let voter = paillier_tally::Paillier::new(public_key);
    let codec = config.codec().unwrap();

    for choice in [1usize, 1, 0] {
        let ballot = codec.encode_ballot(choice, &voter).unwrap();
        election.submit_ballot(ballot).unwrap();
    }

    election.tally().unwrap();
    let result = election.reveal().unwrap();
    assert_eq!(result.votes_for("Yes"), Some(1));
    assert_eq!(result.votes_for("No"), Some(2));
}

#[test]
fn test_roles_through_record_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = ElectionConfig::new(["Alice", "Bob", "Carol"], 1000).unwrap();

    // authority: issue keys and publish
    let keypair = KeyPair::generate(64).unwrap();
    save_json(dir.path().join("config.json"), &config).unwrap();
    save_json(
        dir.path().join("public.json"),
        &PublicKeyRecord::from(&keypair.public_key),
    )
    .unwrap();
    save_json(
        dir.path().join("private.json"),
        &PrivateKeyRecord::from(&keypair.private_key),
    )
    .unwrap();

    // voters: encrypt with the public key only
    let public_key =
        PublicKey::try_from(load_json::<PublicKeyRecord>(dir.path().join("public.json")).unwrap())
            .unwrap();
    let voter = paillier_tally::Paillier::new(public_key.clone());
    let codec = load_json::<ElectionConfig>(dir.path().join("config.json"))
        .unwrap()
        .codec()
        .unwrap();
    let ballots = BallotBox::new(
        [2usize, 2, 1, 0, 2]
            .iter()
            .map(|&choice| codec.encode_ballot(choice, &voter).unwrap())
            .collect(),
    );
    save_json(dir.path().join("ballots.json"), &ballots).unwrap();

    // aggregator: fold the ballot box
    let ballots: BallotBox = load_json(dir.path().join("ballots.json")).unwrap();
    let record = AggregateRecord {
        encrypted_sum: aggregate(&ballots.ballots, &public_key).unwrap(),
        ballot_count: Some(ballots.len() as u64),
    };
    save_json(dir.path().join("result.json"), &record).unwrap();

    // authority: decrypt and decode
    let private_record: PrivateKeyRecord = load_json(dir.path().join("private.json")).unwrap();
    let private_key = PrivateKey::try_from(private_record).unwrap();
    let authority = PaillierAuthority::from_parts(public_key, private_key).unwrap();
    let record: AggregateRecord = load_json(dir.path().join("result.json")).unwrap();
    let total = authority.decrypt(&record.encrypted_sum).unwrap();
    let tally = codec.decode_with_ballot_count(&total, record.ballot_count.unwrap());

    assert_eq!(tally.counts, vec![1, 1, 3]);
    assert!(!tally.overflow);
}
