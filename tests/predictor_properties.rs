use moruga_core::predictor::Predictor;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Every prediction the predictor hands to the range coder must be a valid
/// 16-bit probability strictly between 0 and 0x10000, or the range coder's
/// `Rescale` could collapse `[low, high]` to an empty interval.
#[test]
fn predictions_stay_in_valid_probability_range() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xC0FF_EE42);
    let mut predictor = Predictor::new(8);
    let mut buf = [0u8; 4096];
    rng.fill_bytes(&mut buf);

    for byte in buf {
        for bpos in 0..8u32 {
            let pr16 = predictor.predict();
            assert!(pr16 >= 1 && pr16 <= 0xFFFF, "pr16 out of range: {pr16}");
            let bit = (byte >> (7 - bpos)) & 1;
            predictor.update(bit);
        }
    }
}

/// A predictor trained on a long run of a single repeated byte should end
/// up confidently forecasting that byte's bits, exercising the match and
/// run-context models' convergence rather than just their plumbing.
#[test]
fn converges_on_a_long_repeated_byte() {
    let mut predictor = Predictor::new(10);
    let byte = 0xAAu8; // 10101010, easy to tell apart from a coin flip
    for _ in 0..20_000 {
        for bpos in 0..8u32 {
            let pr16 = predictor.predict();
            let bit = (byte >> (7 - bpos)) & 1;
            if bit == 1 {
                assert_eq!(bpos % 2, 0);
            }
            predictor.update(bit);
        }
    }
    // One more pass: predictions for the known-repeating bits should now
    // clearly favor the right side of the coin flip.
    let mut favorable = 0;
    let mut total = 0;
    for _ in 0..80 {
        let pr16 = predictor.predict() as i32;
        let bpos = total % 8;
        let expected_bit = (byte >> (7 - bpos)) & 1;
        if (expected_bit == 1 && pr16 > 0x8000) || (expected_bit == 0 && pr16 < 0x8000) {
            favorable += 1;
        }
        predictor.update(expected_bit);
        total += 1;
    }
    assert!(favorable > total / 2, "expected predictor to favor the repeated pattern: {favorable}/{total}");
}
