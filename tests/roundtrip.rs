use moruga_core::{decode, encode, Level};
use std::io::Cursor;

fn roundtrip(level: u8, data: &[u8]) {
    let level = Level::new(level).unwrap();
    let mut compressed = Vec::new();
    encode(level, data, &mut compressed).unwrap();
    let mut cursor = Cursor::new(compressed);
    let decompressed = decode(&mut cursor).unwrap();
    assert_eq!(decompressed, data, "roundtrip mismatch at level {}", level.value());
}

#[test]
fn empty_input_roundtrips() {
    roundtrip(0, b"");
}

#[test]
fn single_byte_roundtrips() {
    roundtrip(0, b"x");
}

#[test]
fn repetitive_text_roundtrips_at_every_level() {
    let data = b"abcabcabcabcabcabcabcabcabcabcabcabcabcabcabcabc".repeat(20);
    for level in 0..=12 {
        roundtrip(level, &data);
    }
}

#[test]
fn binary_data_with_nulls_roundtrips() {
    let mut data = Vec::new();
    for i in 0..2000u32 {
        data.push((i % 256) as u8);
        if i % 7 == 0 {
            data.push(0);
        }
    }
    roundtrip(6, &data);
}

#[test]
fn mostly_text_with_dictionary_like_words_roundtrips() {
    let data = b"the quick brown fox jumps over the lazy dog. \
                 the dog barks at the fox. the fox runs away quickly."
        .repeat(5);
    roundtrip(3, &data);
}
