//! Stream-level encode/decode: header layout, checksum, and the bit loop
//! that drives the predictor through the range coder (§6). Grounded on
//! `Encoder_t`/the archive header layout in `Moruga.cpp`, adapted from a
//! multi-file archive container down to the single-stream shape `spec.md`
//! §6 describes.
//!
//! Stream layout: 1-byte memory level, VLI original length, VLI
//! post-preprocessor length (equal to the original length when
//! `TextPreprocessor::encode` did nothing), the four dictionary-offset VLIs
//! only when those lengths differ, a 1-byte header checksum, then the
//! arithmetic-coded payload. `encode`/`decode` are the common-case entry
//! points running the no-op `NullPreprocessor`/`NullFilter`; `encode_with`/
//! `decode_with` take real collaborators and a `Progress` handle.

use crate::config::{Level, PreprocessorConfig};
use crate::error::{Error, Result};
use crate::io::{read_vli, write_vli, ByteSink, Filter, NullFilter, NullPreprocessor, Sink, TextPreprocessor};
use crate::predictor::Predictor;
use crate::progress::Progress;
use crate::range_coder::{RangeDecoder, RangeEncoder};

fn header_checksum(level: u8, len: u64, preprocessor_len: u64) -> u8 {
    let mut acc = u32::from(level);
    acc = acc.wrapping_mul(31).wrapping_add((len & 0xFF) as u32);
    acc = acc.wrapping_mul(31).wrapping_add(((len >> 32) & 0xFF) as u32);
    acc = acc.wrapping_mul(31).wrapping_add((preprocessor_len & 0xFF) as u32);
    (acc & 0xFF) as u8
}

pub fn encode(level: Level, input: &[u8], out: &mut impl std::io::Write) -> Result<()> {
    encode_with(level, input, out, &mut NullPreprocessor, &mut NullFilter, &Progress::new())
}

pub fn decode(src: &mut impl std::io::Read) -> Result<Vec<u8>> {
    decode_with(src, &mut NullPreprocessor, &mut NullFilter, &Progress::new())
}

/// Runs the text preprocessor and filter ahead of the arithmetic coder
/// (§2's data-flow order: preprocessor, then filter, then core), writing
/// the §6 stream layout including the dictionary-offset fields whenever
/// preprocessing actually changed the byte count.
pub fn encode_with(
    level: Level,
    input: &[u8],
    out: &mut impl std::io::Write,
    preprocessor: &mut impl TextPreprocessor,
    filter: &mut impl Filter,
    progress: &Progress,
) -> Result<()> {
    let preprocessed = preprocessor.encode(input)?;
    let cfg = preprocessor.config();
    let filtered = filter.forward(&preprocessed)?;

    let mut sink = Sink(out);
    let len = input.len() as u64;
    let post_len = preprocessed.len() as u64;
    sink.write_byte(level.value())?;
    write_vli(&mut sink, len)?;
    write_vli(&mut sink, post_len)?;
    if post_len != len {
        write_vli(&mut sink, cfg.data_pos() as u64)?;
        write_vli(&mut sink, cfg.dic_start_offset() as u64)?;
        write_vli(&mut sink, cfg.dic_end_offset() as u64)?;
        write_vli(&mut sink, cfg.dic_words() as u64)?;
    }
    sink.write_byte(header_checksum(level.value(), len, post_len))?;

    progress.add_in(len);

    let mut predictor = Predictor::new(u32::from(level.value()) + 10);
    predictor.set_number_of_words(cfg.dic_words().max(0) as u32);
    {
        let mut enc = RangeEncoder::new(&mut sink);
        for &byte in &filtered {
            for bpos in 0..8u32 {
                let bit = (byte >> (7 - bpos)) & 1;
                let pr16 = predictor.predict();
                enc.encode(bit, pr16)?;
                predictor.update(bit);
            }
        }
        enc.flush()?;
    }
    sink.flush()?;
    progress.add_out(post_len);
    Ok(())
}

/// Inverse of `encode_with`: decodes the arithmetic-coded payload, runs the
/// filter's inverse transform, configures the preprocessor from the header's
/// dictionary-offset fields (when present), and finally runs the
/// preprocessor's inverse transform to recover the original bytes.
pub fn decode_with(
    src: &mut impl std::io::Read,
    preprocessor: &mut impl TextPreprocessor,
    filter: &mut impl Filter,
    progress: &Progress,
) -> Result<Vec<u8>> {
    let level_byte = crate::io::ByteSource::read_byte(src)?;
    let level = Level::new(level_byte)?;
    let len = read_vli(src)?;
    let post_len = read_vli(src)?;

    let mut cfg = PreprocessorConfig::default();
    if post_len != len {
        cfg.set_data_pos(read_vli(src)? as i64);
        cfg.set_dic_start_offset(read_vli(src)? as i64);
        cfg.set_dic_end_offset(read_vli(src)? as i64);
        cfg.set_dic_words(read_vli(src)? as i64);
    }

    let checksum = crate::io::ByteSource::read_byte(src)?;
    if checksum != header_checksum(level_byte, len, post_len) {
        return Err(Error::ChecksumMismatch);
    }

    let mut predictor = Predictor::new(u32::from(level.value()) + 10);
    predictor.set_number_of_words(cfg.dic_words().max(0) as u32);
    let mut filtered = Vec::with_capacity(post_len as usize);
    let mut dec = RangeDecoder::new(src)?;
    for _ in 0..post_len {
        let mut byte = 0u8;
        for _ in 0..8 {
            let pr16 = predictor.predict();
            let bit = dec.decode(pr16)?;
            predictor.update(bit);
            byte = (byte << 1) | bit;
        }
        filtered.push(byte);
    }
    progress.add_in(post_len);

    let unfiltered = filter.inverse(&filtered)?;
    preprocessor.configure(cfg);
    let output = preprocessor.decode(&unfiltered)?;
    progress.add_out(output.len() as u64);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrips_text() {
        let level = Level::new(0).unwrap();
        let input = b"the quick brown fox jumps over the lazy dog, again and again and again";
        let mut buf = Vec::new();
        encode(level, input, &mut buf).unwrap();
        let mut cur = Cursor::new(buf);
        let output = decode(&mut cur).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn rejects_corrupted_header_checksum() {
        let level = Level::new(0).unwrap();
        let mut buf = Vec::new();
        encode(level, b"abc", &mut buf).unwrap();
        let checksum_idx = 1 + vli_len(3) + vli_len(3);
        buf[checksum_idx] ^= 0xFF;
        let mut cur = Cursor::new(buf);
        assert!(matches!(decode(&mut cur), Err(Error::ChecksumMismatch)));
    }

    #[test]
    fn progress_counters_track_bytes_on_both_sides() {
        let level = Level::new(0).unwrap();
        let input = b"some sample text to compress for progress tracking";
        let mut buf = Vec::new();
        let progress = Progress::new();
        encode_with(level, input, &mut buf, &mut crate::io::NullPreprocessor, &mut crate::io::NullFilter, &progress).unwrap();
        assert_eq!(progress.bytes_in(), input.len() as u64);
        assert_eq!(progress.bytes_out(), input.len() as u64);

        let mut cur = Cursor::new(buf);
        let decode_progress = Progress::new();
        let output = decode_with(&mut cur, &mut crate::io::NullPreprocessor, &mut crate::io::NullFilter, &decode_progress).unwrap();
        assert_eq!(output, input);
        assert_eq!(decode_progress.bytes_out(), input.len() as u64);
    }

    fn vli_len(mut v: u64) -> usize {
        let mut n = 1;
        v >>= 7;
        while v != 0 {
            n += 1;
            v >>= 7;
        }
        n
    }
}
