//! 32-bit carryless range coder: the arithmetic back end that turns the
//! predictor's bit probabilities into (and back out of) a compressed byte
//! stream (§4.19). Grounded on `Encoder_t` in `Moruga.cpp`.

use crate::error::Result;
use crate::io::{ByteSink, ByteSource};

const TOP: u32 = 0xFFFF_FFFF;

pub struct RangeEncoder<'a, W: ByteSink> {
    low: u32,
    high: u32,
    mid: u32,
    sink: &'a mut W,
}

impl<'a, W: ByteSink> RangeEncoder<'a, W> {
    pub fn new(sink: &'a mut W) -> RangeEncoder<'a, W> {
        RangeEncoder { low: 0, high: TOP, mid: 0, sink }
    }

    /// Narrows `[low, high]` to the sub-range implied by 16-bit probability
    /// `pr16` (probability that the next bit is 1), matching the
    /// reference's `Rescale`: `low + (delta * pr16) / 0x10000`.
    fn rescale(&mut self, pr16: u32) {
        let delta = u64::from(self.high - self.low);
        let mid = self.low + ((delta * u64::from(pr16)) >> 16) as u32;
        self.mid = mid;
    }

    pub fn encode(&mut self, bit: u8, pr16: u32) -> Result<()> {
        self.rescale(pr16);
        if bit != 0 {
            self.high = self.mid;
        } else {
            self.low = self.mid + 1;
        }
        while (self.low ^ self.high) & 0xFF00_0000 == 0 {
            self.sink.write_byte((self.high >> 24) as u8)?;
            self.low <<= 8;
            self.high = (self.high << 8) | 0xFF;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        for _ in 0..4 {
            self.sink.write_byte((self.high >> 24) as u8)?;
            self.high <<= 8;
        }
        self.sink.flush()
    }
}

pub struct RangeDecoder<'a, R: ByteSource> {
    low: u32,
    high: u32,
    code: u32,
    source: &'a mut R,
}

impl<'a, R: ByteSource> RangeDecoder<'a, R> {
    pub fn new(source: &'a mut R) -> Result<RangeDecoder<'a, R>> {
        let mut code = 0u32;
        for _ in 0..4 {
            code = (code << 8) | u32::from(source.read_byte()?);
        }
        Ok(RangeDecoder { low: 0, high: TOP, code, source })
    }

    pub fn decode(&mut self, pr16: u32) -> Result<u8> {
        let delta = u64::from(self.high - self.low);
        let mid = self.low + ((delta * u64::from(pr16)) >> 16) as u32;
        let bit = if self.code <= mid { 1 } else { 0 };
        if bit != 0 {
            self.high = mid;
        } else {
            self.low = mid + 1;
        }
        while (self.low ^ self.high) & 0xFF00_0000 == 0 {
            self.low <<= 8;
            self.high = (self.high << 8) | 0xFF;
            self.code = (self.code << 8) | u32::from(self.source.read_byte()?);
        }
        Ok(bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Sink;
    use std::io::Cursor;

    #[test]
    fn roundtrips_a_skewed_bit_sequence() {
        let bits: Vec<u8> = (0..2000).map(|i| if i % 5 == 0 { 1 } else { 0 }).collect();
        let mut buf = Vec::new();
        {
            let mut sink = Sink(&mut buf);
            let mut enc = RangeEncoder::new(&mut sink);
            for &b in &bits {
                enc.encode(b, 0xC000).unwrap();
            }
            enc.flush().unwrap();
        }
        let mut cur = Cursor::new(buf);
        let mut dec = RangeDecoder::new(&mut cur).unwrap();
        for &expected in &bits {
            assert_eq!(dec.decode(0xC000).unwrap(), expected);
        }
    }
}
