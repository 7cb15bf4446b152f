//! Record-key generation.
//!
//! A record key is a 13-character, base32-sortable identifier derived from
//! microseconds since the epoch plus a per-process clock id. Keys from one
//! generator are strictly monotonic even if the wall clock stalls or steps
//! backwards. A key is immutable once a record is created; updates must
//! reuse the original.

use rand::Rng;
use std::sync::Mutex;

/// Sortable base32 alphabet (digits sort before letters, no padding).
const ALPHABET: &[u8; 32] = b"234567abcdefghijklmnopqrstuvwxyz";

const TIMESTAMP_CHARS: usize = 11;
const CLOCK_ID_CHARS: usize = 2;

pub struct TidGenerator {
    clock_id: u16,
    last_micros: Mutex<u64>,
}

impl Default for TidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TidGenerator {
    pub fn new() -> Self {
        Self {
            clock_id: rand::thread_rng().gen_range(0..1024),
            last_micros: Mutex::new(0),
        }
    }

    /// Next record key, strictly greater than any previously issued by this
    /// generator.
    pub fn next_tid(&self) -> String {
        let now = chrono::Utc::now()
            .timestamp_micros()
            .try_into()
            .unwrap_or(0u64);
        let mut last = self.last_micros.lock().expect("tid clock poisoned");
        let micros = now.max(*last + 1);
        *last = micros;
        format!(
            "{}{}",
            s32_encode(micros, TIMESTAMP_CHARS),
            s32_encode(u64::from(self.clock_id), CLOCK_ID_CHARS)
        )
    }
}

/// Is `s` shaped like a record key this generator produces?
pub fn is_tid(s: &str) -> bool {
    s.len() == TIMESTAMP_CHARS + CLOCK_ID_CHARS
        && s.bytes().all(|b| ALPHABET.contains(&b))
}

fn s32_encode(mut n: u64, width: usize) -> String {
    let mut out = vec![ALPHABET[0]; width];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(n % 32) as usize];
        n /= 32;
        if n == 0 {
            break;
        }
    }
    String::from_utf8(out).expect("alphabet is ascii")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tids_are_13_chars_of_the_sortable_alphabet() {
        let generator = TidGenerator::new();
        let tid = generator.next_tid();
        assert!(is_tid(&tid), "unexpected tid {tid:?}");
    }

    #[test]
    fn tids_strictly_increase() {
        let generator = TidGenerator::new();
        let mut previous = generator.next_tid();
        for _ in 0..1000 {
            let next = generator.next_tid();
            assert!(next > previous, "{next} not after {previous}");
            previous = next;
        }
    }

    #[test]
    fn lexicographic_order_follows_time_order() {
        assert!(s32_encode(1, 11) < s32_encode(2, 11));
        assert!(s32_encode(31, 11) < s32_encode(32, 11));
        assert!(s32_encode(u64::from(u32::MAX), 11) < s32_encode(u64::from(u32::MAX) + 1, 11));
    }

    #[test]
    fn rejects_foreign_shapes() {
        assert!(!is_tid(""));
        assert!(!is_tid("3jzfcijpj2z2")); // 12 chars
        assert!(!is_tid("3jzfcijpj2z2A")); // uppercase
        assert!(is_tid("3jzfcijpj2z2a"));
    }
}
