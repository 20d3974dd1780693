//! Pairing generators: produce, for a full sweep, a sequence of rounds each
//! containing disjoint index pairs, covering every unordered pair exactly
//! once per sweep.

/// One round: a list of disjoint, unordered `(p, q)` pairs with `p < q`.
pub type Round = Vec<(usize, usize)>;

/// Capability consulted once per sweep to get the round schedule.
///
/// Kept as a trait rather than a single concrete type so alternative
/// disjoint-per-round / full-coverage-per-sweep schedules (row-cyclic,
/// column-cyclic) can be swapped in for the production `MusicPairing`
/// without touching the sweep engine.
pub trait PairingGenerator: Send + Sync {
    /// Padded order this generator schedules over.
    fn padded_size(&self) -> usize;

    /// The `m - 1` rounds of a complete sweep, each with `m / 2` disjoint
    /// pairs, together covering every unordered pair `{i, j}` exactly once.
    fn sweep_rounds(&self) -> Vec<Round>;
}

/// The round-robin "music" schedule (equivalent to the standard
/// round-robin tournament construction): index `0` is fixed, the
/// remaining `m - 1` indices sit on a ring, and the ring rotates by one
/// position each round.
pub struct MusicPairing {
    m: usize,
}

impl MusicPairing {
    /// `n` is the logical matrix order; the schedule pads to the nearest
    /// even number internally, exactly matching `Matrix::size()`.
    pub fn new(n: usize) -> Self {
        let m = if n % 2 == 0 { n } else { n + 1 };
        Self { m }
    }
}

impl PairingGenerator for MusicPairing {
    fn padded_size(&self) -> usize {
        self.m
    }

    fn sweep_rounds(&self) -> Vec<Round> {
        let m = self.m;
        if m < 2 {
            return Vec::new();
        }

        // ring holds indices 1..m (length m - 1); ring[k] is "position k"
        // in round 0, rotated by k positions in round k.
        let ring_len = m - 1;
        let ring: Vec<usize> = (1..m).collect();

        (0..ring_len)
            .map(|k| {
                let mut round = Vec::with_capacity(m / 2);
                round.push(order(0, ring[k]));
                for i in 1..(m / 2) {
                    let a = ring[(k + i) % ring_len];
                    let b = ring[(k + ring_len - i) % ring_len];
                    round.push(order(a, b));
                }
                round
            })
            .collect()
    }
}

fn order(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
