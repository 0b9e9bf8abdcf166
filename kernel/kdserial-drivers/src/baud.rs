//! Fixed baud-rate to divisor tables.
//!
//! Each family ships a literal table of the rates its reference clock can
//! produce exactly. A rate that is not in the table snaps to the slowest
//! entry rather than being interpolated.

/// One supported line rate and the divisor that produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivisorEntry {
    /// Bits per second.
    pub rate: u32,
    /// Value programmed into the clock divider.
    pub divisor: u32,
}

impl DivisorEntry {
    /// Creates a table entry.
    #[must_use]
    pub const fn new(rate: u32, divisor: u32) -> Self {
        Self { rate, divisor }
    }
}

/// A family's divisor table.
#[derive(Debug, Clone, Copy)]
pub struct DivisorTable {
    entries: &'static [DivisorEntry],
    slowest: DivisorEntry,
}

impl DivisorTable {
    /// Builds a table whose fallback is `slowest`.
    ///
    /// `slowest` must also appear in `entries`.
    #[must_use]
    pub const fn new(entries: &'static [DivisorEntry], slowest: DivisorEntry) -> Self {
        Self { entries, slowest }
    }

    /// Looks up `rate`, snapping unknown rates to the slowest entry.
    #[must_use]
    pub fn lookup(&self, rate: u32) -> DivisorEntry {
        self.entries
            .iter()
            .copied()
            .find(|e| e.rate == rate)
            .unwrap_or(self.slowest)
    }

    /// Returns the fallback entry.
    #[must_use]
    pub const fn slowest(&self) -> DivisorEntry {
        self.slowest
    }

    /// Returns every entry.
    #[must_use]
    pub const fn entries(&self) -> &'static [DivisorEntry] {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ENTRIES: [DivisorEntry; 3] = [
        DivisorEntry::new(115_200, 1),
        DivisorEntry::new(57_600, 2),
        DivisorEntry::new(9_600, 12),
    ];
    const TABLE: DivisorTable = DivisorTable::new(&ENTRIES, DivisorEntry::new(9_600, 12));

    #[test]
    fn exact_rates_hit_their_entry() {
        assert_eq!(TABLE.lookup(57_600).divisor, 2);
        assert_eq!(TABLE.lookup(115_200).divisor, 1);
    }

    #[test]
    fn unknown_rates_snap_to_slowest() {
        for rate in [0, 1, 300, 76_800, 230_400, u32::MAX] {
            assert_eq!(TABLE.lookup(rate), TABLE.slowest(), "rate {rate}");
        }
    }

    #[test]
    fn slowest_is_a_table_entry() {
        assert!(TABLE.entries().contains(&TABLE.slowest()));
    }
}
