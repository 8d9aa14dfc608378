use std::fmt;

/// Splitting of a combined index into two sub-indices `(p, q)` with `p < n1` and `q < n2`.
/// The combined index is column-major, i.e. `p` runs fastest: `index = q * n1 + p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Factorization {
    pub n1: usize,
    pub n2: usize,
}

impl Factorization {
    pub fn new(n1: usize, n2: usize) -> Self {
        Self { n1, n2 }
    }

    /// Number of combined indices.
    pub fn size(&self) -> usize {
        self.n1 * self.n2
    }

    pub fn split(&self, index: usize) -> (usize, usize) {
        (index % self.n1, index / self.n1)
    }

    pub fn combine(&self, p: usize, q: usize) -> usize {
        debug_assert!(p < self.n1 && q < self.n2);
        q * self.n1 + p
    }
}

/// One of the four sub-indices of a matrix element whose row and column are both combined
/// indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubIndex {
    Row1,
    Row2,
    Col1,
    Col2,
}

impl SubIndex {
    const ALL: [SubIndex; 4] = [SubIndex::Row1, SubIndex::Row2, SubIndex::Col1, SubIndex::Col2];

    fn position(self) -> usize {
        match self {
            SubIndex::Row1 => 0,
            SubIndex::Row2 => 1,
            SubIndex::Col1 => 2,
            SubIndex::Col2 => 3,
        }
    }
}

/// Assignment of the source sub-indices to the four slots (row1, row2, col1, col2) of the
/// destination. `Permutation::new(Row1, Col1, Row2, Col2)` moves the source element
/// (r1, r2, c1, c2) to the destination element (r1, c1, r2, c2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permutation {
    slots: [SubIndex; 4],
}

impl Permutation {
    pub fn new(row1: SubIndex, row2: SubIndex, col1: SubIndex, col2: SubIndex) -> Self {
        let slots: [SubIndex; 4] = [row1, row2, col1, col2];
        for label in SubIndex::ALL.iter() {
            assert!(
                slots.contains(label),
                "permutation {:?} does not use the sub-index {:?}",
                slots,
                label
            );
        }
        Self { slots }
    }

    /// Applies the permutation to the source sub-indices `[r1, r2, c1, c2]`.
    pub fn apply<T: Copy>(&self, source: [T; 4]) -> [T; 4] {
        [
            source[self.slots[0].position()],
            source[self.slots[1].position()],
            source[self.slots[2].position()],
            source[self.slots[3].position()],
        ]
    }

}

#[cfg(test)]
impl Permutation {
    pub fn identity() -> Self {
        Self::new(SubIndex::Row1, SubIndex::Row2, SubIndex::Col1, SubIndex::Col2)
    }

    /// The permutation that moves every destination element back to its source position.
    pub fn inverse(&self) -> Self {
        let mut slots: [SubIndex; 4] = [SubIndex::Row1; 4];
        for (dest, source) in self.slots.iter().enumerate() {
            slots[source.position()] = SubIndex::ALL[dest];
        }
        Self { slots }
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:?}, {:?}, {:?}, {:?})",
            self.slots[0], self.slots[1], self.slots[2], self.slots[3]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_index_is_column_major() {
        let ia = Factorization::new(3, 4);
        assert_eq!(ia.combine(0, 0), 0);
        assert_eq!(ia.combine(2, 0), 2);
        assert_eq!(ia.combine(0, 1), 3);
        for index in 0..ia.size() {
            let (p, q) = ia.split(index);
            assert_eq!(ia.combine(p, q), index);
        }
    }

    #[test]
    fn inverse_undoes_permutation() {
        use SubIndex::*;
        for perm in [
            Permutation::new(Row1, Col1, Row2, Col2),
            Permutation::new(Row1, Col2, Col1, Row2),
            Permutation::new(Col2, Row1, Row2, Col1),
        ] {
            let source: [usize; 4] = [10, 11, 12, 13];
            assert_eq!(perm.inverse().apply(perm.apply(source)), source);
        }
        assert_eq!(Permutation::identity().inverse(), Permutation::identity());
    }

    #[test]
    #[should_panic]
    fn repeated_sub_index_is_rejected() {
        Permutation::new(SubIndex::Row1, SubIndex::Row1, SubIndex::Col1, SubIndex::Col2);
    }
}
