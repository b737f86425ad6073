//! FAT16 file allocation table entry

use super::constants::*;

/// Represents a 16-bit FAT entry pointing to the next cluster in a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatEntry {
    /// Cluster number or special value (0=free, >=0xFFF8=end)
    pub cluster: u16,
}

impl FatEntry {
    /// Returns true if this entry marks the end of a cluster chain
    pub fn is_end_of_chain(&self) -> bool {
        self.cluster >= FAT_EOC_MIN
    }

    /// Returns true if this cluster is unused/free
    pub fn is_free(&self) -> bool {
        self.cluster == FAT_FREE
    }

    pub fn is_bad(&self) -> bool {
        self.cluster == FAT_BAD
    }

    /// Next cluster of the chain, if this entry links to one
    pub fn next(&self) -> Option<u16> {
        match self.cluster {
            FIRST_DATA_CLUSTER..=FAT_MAX_LINK => Some(self.cluster),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_special_values() {
        assert!(FatEntry { cluster: FAT_FREE }.is_free());
        assert!(FatEntry { cluster: 0xFFF8 }.is_end_of_chain());
        assert!(FatEntry { cluster: FAT_EOC }.is_end_of_chain());
        assert!(FatEntry { cluster: FAT_BAD }.is_bad());
        assert_eq!(FatEntry { cluster: FAT_RESERVED }.next(), None);
        assert_eq!(FatEntry { cluster: 0xFFF0 }.next(), None);
        assert_eq!(FatEntry { cluster: 0x0002 }.next(), Some(2));
        assert_eq!(FatEntry { cluster: FAT_MAX_LINK }.next(), Some(FAT_MAX_LINK));
    }
}
