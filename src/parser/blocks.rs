//! Block segmentation: split the recommendations section into one candidate
//! block per record entry.

/// Label that opens every recommendation entry. Splitting on it means the
/// delimiter itself never appears inside a block, so each block starts with
/// the id value.
pub const ID_LABEL: &str = "- Recommendation ID:";

/// Every occurrence of the id label starts a block; the block runs to the
/// next occurrence or the end of the section. Text before the first label
/// (prose preamble, the section heading line) belongs to no block.
pub fn candidate_blocks(section: &str) -> impl Iterator<Item = &str> {
    section.split(ID_LABEL).skip(1)
}
