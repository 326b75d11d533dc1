/// Address of one blob in a pager. Leaves, stacked blocks and the catalog
/// each sit at their own key.
pub type PhysicalKey = u64;
