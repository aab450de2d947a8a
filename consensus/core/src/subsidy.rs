use crate::BlockHeight;

/// Block reward at `height`: the initial subsidy halved every `halving_interval` blocks.
pub fn block_subsidy(height: BlockHeight, initial_subsidy: u64, halving_interval: u64) -> u64 {
    if halving_interval == 0 {
        return initial_subsidy;
    }
    let halvings = height / halving_interval;
    if halvings >= 64 {
        return 0;
    }
    initial_subsidy >> halvings
}
