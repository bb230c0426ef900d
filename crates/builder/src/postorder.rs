use alloc::{vec, vec::Vec};
use core::slice;

use linearscan_pipeline::{BlockId, PipelineError};

use super::BuildError;

struct State<'a> {
	block: BlockId,
	successors: slice::Iter<'a, BlockId>,
}

/// Postorder of the blocks reachable from `entry`, followed by the unreachable blocks in
/// block order.
pub fn calculate<'a>(
	num_blocks: usize,
	entry: BlockId,
	succ_blocks: impl Fn(BlockId) -> &'a [BlockId],
) -> Result<Vec<BlockId>, BuildError> {
	let mut visited = vec![false; num_blocks];
	let mut stack = Vec::<State<'_>>::new();
	let mut out = Vec::with_capacity(num_blocks);

	let entry_visit = visited
		.get_mut(entry.index())
		.ok_or(PipelineError::UnknownBlock(entry))?;
	*entry_visit = true;
	stack.push(State {
		block: entry,
		successors: succ_blocks(entry).iter(),
	});

	while let Some(state) = stack.last_mut() {
		if let Some(&succ) = state.successors.next() {
			let succ_visited = visited
				.get_mut(succ.index())
				.ok_or(PipelineError::UnknownBlock(succ))?;

			if !*succ_visited {
				*succ_visited = true;
				stack.push(State {
					block: succ,
					successors: succ_blocks(succ).iter(),
				});
			}
		} else {
			out.push(state.block);
			stack.pop();
		}
	}

	out.extend(
		visited
			.iter()
			.enumerate()
			.filter(|(_, visited)| !**visited)
			.map(|(i, _)| BlockId::new(i)),
	);

	Ok(out)
}
